use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::plan::TrainingPlan;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Training plan, race target and model parameters
    pub plan: PlanConfig,

    /// Input/output locations and fetch behaviour
    pub sync: SyncSettings,

    /// Strava endpoints
    pub strava: StravaSettings,
}

/// Immutable parameters of the analysis and prediction model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanConfig {
    /// Monday of plan week 1
    pub start_date: NaiveDate,

    /// Plan length in weeks
    pub weeks: u32,

    /// Target finishing time in seconds
    pub target_seconds: u32,

    /// Target race distance in meters
    pub target_distance_m: f64,

    /// Reference race time (half-marathon PB) in seconds
    pub reference_seconds: f64,

    /// Reference race distance in meters
    pub reference_distance_m: f64,

    /// Riegel fatigue exponent
    pub riegel_exponent: f64,

    /// Runs shorter than this are not representative of aerobic load
    pub min_distance_km: f64,

    /// Multiplier from steady-run average HR to estimated max HR
    /// (average HR is assumed to sit near 88% of max)
    pub max_hr_multiplier: f64,

    /// Fraction of estimated max HR treated as the red zone
    pub red_zone_fraction: f64,

    /// Estimated max HR when no qualifying runs exist
    pub fallback_max_hr: f64,

    /// Trend percentage beyond which efficiency counts as improving/declining
    pub trend_threshold_pct: f64,

    /// Seconds removed from the prediction per +1% efficiency trend
    pub seconds_per_trend_pct: f64,

    /// Cap on the trend adjustment, in seconds either way
    pub max_adjustment_seconds: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        PlanConfig {
            start_date: NaiveDate::from_ymd_opt(2025, 12, 22).unwrap_or_default(),
            weeks: 18,
            target_seconds: 9300,
            target_distance_m: 42195.0,
            reference_seconds: 4380.0,
            reference_distance_m: 21097.5,
            riegel_exponent: 1.06,
            min_distance_km: 5.0,
            max_hr_multiplier: 1.12,
            red_zone_fraction: 0.90,
            fallback_max_hr: 175.0,
            trend_threshold_pct: 1.0,
            seconds_per_trend_pct: 15.0,
            max_adjustment_seconds: 90.0,
        }
    }
}

impl PlanConfig {
    pub fn training_plan(&self) -> TrainingPlan {
        TrainingPlan::new(self.start_date, self.weeks)
    }

    /// Speed required to cover the target distance in the target time (m/s)
    pub fn marathon_speed(&self) -> f64 {
        self.target_distance_m / f64::from(self.target_seconds)
    }

    /// Reject parameter combinations the model cannot evaluate
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let positive = [
            ("plan.target_distance_m", self.target_distance_m),
            ("plan.reference_seconds", self.reference_seconds),
            ("plan.reference_distance_m", self.reference_distance_m),
            ("plan.riegel_exponent", self.riegel_exponent),
            ("plan.max_hr_multiplier", self.max_hr_multiplier),
            ("plan.red_zone_fraction", self.red_zone_fraction),
            ("plan.fallback_max_hr", self.fallback_max_hr),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("must be positive, got {}", value),
                });
            }
        }
        if self.weeks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "plan.weeks".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.target_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "plan.target_seconds".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Input/output locations and fetch behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Strava bulk export file
    pub export_path: PathBuf,

    /// Directory receiving the output files
    pub output_dir: PathBuf,

    /// Merged activity table file name
    pub master_file: String,

    /// Status summary file name
    pub status_file: String,

    /// Last-synced stamp file name
    pub last_synced_file: String,

    /// Only fetch API activities started after this date (UTC midnight)
    pub fetch_after: NaiveDate,

    /// Activities requested per API page
    pub page_size: u32,

    /// Activity type marker for runs in both sources
    pub activity_type: String,

    /// HTTP timeout in seconds
    pub http_timeout_secs: u64,

    /// `.env` file holding the Strava credentials
    pub env_file: PathBuf,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            export_path: PathBuf::from("activities.csv"),
            output_dir: PathBuf::from("."),
            master_file: "master_activities.csv".to_string(),
            status_file: "training_status.json".to_string(),
            last_synced_file: "last_synced.txt".to_string(),
            fetch_after: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap_or_default(),
            page_size: 200,
            activity_type: "Run".to_string(),
            http_timeout_secs: 30,
            env_file: PathBuf::from(".env"),
        }
    }
}

impl SyncSettings {
    pub fn master_path(&self) -> PathBuf {
        self.output_dir.join(&self.master_file)
    }

    pub fn status_path(&self) -> PathBuf {
        self.output_dir.join(&self.status_file)
    }

    pub fn last_synced_path(&self) -> PathBuf {
        self.output_dir.join(&self.last_synced_file)
    }
}

/// Strava endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StravaSettings {
    pub api_base: String,
    pub token_url: String,
}

impl Default for StravaSettings {
    fn default() -> Self {
        StravaSettings {
            api_base: "https://www.strava.com/api/v3".to_string(),
            token_url: "https://www.strava.com/oauth/token".to_string(),
        }
    }
}

/// OAuth refresh-token credentials, read from the environment
#[derive(Debug, Clone)]
pub struct StravaCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl StravaCredentials {
    /// Load credentials, reading `env_file` first when it exists
    pub fn from_env(env_file: &Path) -> std::result::Result<Self, ConfigError> {
        if env_file.exists() {
            if let Err(e) = dotenvy::from_path(env_file) {
                tracing::warn!("Failed to read {}: {}", env_file.display(), e);
            }
        }

        Ok(Self {
            client_id: Self::require("STRAVA_CLIENT_ID")?,
            client_secret: Self::require("STRAVA_CLIENT_SECRET")?,
            refresh_token: Self::require("STRAVA_REFRESH_TOKEN")?,
        })
    }

    fn require(name: &str) -> std::result::Result<String, ConfigError> {
        env::var(name)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                name: name.to_string(),
            })
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.plan.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stridesync")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(
                    "Using default configuration ({}): {:#}",
                    config_path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.plan, deserialized.plan);
        assert_eq!(config.sync, deserialized.sync);
        assert!(toml_str.contains("start_date = \"2025-12-22\""));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [plan]
            target_seconds = 10800
            "#,
        )
        .unwrap();

        assert_eq!(config.plan.target_seconds, 10800);
        assert_eq!(config.plan.weeks, 18);
        assert_eq!(config.sync.page_size, 200);
    }

    #[test]
    fn test_marathon_speed() {
        let plan = PlanConfig::default();
        assert!((plan.marathon_speed() - 4.537).abs() < 0.001);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut plan = PlanConfig::default();
        assert!(plan.validate().is_ok());

        plan.reference_distance_m = 0.0;
        assert!(plan.validate().is_err());

        let plan = PlanConfig {
            weeks: 0,
            ..PlanConfig::default()
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.sync.output_dir = PathBuf::from("site/data");
        config.save_to_file(&config_path).unwrap();

        let loaded = AppConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.sync.status_path(), PathBuf::from("site/data/training_status.json"));
    }

    #[test]
    fn test_missing_credential() {
        let err = StravaCredentials::require("STRIDESYNC_TEST_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }
}
