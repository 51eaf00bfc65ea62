use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which input produced the body of a canonical record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    /// Bulk export file (`activities.csv`)
    Export,
    /// Activity listing API
    Api,
}

/// Canonical running activity, shared by both input sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Stable source identifier (absent when the source row had none)
    pub id: Option<String>,

    /// Local calendar date of the run
    pub date: NaiveDate,

    /// Free-text activity name
    pub name: String,

    /// Distance in kilometers, rounded to 2 decimal places
    pub distance_km: Decimal,

    /// Moving time in seconds (0 = unknown)
    pub moving_seconds: u32,

    /// Average heart rate in bpm
    pub avg_heart_rate: Option<f64>,

    /// Source that produced this record
    pub source: RecordSource,
}

/// Composite key used to recognise the same physical run across sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuzzyKey {
    pub date: NaiveDate,
    /// Distance rounded to 0.1 km
    pub distance_km: Decimal,
}

impl ActivityRecord {
    /// Date + distance key, distance rounded to one decimal place
    pub fn fuzzy_key(&self) -> FuzzyKey {
        FuzzyKey {
            date: self.date,
            distance_km: round_half_up(self.distance_km, 1),
        }
    }

    pub fn distance_km_f64(&self) -> f64 {
        self.distance_km.to_f64().unwrap_or(0.0)
    }

    /// Average speed in m/s, `None` when the duration is unknown
    pub fn speed_ms(&self) -> Option<f64> {
        if self.moving_seconds == 0 {
            return None;
        }
        Some(self.distance_km_f64() * 1000.0 / self.moving_seconds as f64)
    }
}

/// Normalize a raw heart-rate reading: non-positive or non-finite values mean "no HR"
pub fn normalize_heart_rate(hr: Option<f64>) -> Option<f64> {
    hr.filter(|v| v.is_finite() && *v > 0.0)
}

/// Round kilometers to 2 dp, halves away from zero
pub fn round_km(km: f64) -> Option<Decimal> {
    Decimal::from_f64(km).map(|d| round_half_up(d, 2))
}

fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Round a float to `dp` decimal places
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Format seconds as `H:MM:SS`, or `M:SS` under one hour
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format seconds as `H:MM:SS` regardless of magnitude
pub fn format_clock(seconds: u32) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Format a speed in m/s as pace `M:SS/km`
pub fn format_pace(speed_ms: f64) -> String {
    if speed_ms <= 0.0 {
        return "-".to_string();
    }
    let sec_per_km = (1000.0 / speed_ms) as u32;
    format!("{}:{:02}/km", sec_per_km / 60, sec_per_km % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(km: Decimal, secs: u32) -> ActivityRecord {
        ActivityRecord {
            id: Some("1".to_string()),
            date: NaiveDate::from_ymd_opt(2025, 12, 22).unwrap(),
            name: "Easy".to_string(),
            distance_km: km,
            moving_seconds: secs,
            avg_heart_rate: None,
            source: RecordSource::Export,
        }
    }

    #[test]
    fn test_fuzzy_key_rounds_to_tenth() {
        assert_eq!(record(dec!(10.01), 0).fuzzy_key(), record(dec!(10.0), 0).fuzzy_key());
        assert_ne!(record(dec!(10.06), 0).fuzzy_key(), record(dec!(10.0), 0).fuzzy_key());
    }

    #[test]
    fn test_fuzzy_key_midpoint_rounds_up() {
        assert_eq!(record(dec!(10.05), 0).fuzzy_key().distance_km, dec!(10.1));
        assert_eq!(record(dec!(10.05), 0).fuzzy_key(), record(dec!(10.14), 0).fuzzy_key());
        assert_eq!(record(dec!(12.25), 0).fuzzy_key().distance_km, dec!(12.3));
    }

    #[test]
    fn test_speed_requires_duration() {
        assert_eq!(record(dec!(10), 0).speed_ms(), None);
        let speed = record(dec!(10), 2500).speed_ms().unwrap();
        assert!((speed - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(10.005_1), Some(dec!(10.01)));
        assert_eq!(round_km(21.0975), Some(dec!(21.1)));
        assert_eq!(round_km(10.025), Some(dec!(10.03)));
        assert_eq!(round_km(5.125), Some(dec!(5.13)));
    }

    #[test]
    fn test_heart_rate_normalization() {
        assert_eq!(normalize_heart_rate(Some(0.0)), None);
        assert_eq!(normalize_heart_rate(Some(f64::NAN)), None);
        assert_eq!(normalize_heart_rate(Some(151.2)), Some(151.2));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(2400), "40:00");
        assert_eq!(format_duration(3725), "1:02:05");
        assert_eq!(format_clock(9132), "2:32:12");
        assert_eq!(format_clock(600), "0:10:00");
    }

    #[test]
    fn test_pace_formatting() {
        assert_eq!(format_pace(1000.0 / 270.0), "4:30/km");
        assert_eq!(format_pace(0.0), "-");
    }
}
