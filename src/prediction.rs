//! Marathon finishing-time prediction
//!
//! Baseline from Riegel's formula applied to the reference race, shifted by
//! the aerobic efficiency trend. Training runs are never Riegel inputs: they
//! are not race efforts.

use serde::{Deserialize, Serialize};

use crate::config::PlanConfig;
use crate::efficiency::AnalysisResult;

/// Riegel's endurance model: `t2 = t1 * (d2 / d1) ^ exponent`
pub fn riegel(t1_seconds: f64, d1_meters: f64, d2_meters: f64, exponent: f64) -> f64 {
    t1_seconds * (d2_meters / d1_meters).powf(exponent)
}

/// Predicted finishing time with its components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Riegel projection of the reference race, seconds
    pub baseline_seconds: f64,
    /// Trend adjustment applied to the baseline, seconds
    pub adjustment_seconds: f64,
    /// Rounded final prediction
    pub predicted_seconds: u32,
}

pub struct Predictor<'a> {
    config: &'a PlanConfig,
}

impl<'a> Predictor<'a> {
    pub fn new(config: &'a PlanConfig) -> Self {
        Self { config }
    }

    pub fn baseline_seconds(&self) -> f64 {
        riegel(
            self.config.reference_seconds,
            self.config.reference_distance_m,
            self.config.target_distance_m,
            self.config.riegel_exponent,
        )
    }

    /// Seconds added to the baseline for a trend percentage (faster when improving)
    pub fn adjustment_seconds(&self, trend_pct: Option<f64>) -> f64 {
        let cap = self.config.max_adjustment_seconds;
        let raw = -trend_pct.unwrap_or(0.0) * self.config.seconds_per_trend_pct;
        raw.clamp(-cap, cap)
    }

    pub fn predict(&self, analysis: &AnalysisResult) -> Prediction {
        self.predict_from_trend(analysis.trend_pct)
    }

    pub fn predict_from_trend(&self, trend_pct: Option<f64>) -> Prediction {
        let baseline_seconds = self.baseline_seconds();
        let adjustment_seconds = self.adjustment_seconds(trend_pct);
        let predicted_seconds = (baseline_seconds + adjustment_seconds).round().max(0.0) as u32;

        tracing::debug!(
            baseline = baseline_seconds,
            adjustment = adjustment_seconds,
            predicted = predicted_seconds,
            "Marathon prediction"
        );

        Prediction {
            baseline_seconds,
            adjustment_seconds,
            predicted_seconds,
        }
    }
}
