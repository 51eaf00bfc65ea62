//! Training status summary for the website badge

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PlanConfig;
use crate::efficiency::{AnalysisResult, Trend};
use crate::models::{format_clock, round_to, ActivityRecord};
use crate::prediction::Prediction;

/// Separator in the status badge, as rendered by the training site
const LABEL_SEPARATOR: &str = " \u{2014} ";

/// Prediction relative to the target, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RaceStatus {
    #[serde(rename = "AHEAD")]
    Ahead,
    #[serde(rename = "ON TRACK")]
    OnTrack,
    #[serde(rename = "CLOSE")]
    Close,
    #[serde(rename = "OFF PACE")]
    OffPace,
}

impl RaceStatus {
    /// Classify `target - predicted` in seconds
    pub fn from_delta(delta_seconds: i64) -> Self {
        if delta_seconds > 180 {
            RaceStatus::Ahead
        } else if delta_seconds >= -60 {
            RaceStatus::OnTrack
        } else if delta_seconds > -300 {
            RaceStatus::Close
        } else {
            RaceStatus::OffPace
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RaceStatus::Ahead => "AHEAD",
            RaceStatus::OnTrack => "ON TRACK",
            RaceStatus::Close => "CLOSE",
            RaceStatus::OffPace => "OFF PACE",
        }
    }

    /// Badge text embedding the formatted predicted time
    pub fn label(&self, predicted: &str) -> String {
        match self {
            RaceStatus::Ahead => format!("AHEAD OF TARGET{}ON FOR {}", LABEL_SEPARATOR, predicted),
            RaceStatus::OnTrack => format!("ON TRACK FOR {}", predicted),
            RaceStatus::Close => format!("CLOSE{}{} PROJECTED", LABEL_SEPARATOR, predicted),
            RaceStatus::OffPace => format!("NEEDS WORK{}{} PROJECTED", LABEL_SEPARATOR, predicted),
        }
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The externally consumed summary (`training_status.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub label: String,
    pub status: RaceStatus,
    pub predicted_time: String,
    pub predicted_seconds: u32,
    pub target_seconds: u32,
    pub delta_seconds: i64,
    pub ae_trend: Trend,
    pub ae_trend_pct: Option<f64>,
    pub ae_delta_wk: Option<f64>,
    pub ae_label: String,
    pub hr_at_mp: Option<f64>,
    pub hr_buffer: Option<f64>,
    pub red_zone_hr: f64,
    pub current_week: Option<u32>,
    /// Total distance of all merged runs in the current week
    pub current_week_km: f64,
    /// `YYYY-MM-DD`
    pub last_updated: String,
}

/// Assemble the status summary
pub fn build_status(
    config: &PlanConfig,
    prediction: &Prediction,
    analysis: &AnalysisResult,
    records: &[ActivityRecord],
    today: NaiveDate,
) -> TrainingStatus {
    let predicted_seconds = prediction.predicted_seconds;
    let delta_seconds = i64::from(config.target_seconds) - i64::from(predicted_seconds);
    let status = RaceStatus::from_delta(delta_seconds);
    let predicted_time = format_clock(predicted_seconds);

    let ae_label = analysis
        .week_over_week_pct
        .map(|pct| {
            let sign = if pct >= 0.0 { "+" } else { "" };
            format!("AE {}{:.1}% vs last week", sign, pct)
        })
        .unwrap_or_default();

    let plan = config.training_plan();
    let current_week_km = analysis
        .current_week
        .map(|week| {
            let total: Decimal = records
                .iter()
                .filter(|r| plan.week_of(r.date) == Some(week))
                .map(|r| r.distance_km)
                .sum();
            round_to(total.to_f64().unwrap_or(0.0), 1)
        })
        .unwrap_or(0.0);

    TrainingStatus {
        label: status.label(&predicted_time),
        status,
        predicted_time,
        predicted_seconds,
        target_seconds: config.target_seconds,
        delta_seconds,
        ae_trend: analysis.trend,
        ae_trend_pct: analysis.trend_pct,
        ae_delta_wk: analysis.week_over_week_pct,
        ae_label,
        hr_at_mp: analysis.hr_at_marathon_pace,
        hr_buffer: analysis.hr_buffer,
        red_zone_hr: analysis.red_zone_hr,
        current_week: analysis.current_week,
        current_week_km,
        last_updated: today.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efficiency::EfficiencyAnalyzer;
    use crate::models::RecordSource;
    use crate::prediction::Predictor;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_boundaries() {
        assert_eq!(RaceStatus::from_delta(181), RaceStatus::Ahead);
        assert_eq!(RaceStatus::from_delta(180), RaceStatus::OnTrack);
        assert_eq!(RaceStatus::from_delta(-60), RaceStatus::OnTrack);
        assert_eq!(RaceStatus::from_delta(-61), RaceStatus::Close);
        assert_eq!(RaceStatus::from_delta(-299), RaceStatus::Close);
        assert_eq!(RaceStatus::from_delta(-300), RaceStatus::OffPace);
    }

    #[test]
    fn test_labels() {
        assert_eq!(RaceStatus::OnTrack.label("2:34:10"), "ON TRACK FOR 2:34:10");
        assert_eq!(
            RaceStatus::OffPace.label("2:41:00"),
            "NEEDS WORK \u{2014} 2:41:00 PROJECTED"
        );
        assert_eq!(
            RaceStatus::Ahead.label("2:30:00"),
            "AHEAD OF TARGET \u{2014} ON FOR 2:30:00"
        );
        assert_eq!(RaceStatus::Close.label("2:36:40"), "CLOSE \u{2014} 2:36:40 PROJECTED");
    }

    fn record(day: u32, km: Decimal, secs: u32, hr: Option<f64>) -> ActivityRecord {
        ActivityRecord {
            id: Some(format!("{}", day)),
            date: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            name: "Run".to_string(),
            distance_km: km,
            moving_seconds: secs,
            avg_heart_rate: hr,
            source: RecordSource::Export,
        }
    }

    #[test]
    fn test_build_status_summary() {
        let config = PlanConfig::default();
        // Plan weeks 2 and 3 (Dec 29 - Jan 4, Jan 5 - Jan 11)
        let records = vec![
            record(2, dec!(10.0), 3000, Some(150.0)),
            record(6, dec!(16.0), 4800, Some(150.0)),
            record(7, dec!(4.2), 1500, None),
        ];
        let analysis = EfficiencyAnalyzer::new(&config).analyze(&records);
        let prediction = Predictor::new(&config).predict(&analysis);
        let today = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();

        let status = build_status(&config, &prediction, &analysis, &records, today);

        assert_eq!(status.predicted_seconds, 9132);
        assert_eq!(status.predicted_time, "2:32:12");
        assert_eq!(status.delta_seconds, 168);
        assert_eq!(status.status, RaceStatus::OnTrack);
        assert_eq!(status.label, "ON TRACK FOR 2:32:12");
        assert_eq!(status.current_week, Some(3));
        assert_eq!(status.current_week_km, 20.2);
        assert_eq!(status.ae_label, "AE +0.0% vs last week");
        assert_eq!(status.last_updated, "2026-01-08");
    }

    #[test]
    fn test_status_json_keys() {
        let config = PlanConfig::default();
        let analysis = EfficiencyAnalyzer::new(&config).analyze(&[]);
        let prediction = Predictor::new(&config).predict(&analysis);
        let status = build_status(
            &config,
            &prediction,
            &analysis,
            &[],
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "ON TRACK");
        assert_eq!(json["ae_trend"], "insufficient data");
        assert!(json["ae_trend_pct"].is_null());
        assert!(json["hr_at_mp"].is_null());
        assert!(json["current_week"].is_null());
        assert_eq!(json["ae_label"], "");
        assert_eq!(json["red_zone_hr"], 157.5);
    }

    proptest! {
        #[test]
        fn test_status_is_monotonic_in_delta(a in -1000i64..1000, b in -1000i64..1000) {
            // Larger delta never yields a worse status
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(RaceStatus::from_delta(hi) <= RaceStatus::from_delta(lo));
        }
    }
}
