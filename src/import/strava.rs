use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ImportSummary, SkipReason};
use crate::models::{normalize_heart_rate, round_km, ActivityRecord, RecordSource};

/// Activity summary as returned by `GET /athlete/activities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaActivity {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Strava uses "type" for legacy and "sport_type" for newer activities
    #[serde(rename = "type", default)]
    pub activity_type: String,
    /// Local start time, e.g. `2025-12-22T07:05:12Z`
    #[serde(default)]
    pub start_date_local: String,
    /// Meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Seconds
    #[serde(default)]
    pub moving_time: Option<f64>,
    #[serde(default)]
    pub average_heartrate: Option<f64>,
}

/// Normalize one API activity into a canonical record
pub fn normalize_activity(
    activity: &StravaActivity,
    activity_type: &str,
) -> Result<ActivityRecord, SkipReason> {
    if activity.activity_type != activity_type {
        return Err(SkipReason::NotARun(activity.activity_type.clone()));
    }

    let date = activity
        .start_date_local
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| SkipReason::BadTimestamp(activity.start_date_local.clone()))?;

    let meters = activity.distance.unwrap_or(0.0);
    let distance_km = Some(meters)
        .filter(|m| m.is_finite() && *m >= 0.0)
        .and_then(|m| round_km(m / 1000.0))
        .ok_or_else(|| SkipReason::BadDistance(meters.to_string()))?;

    let moving = activity.moving_time.unwrap_or(0.0);
    if !(moving.is_finite() && moving >= 0.0 && moving < f64::from(u32::MAX)) {
        return Err(SkipReason::BadDuration(moving.to_string()));
    }

    Ok(ActivityRecord {
        id: Some(activity.id.to_string()),
        date,
        name: activity.name.clone(),
        distance_km,
        moving_seconds: moving.trunc() as u32,
        avg_heart_rate: normalize_heart_rate(activity.average_heartrate),
        source: RecordSource::Api,
    })
}

/// Decode one raw listing element and normalize it
pub fn normalize_value(value: &Value, activity_type: &str) -> Result<ActivityRecord, SkipReason> {
    let activity = StravaActivity::deserialize(value)
        .map_err(|e| SkipReason::Malformed(e.to_string()))?;
    normalize_activity(&activity, activity_type)
}

/// Normalize a batch of raw API activities, keeping runs only
pub fn normalize_activities(
    activities: &[Value],
    activity_type: &str,
) -> (Vec<ActivityRecord>, ImportSummary) {
    let mut summary = ImportSummary::default();
    let records = activities
        .iter()
        .filter_map(|value| summary.track(normalize_value(value, activity_type)))
        .collect();

    tracing::info!(
        activities = summary.rows_read,
        runs = summary.kept,
        "Normalized API activities"
    );
    (records, summary)
}
