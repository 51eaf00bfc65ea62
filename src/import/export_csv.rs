use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;

use super::{ImportSummary, SkipReason};
use crate::error::Result;
use crate::models::{normalize_heart_rate, round_km, ActivityRecord, RecordSource};

/// Timestamp layout of the "Activity Date" column, e.g. `Dec 22, 2025, 7:05:12 AM`
const EXPORT_TIMESTAMP_FORMAT: &str = "%b %d, %Y, %I:%M:%S %p";

/// Column positions in the Strava bulk export
const COL_ID: usize = 0;
const COL_DATE: usize = 1;
const COL_NAME: usize = 2;
const COL_TYPE: usize = 3;
const COL_DISTANCE: usize = 6;
const COL_MOVING_TIME: usize = 16;
const COL_AVG_HR: usize = 31;
const MIN_FIELDS: usize = 32;

/// Importer for the Strava bulk export (`activities.csv`)
pub struct ExportCsvImporter {
    activity_type: String,
}

impl ExportCsvImporter {
    pub fn new(activity_type: impl Into<String>) -> Self {
        Self {
            activity_type: activity_type.into(),
        }
    }

    /// Import every run from an export file.
    ///
    /// A missing file is not an error: the sync then runs on API data alone.
    pub fn import_file(&self, path: &Path) -> Result<(Vec<ActivityRecord>, ImportSummary)> {
        if !path.exists() {
            tracing::warn!("{} not found, skipping bulk export", path.display());
            return Ok((Vec::new(), ImportSummary::default()));
        }

        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        Ok(self.import_records(reader))
    }

    /// Import from any reader producing export CSV (header row included)
    pub fn import_reader<R: Read>(&self, input: R) -> (Vec<ActivityRecord>, ImportSummary) {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        self.import_records(reader)
    }

    fn import_records<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
    ) -> (Vec<ActivityRecord>, ImportSummary) {
        let mut summary = ImportSummary::default();
        let mut records = Vec::new();

        for result in reader.records() {
            let outcome = result
                .map_err(|e| SkipReason::Unreadable(e.to_string()))
                .and_then(|row| self.parse_row(&row));
            if let Some(record) = summary.track(outcome) {
                records.push(record);
            }
        }

        tracing::info!(
            rows = summary.rows_read,
            kept = summary.kept,
            skipped = summary.skipped_total(),
            "Parsed bulk export"
        );
        (records, summary)
    }

    /// Normalize one export row
    pub fn parse_row(&self, row: &StringRecord) -> std::result::Result<ActivityRecord, SkipReason> {
        if row.len() < MIN_FIELDS {
            return Err(SkipReason::TooFewFields {
                found: row.len(),
                required: MIN_FIELDS,
            });
        }

        let field = |i: usize| row.get(i).unwrap_or("").trim();

        let activity_type = field(COL_TYPE);
        if activity_type != self.activity_type {
            return Err(SkipReason::NotARun(activity_type.to_string()));
        }

        let date = NaiveDateTime::parse_from_str(field(COL_DATE), EXPORT_TIMESTAMP_FORMAT)
            .map_err(|_| SkipReason::BadTimestamp(field(COL_DATE).to_string()))?
            .date();

        let distance_km = field(COL_DISTANCE)
            .parse::<f64>()
            .ok()
            .filter(|km| km.is_finite() && *km >= 0.0)
            .and_then(round_km)
            .ok_or_else(|| SkipReason::BadDistance(field(COL_DISTANCE).to_string()))?;

        let moving_seconds = match field(COL_MOVING_TIME) {
            "" => 0,
            raw => raw
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite() && *secs >= 0.0 && *secs < f64::from(u32::MAX))
                .map(|secs| secs.trunc() as u32)
                .ok_or_else(|| SkipReason::BadDuration(raw.to_string()))?,
        };

        let avg_heart_rate = match field(COL_AVG_HR) {
            "" => None,
            raw => normalize_heart_rate(Some(
                raw.parse::<f64>()
                    .map_err(|_| SkipReason::BadHeartRate(raw.to_string()))?,
            )),
        };

        let id = Some(field(COL_ID).to_string()).filter(|id| !id.is_empty());

        Ok(ActivityRecord {
            id,
            date,
            name: field(COL_NAME).to_string(),
            distance_km,
            moving_seconds,
            avg_heart_rate,
            source: RecordSource::Export,
        })
    }
}

impl Default for ExportCsvImporter {
    fn default() -> Self {
        Self::new("Run")
    }
}
