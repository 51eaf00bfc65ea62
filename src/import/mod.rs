//! Record normalization for both input sources
//!
//! Malformed rows are skipped, never fatal. Each skip is counted by reason
//! in an [`ImportSummary`] so a sync can report how much data it ignored.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::models::ActivityRecord;

pub mod export_csv;
pub mod strava;

/// Why a raw row did not become an [`ActivityRecord`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Error)]
pub enum SkipReason {
    #[error("row has {found} fields, need {required}")]
    TooFewFields { found: usize, required: usize },
    #[error("activity type {0:?} is not a run")]
    NotARun(String),
    #[error("unparseable timestamp {0:?}")]
    BadTimestamp(String),
    #[error("unparseable distance {0:?}")]
    BadDistance(String),
    #[error("unparseable moving time {0:?}")]
    BadDuration(String),
    #[error("unparseable heart rate {0:?}")]
    BadHeartRate(String),
    #[error("unreadable row: {0}")]
    Unreadable(String),
    #[error("malformed activity object: {0}")]
    Malformed(String),
}

impl SkipReason {
    /// Stable label used for per-reason counters
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::TooFewFields { .. } => "too_few_fields",
            SkipReason::NotARun(_) => "not_a_run",
            SkipReason::BadTimestamp(_) => "bad_timestamp",
            SkipReason::BadDistance(_) => "bad_distance",
            SkipReason::BadDuration(_) => "bad_duration",
            SkipReason::BadHeartRate(_) => "bad_heart_rate",
            SkipReason::Unreadable(_) => "unreadable",
            SkipReason::Malformed(_) => "malformed",
        }
    }
}

/// Outcome of normalizing one batch of raw rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    /// Raw rows seen
    pub rows_read: usize,
    /// Rows that became records
    pub kept: usize,
    /// Skipped rows by reason
    pub skipped: BTreeMap<&'static str, usize>,
}

impl ImportSummary {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    /// Record the outcome of one row and pass kept records through
    pub(crate) fn track(
        &mut self,
        outcome: Result<ActivityRecord, SkipReason>,
    ) -> Option<ActivityRecord> {
        self.rows_read += 1;
        match outcome {
            Ok(record) => {
                self.kept += 1;
                Some(record)
            }
            Err(reason) => {
                // Non-runs are the normal case, not worth a debug line each
                if !matches!(reason, SkipReason::NotARun(_)) {
                    tracing::debug!(reason = reason.kind(), "Skipping row: {}", reason);
                }
                *self.skipped.entry(reason.kind()).or_insert(0) += 1;
                None
            }
        }
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows, {} runs kept, {} skipped",
            self.rows_read,
            self.kept,
            self.skipped_total()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_by_reason() {
        let mut summary = ImportSummary::default();
        assert!(summary.track(Err(SkipReason::NotARun("Ride".to_string()))).is_none());
        assert!(summary
            .track(Err(SkipReason::BadDistance("abc".to_string())))
            .is_none());
        assert!(summary.track(Err(SkipReason::NotARun("Swim".to_string()))).is_none());

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.kept, 0);
        assert_eq!(summary.skipped_total(), 3);
        assert_eq!(summary.skipped.get("not_a_run"), Some(&2));
        assert_eq!(summary.to_string(), "3 rows, 0 runs kept, 3 skipped");
    }
}
