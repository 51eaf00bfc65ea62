//! End-to-end sync: fetch, normalize, merge, analyze, predict, write

use chrono::{NaiveDate, NaiveDateTime};
use std::fs;

use crate::config::AppConfig;
use crate::efficiency::{AnalysisResult, EfficiencyAnalyzer};
use crate::error::{ExportError, Result};
use crate::export::{self, WrittenOutputs};
use crate::import::export_csv::ExportCsvImporter;
use crate::import::strava::normalize_activities;
use crate::import::ImportSummary;
use crate::merge::{ActivityMerger, MergeStats};
use crate::models::ActivityRecord;
use crate::prediction::{Prediction, Predictor};
use crate::source::{fetch_all_with_progress, ActivitySource};
use crate::status::{build_status, TrainingStatus};

/// Analysis of a canonical record set
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    pub records: Vec<ActivityRecord>,
    pub analysis: AnalysisResult,
    pub prediction: Prediction,
    pub status: TrainingStatus,
}

/// What one sync run did
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub export: ImportSummary,
    /// `None` when the API was skipped
    pub api: Option<ImportSummary>,
    pub merge: MergeStats,
    pub snapshot: TrainingSnapshot,
    pub outputs: WrittenOutputs,
}

pub struct SyncPipeline<'a> {
    config: &'a AppConfig,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline and write all outputs
    pub fn run(
        &self,
        source: Option<&dyn ActivitySource>,
        now: NaiveDateTime,
    ) -> Result<SyncReport> {
        self.run_with_progress(source, now, |_, _| {})
    }

    /// [`run`](Self::run) with a per-page callback for the API fetch
    pub fn run_with_progress<F>(
        &self,
        source: Option<&dyn ActivitySource>,
        now: NaiveDateTime,
        on_page: F,
    ) -> Result<SyncReport>
    where
        F: FnMut(u32, usize),
    {
        let sync = &self.config.sync;

        let (api_records, api_summary) = match source {
            Some(source) => {
                tracing::info!(after = %sync.fetch_after, "Fetching activities from the API");
                let activities = fetch_all_with_progress(source, sync.page_size, on_page)?;
                let (records, summary) = normalize_activities(&activities, &sync.activity_type);
                if records.is_empty() {
                    tracing::warn!("API returned no runs");
                }
                (records, Some(summary))
            }
            None => {
                tracing::info!("Skipping API fetch");
                (Vec::new(), None)
            }
        };

        let importer = ExportCsvImporter::new(sync.activity_type.clone());
        let (export_records, export_summary) = importer.import_file(&sync.export_path)?;
        tracing::info!(path = %sync.export_path.display(), "Bulk export: {}", export_summary);

        let (records, merge) = ActivityMerger::merge(export_records, api_records);
        let snapshot = self.analyze(records, now.date());
        let outputs = self.write_outputs(&snapshot, now)?;

        Ok(SyncReport {
            export: export_summary,
            api: api_summary,
            merge,
            snapshot,
            outputs,
        })
    }

    /// Analyze an already merged record set (no I/O)
    pub fn analyze(&self, records: Vec<ActivityRecord>, today: NaiveDate) -> TrainingSnapshot {
        let plan = &self.config.plan;
        let analysis = EfficiencyAnalyzer::new(plan).analyze(&records);
        let prediction = Predictor::new(plan).predict(&analysis);
        let status = build_status(plan, &prediction, &analysis, &records, today);

        tracing::info!(
            status = %status.status,
            predicted = %status.predicted_time,
            delta = status.delta_seconds,
            "Training status built"
        );

        TrainingSnapshot {
            records,
            analysis,
            prediction,
            status,
        }
    }

    /// Write the master table, status summary and last-synced stamp
    pub fn write_outputs(
        &self,
        snapshot: &TrainingSnapshot,
        now: NaiveDateTime,
    ) -> std::result::Result<WrittenOutputs, ExportError> {
        let sync = &self.config.sync;
        fs::create_dir_all(&sync.output_dir).map_err(|e| ExportError::WriteFailed {
            path: sync.output_dir.clone(),
            reason: e.to_string(),
        })?;

        let outputs = WrittenOutputs {
            master: sync.master_path(),
            status: sync.status_path(),
            last_synced: sync.last_synced_path(),
        };
        export::csv::export_master(&snapshot.records, &outputs.master)?;
        export::json::export_status(&snapshot.status, &outputs.status)?;
        export::write_last_synced(now, &outputs.last_synced)?;
        Ok(outputs)
    }
}
