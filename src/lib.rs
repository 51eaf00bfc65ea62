// Library interface for StrideSync modules
// The binary and the integration tests both build on these

pub mod config;
pub mod efficiency;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod merge;
pub mod models;
pub mod plan;
pub mod prediction;
pub mod source;
pub mod status;
pub mod sync;

// Re-export commonly used types for convenience
pub use config::{AppConfig, PlanConfig, StravaCredentials, SyncSettings};
pub use efficiency::{AnalysisResult, EfficiencyAnalyzer, Trend, WeekBucket};
pub use error::{Result, StrideSyncError};
pub use import::export_csv::ExportCsvImporter;
pub use import::strava::StravaActivity;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use merge::{ActivityMerger, MergeStats};
pub use models::{ActivityRecord, FuzzyKey, RecordSource};
pub use plan::TrainingPlan;
pub use prediction::{Prediction, Predictor};
pub use source::{ActivitySource, CredentialProvider};
pub use status::{RaceStatus, TrainingStatus};
pub use sync::{SyncPipeline, SyncReport, TrainingSnapshot};
