//! Output writers: merged activity table, status summary, audit report

use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::error::ExportError;

pub mod csv;
pub mod json;
pub mod text;

/// Files produced by one sync run
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenOutputs {
    pub master: PathBuf,
    pub status: PathBuf,
    pub last_synced: PathBuf,
}

/// Human-readable stamp, e.g. `08 Jan 2026 at 07:45`
pub fn format_last_synced(at: NaiveDateTime) -> String {
    at.format("%d %b %Y at %H:%M").to_string()
}

/// Write the last-synced stamp (no trailing newline)
pub fn write_last_synced<P: AsRef<Path>>(at: NaiveDateTime, output_path: P) -> Result<(), ExportError> {
    let path = output_path.as_ref();
    fs::write(path, format_last_synced(at)).map_err(|e| ExportError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "Wrote last-synced stamp");
    Ok(())
}
