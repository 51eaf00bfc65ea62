//! Unified error hierarchy for StrideSync
//!
//! Malformed input rows never surface here: the normalizers skip them.
//! These errors cover the fatal, upstream conditions (credentials, the
//! remote activity source, unwritable outputs).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all StrideSync operations
#[derive(Debug, Error)]
pub enum StrideSyncError {
    /// Configuration and credential errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote activity source errors
    #[error("Activity source error: {0}")]
    Source(#[from] SourceError),

    /// Output writer errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader errors on the bulk export
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration and credential errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required credential is not set in the environment
    #[error("Missing credential: {name}")]
    MissingCredential { name: String },

    /// Invalid configuration value
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors raised by the credential provider or the activity source
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Token refresh was rejected
    #[error("Token refresh failed ({status}): {body}")]
    TokenRefresh { status: u16, body: String },

    /// The token endpoint answered without an access token
    #[error("No access token in token response")]
    MissingAccessToken,

    /// The activity listing returned an error status
    #[error("Activity listing failed on page {page} ({status}): {body}")]
    Listing { page: u32, status: u16, body: String },

    /// Access token was refused by the API
    #[error("Not authenticated with Strava")]
    NotAuthenticated,
}

/// Output writer errors
#[derive(Debug, Error)]
pub enum ExportError {
    /// Writing an output file failed
    #[error("Export failed to {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// Serialization of the status summary failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writer failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for StrideSync operations
pub type Result<T> = std::result::Result<T, StrideSyncError>;

impl StrideSyncError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StrideSyncError::Source(SourceError::Request(_)) | StrideSyncError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            StrideSyncError::Config(_) => ErrorSeverity::Critical,
            StrideSyncError::Source(SourceError::NotAuthenticated) => ErrorSeverity::Critical,
            StrideSyncError::Source(_) => ErrorSeverity::Error,
            StrideSyncError::Csv(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            StrideSyncError::Config(ConfigError::MissingCredential { name }) => {
                format!("{} is not set. Add it to your environment or .env file.", name)
            }
            StrideSyncError::Source(SourceError::NotAuthenticated)
            | StrideSyncError::Source(SourceError::TokenRefresh { .. }) => {
                "Strava rejected the credentials. Refresh token may have been revoked.".to_string()
            }
            StrideSyncError::Export(ExportError::WriteFailed { path, .. }) => {
                format!("Could not write output file: {}", path.display())
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Pipeline cannot start
    Critical,
    /// Operation failed
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = StrideSyncError::Config(ConfigError::MissingCredential {
            name: "STRAVA_CLIENT_ID".to_string(),
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = StrideSyncError::Source(SourceError::MissingAccessToken);
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_retryable() {
        let err = StrideSyncError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(err.is_retryable());

        let err = StrideSyncError::Source(SourceError::NotAuthenticated);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = StrideSyncError::Config(ConfigError::MissingCredential {
            name: "STRAVA_REFRESH_TOKEN".to_string(),
        });
        assert!(err.user_message().contains("STRAVA_REFRESH_TOKEN"));

        let err = StrideSyncError::Export(ExportError::WriteFailed {
            path: PathBuf::from("out/training_status.json"),
            reason: "denied".to_string(),
        });
        assert!(err.user_message().contains("training_status.json"));
    }
}
