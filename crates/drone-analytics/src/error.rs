//! Analytics error types.

use drone_domain::DomainError;
use std::path::PathBuf;
use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A column the pipeline depends on is absent from the input header
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    /// A cell could not be converted to its expected type
    #[error("Row {row}, column {column}: cannot parse {value:?}: {reason}")]
    Parse {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// File could not be opened, read or written
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structural CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Report rendering error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Domain validation error
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AnalyticsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
