use std::path::PathBuf;

/// Errors raised by the ingestion, cache and query layers.
#[derive(Debug, thiserror::Error)]
pub enum EemError {
    /// Malformed header, axis token or intensity cell in a source file or
    /// in the persisted cache artifact.
    #[error("parse error in {}: {reason}", file.display())]
    Parse { file: PathBuf, reason: String },

    /// Selected records do not share identical axes.
    #[error("data incomplete: {0}")]
    Consistency(String),

    /// A selection refers to records that do not exist.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl EemError {
    pub(crate) fn parse(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EemError::Parse {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EemError>;
