//! Error types for maintrag

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaintragError {
    // Dataset errors
    #[error("Dataset not found at {path}")]
    DatasetNotFound { path: PathBuf },

    #[error("Dataset is missing required columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(String),

    // Generator errors
    #[error("Generator unavailable: {reason}. Try: {remediation}")]
    GeneratorUnavailable {
        reason: String,
        remediation: String,
    },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<csv::Error> for MaintragError {
    fn from(err: csv::Error) -> Self {
        match err.position() {
            Some(pos) => MaintragError::InvalidRecord {
                line: pos.line(),
                reason: err.to_string(),
            },
            None => MaintragError::Csv(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MaintragError>;
