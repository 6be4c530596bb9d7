// ==========================================
// CRM ETL - pipeline error types
// ==========================================
// Two layers, never mixed:
// - ValidationFailure: per-record reasons, recovered locally and reported;
//   these are expected outcomes, not exceptional ones.
// - EtlError: run-level failures (bad source file, broken store); only these
//   propagate with `?` and only a store failure aborts the run.
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

// ==========================================
// ValidationFailure - one reason a record is rejected
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("{field}: value is required")]
    MissingField { field: String },

    #[error("{field}: {value} is invalid: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("{field}: {value} does not reference a loaded {target}")]
    UnresolvedReference {
        field: String,
        value: String,
        target: String,
    },

    #[error("persist failed: {0}")]
    PersistFailed(String),
}

impl ValidationFailure {
    pub fn missing(field: &str) -> Self {
        ValidationFailure::MissingField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, value: &str, message: &str) -> Self {
        ValidationFailure::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unresolved(field: &str, value: &str, target: &str) -> Self {
        ValidationFailure::UnresolvedReference {
            field: field.to_string(),
            value: value.to_string(),
            target: target.to_string(),
        }
    }
}

/// A record either becomes a validated row or a non-empty reason list.
pub type RecordOutcome<T> = Result<T, Vec<ValidationFailure>>;

// ==========================================
// EtlError - run-level errors
// ==========================================
#[derive(Error, Debug)]
pub enum EtlError {
    // ===== source file errors =====
    #[error("source file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported source format: {0} (only .csv/.json)")]
    UnsupportedFormat(String),

    #[error("source file read failed: {0}")]
    FileReadError(String),

    #[error("CSV parse failed: {0}")]
    CsvParseError(String),

    #[error("JSON parse failed: {0}")]
    JsonParseError(String),

    // ===== store errors =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== generic =====
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        EtlError::CsvParseError(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::JsonParseError(err.to_string())
    }
}

/// Result alias for the etl layer.
pub type EtlResult<T> = Result<T, EtlError>;
