// ==========================================
// CRM ETL - repository error types
// ==========================================
// thiserror derive; constraint violations are distinguished from everything
// else because the loader demotes a constraint-failed flush to rejected
// records while any other store failure aborts the run.
// ==========================================

use thiserror::Error;

/// Store access errors.
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== recoverable (per-flush) =====
    #[error("unique constraint violation: {0}")]
    UniqueConstraintViolation(String),

    #[error("foreign key constraint violation: {0}")]
    ForeignKeyViolation(String),

    // ===== fatal =====
    #[error("database connection failed: {0}")]
    ConnectionError(String),

    #[error("database lock acquisition failed: {0}")]
    LockError(String),

    #[error("database query failed: {0}")]
    QueryError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// True for errors the loader recovers from by demoting the flushed
    /// batch to the error report instead of aborting the run.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            RepositoryError::UniqueConstraintViolation(_)
                | RepositoryError::ForeignKeyViolation(_)
        )
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::QueryError(msg)
                }
            }
            _ => RepositoryError::QueryError(err.to_string()),
        }
    }
}

/// Result alias for the repository layer.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
