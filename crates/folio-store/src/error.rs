//! Error types for storage operations

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures raised by a [`crate::Store`] backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn not_found<T: Into<String>>(what: T) -> Self {
        StoreError::NotFound(what.into())
    }

    pub fn conflict<T: Into<String>>(what: T) -> Self {
        StoreError::Conflict(what.into())
    }

    pub fn invalid_reference<T: Into<String>>(what: T) -> Self {
        StoreError::InvalidReference(what.into())
    }

    /// Get error code for consistent reporting
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "DATABASE_ERROR",
            StoreError::NotFound(_) => "RECORD_NOT_FOUND",
            StoreError::Conflict(_) => "RECORD_CONFLICT",
            StoreError::InvalidReference(_) => "INVALID_REFERENCE",
            StoreError::Migration(_) => "MIGRATION_ERROR",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::InvalidReference(db.message().to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StoreError::not_found("post 3").error_code(), "RECORD_NOT_FOUND");
        assert_eq!(StoreError::conflict("slug").error_code(), "RECORD_CONFLICT");
        assert_eq!(
            StoreError::Database("boom".to_string()).to_string(),
            "Database error: boom"
        );
    }

    #[test]
    fn test_row_not_found_conversion() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
