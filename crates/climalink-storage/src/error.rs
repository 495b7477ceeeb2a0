use thiserror::Error;

/// Storage-specific error types for the reading store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection or query execution failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Query arguments rejected before reaching the database
    #[error("Validation error: {0}")]
    Validation(String),

    /// Date/time conversion error
    #[error("DateTime error: {0}")]
    DateTime(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
