use std::path::PathBuf;
use thiserror::Error;

/// Error types for the cleaning pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The statement file handed to the script runner could not be read
    #[error("Failed to read script {}: {source}", .path.display())]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing statement output failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// The connected backend has no equivalent for a maintenance statement
    #[error("Unsupported database backend: {0}")]
    UnsupportedBackend(String),

    /// A freshly created backup does not hold the source row count
    #[error("Backup of {table} holds {actual} rows, expected {expected}")]
    BackupMismatch {
        table: String,
        expected: i64,
        actual: i64,
    },

    /// Error while rendering rows as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;
