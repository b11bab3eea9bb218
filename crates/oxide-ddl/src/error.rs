//! Error types for the schema driver.

use std::path::PathBuf;

use oxide_ddl_core::builder::SchemaErrors;
use oxide_ddl_core::catalog::IntrospectionError;
use oxide_ddl_core::dialect::{DialectKind, GenerateError};
use oxide_ddl_core::reconcile::ReconcileError;

/// Errors that can occur while loading, planning or applying a schema.
#[derive(Debug, thiserror::Error)]
pub enum EnsureError {
    /// Database error during introspection.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A table could not be read.
    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    /// A generated statement was rejected by the database.
    #[error("Failed to execute '{sql}': {source}")]
    Statement {
        /// The statement that failed.
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    /// IO error (reading schema files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a schema file.
    #[error("Failed to parse schema file '{path}': {message}")]
    ParseError {
        /// Path to the schema file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The declared schema is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaErrors),

    /// Reconciliation failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// A statement could not be generated.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The database URL scheme is not recognized.
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    /// The declared schema targets a different database.
    #[error("Schema was built for {declared}, but the database is {database}")]
    DialectMismatch {
        /// Dialect of the declared schema.
        declared: DialectKind,
        /// Dialect of the connected database.
        database: DialectKind,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, EnsureError>;
