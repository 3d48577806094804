//! Migration error types

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// IO error reading or writing migration state
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Persisted JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog is missing a required field
    #[error("catalog missing required field '{0}'")]
    CatalogField(&'static str),

    /// Note type has no target directory mapping
    #[error("unknown note type '{0}'")]
    UnknownType(String),

    /// Input file for a stage has not been produced yet
    #[error("input not found: {0}")]
    MissingInput(String),
}

/// Specialized Result type for migration operations
pub type MigrateResult<T> = Result<T, MigrateError>;
