//! Index error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// IO error reading or writing the vault
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Persisted JSON could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Vault root does not exist or lacks the marker file
    #[error("vault not found at {0}")]
    VaultNotFound(PathBuf),
}

/// Specialized Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
