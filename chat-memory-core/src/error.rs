//! Error types for chat-memory

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for chat-memory operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors, including an invalid store bound
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store failures: read, write, permissions, malformed content
    #[error("Storage error at {}: {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    /// I/O errors outside the session store (config files, log dirs)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Model invocation errors surfaced through the agent
    #[error("Provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Build a storage error for `path` from any displayable cause
    pub fn storage(path: impl AsRef<Path>, reason: impl std::fmt::Display) -> Self {
        Error::Storage {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the durable session store
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage { .. })
    }
}

/// A specialized Result type for chat-memory operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = Error::storage("/tmp/sessions/a.json", "permission denied");
        assert!(err.is_storage());
        assert_eq!(
            err.to_string(),
            "Storage error at /tmp/sessions/a.json: permission denied"
        );
    }

    #[test]
    fn test_config_error_is_not_storage() {
        let err = Error::Config("max_history must be > 0".to_string());
        assert!(!err.is_storage());
    }
}
