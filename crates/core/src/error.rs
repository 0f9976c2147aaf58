// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the session storage backing the auth gate.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed storage file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Storage lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by the auth gate.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}
