//! Error types for persist-machine

use thiserror::Error;

/// Errors raised while declaring, loading or saving persisted state.
#[derive(Debug, Error)]
pub enum Error {
    #[error("slice '{name}' has no `key`; every persisted slice needs a storage key")]
    MissingKey { name: String },

    #[error("storage key '{key}' is used by both '{first}' and '{second}'")]
    DuplicateKey {
        key: String,
        first: String,
        second: String,
    },

    #[error("invalid persist structure: {0}")]
    InvalidStructure(#[source] serde_json::Error),

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend failed: {0}")]
    Storage(String),

    #[error("persist writer is no longer running")]
    WriterClosed,
}

impl Error {
    /// Wrap an arbitrary backend failure message.
    pub fn storage(message: impl std::fmt::Display) -> Self {
        Error::Storage(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
