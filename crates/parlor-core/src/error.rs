// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parlor.

use thiserror::Error;

/// The primary error type used across Parlor crates.
///
/// Most failure modes of the chat core degrade to visible state (a sentinel
/// reply, an absent engine handle, a `false` result) instead of surfacing
/// as this type. It is reserved for the cases a caller can act on.
#[derive(Debug, Error)]
pub enum ParlorError {
    /// Configuration errors (invalid TOML, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Key-value store failures (database open, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Persisted JSON could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The inference engine failed to load or to generate.
    #[error("engine error: {message}")]
    Engine {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A model download could not be issued or did not finish.
    #[error("download error: {message}")]
    Download {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A default-model download is already outstanding.
    #[error("a default model download is already in progress")]
    DownloadInProgress,

    /// The default model file is already on disk.
    #[error("the default model is already downloaded")]
    DefaultModelPresent,

    /// A caller-supplied value was rejected (e.g. a blank conversation name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Filesystem failures outside the key-value store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParlorError {
    /// Engine error without an underlying cause.
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
            source: None,
        }
    }

    /// Download error without an underlying cause.
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
            source: None,
        }
    }
}
