//! Error types for confeed.
//!
//! Library crates use [`ConfeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all confeed operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfeedError {
    /// Credentials rejected by the content source.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested space key does not resolve on the content source.
    #[error("space not found: {space_key}")]
    SpaceNotFound { space_key: String },

    /// Network/transport error talking to the content source or sink.
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected HTTP status from the content source.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The ingestion service rejected a submission.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConfeedError>;

impl ConfeedError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
