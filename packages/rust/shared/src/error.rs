//! Error types for ecoscout.
//!
//! Library crates use [`EcoscoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Inside a research run most of these never reach the caller: the pipeline
//! turns them into diagnostic text on the research context instead.

use std::path::PathBuf;

/// Top-level error type for all ecoscout operations.
#[derive(Debug, thiserror::Error)]
pub enum EcoscoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// GitHub answered with a non-2xx status.
    #[error("GitHub API error: {status} - {body}")]
    GithubApi { status: u16, body: String },

    /// A response body could not be decoded into the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Generative model error (transport, API, or response shape).
    #[error("model error: {0}")]
    Model(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty topic, zero bounds, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, EcoscoutError>;

impl EcoscoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
