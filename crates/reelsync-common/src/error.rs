//! Common error types used throughout reelsync.
//!
//! This module provides a unified error type that covers common failure cases
//! such as not found, invalid input, closed pipelines, and I/O failures.

/// Common error type for reelsync.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested item was not found.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// The remote server rejected our credentials or is shedding load.
    #[error("Unauthorized")]
    Unauthorized,

    /// A pipeline channel is closed and can no longer accept work.
    #[error("Pipeline closed: {0}")]
    PipelineClosed(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new PipelineClosed error.
    pub fn pipeline_closed<S: Into<String>>(msg: S) -> Self {
        Self::PipelineClosed(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
