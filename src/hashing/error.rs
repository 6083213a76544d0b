//! Hashing error types.

use thiserror::Error;

/// Errors raised while fingerprinting files and content.
#[derive(Debug, Error)]
pub enum HashError {
    /// reading the source failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// the requested digest algorithm isn't supported
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// chunked reads need a non-empty buffer
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    /// walking a directory tree failed
    #[error("failed to walk {path}: {reason}")]
    Walk { path: String, reason: String },
}

/// result type alias for hashing operations
pub type HashResult<T> = Result<T, HashError>;
