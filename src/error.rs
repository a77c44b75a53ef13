//! Error types for erasure-coding operations

use thiserror::Error;

/// Errors that can occur while building a coding context or running schedules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodingError {
    /// Bad K/M/W, packet size, seed shape or erasure index
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A bitmatrix with zero rows or columns reached the compiler
    #[error("Bitmatrix is empty ({rows}x{cols})")]
    EmptyBitmatrix { rows: usize, cols: usize },

    /// Matrix dimensions or contents violate an internal invariant
    #[error("Malformed matrix: {0}")]
    MalformedMatrix(String),

    /// The erasure pattern cannot be recovered from the surviving blocks
    #[error("Unrecoverable erasure: {0}")]
    UnrecoverableErasure(String),

    /// A caller buffer has the wrong length
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// The caller passed the wrong number of block buffers
    #[error("Buffer count mismatch: expected {expected} buffers, got {actual}")]
    BufferCountMismatch { expected: usize, actual: usize },

    /// `decode` was called before any erasure set was bound
    #[error("No erasure set has been bound; call set_erasure first")]
    NoErasureSet,
}

/// Type alias for Result with CodingError
pub type Result<T> = std::result::Result<T, CodingError>;
