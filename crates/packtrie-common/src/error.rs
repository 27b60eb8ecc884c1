//! Error types for packtrie.

use thiserror::Error;

/// Result type alias using PacktrieError.
pub type Result<T> = std::result::Result<T, PacktrieError>;

/// Errors that can occur while building or opening a serialized index.
#[derive(Debug, Error)]
pub enum PacktrieError {
    // Builder errors
    #[error("keys not strictly ascending: key {key} at position {index}")]
    KeyOrderViolation { index: usize, key: u64 },

    #[error("key/value count mismatch: {keys} keys, {values} values")]
    KeyValueCountMismatch { keys: usize, values: usize },

    #[error("value width mismatch: expected {expected} bytes, got {actual}")]
    ValueWidthMismatch { expected: usize, actual: usize },

    #[error("index body of {body_bytes} bytes exceeds the 32-bit pointer address space")]
    AddressSpaceExceeded { body_bytes: u64 },

    // Reader errors
    #[error("truncated buffer: {len} bytes, need at least {needed}")]
    TruncatedBuffer { len: usize, needed: usize },

    #[error("variable-width values are reserved and not supported")]
    VariableWidthUnsupported,

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}
