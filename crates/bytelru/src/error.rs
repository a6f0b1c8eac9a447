//! Error types for bytelru

use std::fmt;

use crate::lru::Key;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error conditions surfaced by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity must be at least 1
    InvalidCapacity(i64),

    /// Key falls outside `[0, limit)`
    KeyOutOfRange {
        /// Key supplied by the caller
        key: i64,
        /// Exclusive upper bound of the key domain
        limit: u32,
    },

    /// Key is not currently held by the cache
    CacheMiss(Key),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(capacity) => {
                write!(f, "Invalid capacity: {} (must be greater than 0)", capacity)
            }
            Error::KeyOutOfRange { key, limit } => {
                write!(f, "Key out of range: {} (must be 0-{})", key, limit - 1)
            }
            Error::CacheMiss(key) => write!(f, "Item not in cache: {}", key),
        }
    }
}

impl std::error::Error for Error {}

/// Returned by `check_invariants` when the index and the recency list disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Description of the violated invariant
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}
