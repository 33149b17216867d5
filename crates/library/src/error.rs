//! Library Error Types
//!
//! Only failures that make a whole run meaningless end up here. Anything that
//! goes wrong with a single URL is reported as a [`Failure`](crate::Failure)
//! instead, and the batch carries on.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The cache index could not be loaded or persisted.
    #[display("cache index unavailable")]
    Index,
    /// The storage backend could not be listed during a consistency check.
    #[display("storage backend unavailable")]
    Storage,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Index => false,
            Self::Storage => true,
        }
    }
}
