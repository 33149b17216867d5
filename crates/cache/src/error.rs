//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Reading or writing the index file failed.
    #[display("index storage error")]
    Storage,
    /// The index file is not a valid table (bad header, wrong column count).
    #[display("malformed index file")]
    Malformed,
    /// A row in the index file holds a value that can't be used.
    #[display("invalid index data in row {row}: {field}")]
    InvalidData {
        /// 1-based data row, excluding the header.
        row: u64,
        field: &'static str,
    },
    /// A resource kind tag that is neither PDF nor HTML.
    #[display("unknown resource kind: {_0}")]
    UnknownKind(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
