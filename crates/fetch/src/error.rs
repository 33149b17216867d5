//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The HTTP client could not be constructed (bad configuration).
    #[display("could not build HTTP client")]
    Client,
    /// The request never produced a response: DNS, connect, TLS or timeout.
    #[display("request failed")]
    Request,
    /// The server answered with a non-success status.
    #[display("unsuccessful response status {_0}")]
    Status(#[error(not(source))] u16),
    /// The response body could not be read to the end.
    #[display("unreadable response body")]
    Body,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Client => false,
            Self::Request | Self::Body => true,
            Self::Status(code) => *code == 429 || *code >= 500,
        }
    }
}
