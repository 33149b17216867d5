//! Network acquisition of bookmarked resources.
//!
//! A [`Fetcher`] turns a URL into the raw response body and its declared
//! content type. Anything short of a complete, successful response is an
//! error: a 404 page or a truncated body is never handed on as if it were
//! the resource.

pub mod error;
mod http;
#[cfg(feature = "mock")]
mod mock;

pub use crate::http::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpFetcher};
#[cfg(feature = "mock")]
pub use crate::mock::MockFetcher;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// A successfully fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Raw response body, untouched.
    pub body: Vec<u8>,
    /// Declared content type, lower-cased and trimmed. Empty when the server
    /// didn't send one.
    pub content_type: String,
}
impl FetchResult {
    pub fn new(body: impl Into<Vec<u8>>, content_type: impl AsRef<str>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.as_ref().trim().to_ascii_lowercase(),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url`.
    ///
    /// # Errors
    /// Connection failures, timeouts, non-success statuses and unreadable
    /// bodies are all errors; see [`ErrorKind`](crate::error::ErrorKind).
    async fn fetch(&self, url: &Url) -> Result<FetchResult>;
}
