//! Canned-response [`Fetcher`] for testing.

use crate::error::{ErrorKind, Result};
use crate::{FetchResult, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// Answers from a fixed table of responses and counts every request.
///
/// URLs without a canned response fail with
/// [`Request`](crate::error::ErrorKind::Request), as an unreachable host would.
///
/// # Examples
///
/// ```
/// use linkstash_fetch::{Fetcher, MockFetcher};
/// use url::Url;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MockFetcher::default()
///     .with_response("https://example.com/paper.pdf", "application/pdf", b"%PDF-1.7".as_slice());
/// let url = Url::parse("https://example.com/paper.pdf").unwrap();
/// let result = fetcher.fetch(&url).await.unwrap();
/// assert_eq!(result.content_type, "application/pdf");
/// assert_eq!(fetcher.calls(url.as_str()).await, 1);
/// # }
/// ```
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, std::result::Result<FetchResult, ErrorKind>>,
    calls: Mutex<HashMap<String, usize>>,
}
impl MockFetcher {
    pub fn with_response(mut self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(Self::key(url), Ok(FetchResult::new(body, content_type)));
        self
    }

    pub fn with_error(mut self, url: &str, error: ErrorKind) -> Self {
        self.responses.insert(Self::key(url), Err(error));
        self
    }

    /// How many times `url` has been fetched.
    pub async fn calls(&self, url: &str) -> usize {
        self.calls.lock().await.get(&Self::key(url)).copied().unwrap_or(0)
    }

    /// Total number of fetches across all URLs.
    pub async fn total_calls(&self) -> usize {
        self.calls.lock().await.values().sum()
    }

    // Compare URLs the way `Url` serializes them, so "https://a.example" and
    // "https://a.example/" are the same key.
    fn key(url: &str) -> String {
        Url::parse(url).map(String::from).unwrap_or_else(|_| url.to_string())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        *self.calls.lock().await.entry(url.to_string()).or_default() += 1;
        // Give concurrent callers a chance to interleave, like a real request would.
        tokio::task::yield_now().await;
        match self.responses.get(url.as_str()) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(kind)) => exn::bail!(kind.clone()),
            None => exn::bail!(ErrorKind::Request),
        }
    }
}
