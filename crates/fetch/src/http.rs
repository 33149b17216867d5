//! reqwest-backed [`Fetcher`].

use crate::error::{ErrorKind, Result};
use crate::{FetchResult, Fetcher};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Identifies as a desktop browser; plenty of sites refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.5938.132 Safari/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Fetches resources over HTTP(S), one request per call.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}
impl HttpFetcher {
    /// Build a fetcher sending `user_agent` and giving up on any single
    /// request after `timeout`.
    pub fn new(user_agent: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.as_ref())
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .or_raise(|| ErrorKind::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<FetchResult> {
        let response = self.client.get(url.as_str()).send().await.or_raise(|| ErrorKind::Request)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await.or_raise(|| ErrorKind::Body)?;
        tracing::debug!(status = status.as_u16(), content_type = %content_type, bytes = body.len(), "Fetched");
        Ok(FetchResult::new(body.to_vec(), content_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single connection with a canned raw HTTP response, handing the
    /// received request head back through the returned channel.
    async fn serve_once(response: &'static [u8]) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let (sender, receiver) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read = socket.read(&mut buffer).await.unwrap();
                if read == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read]);
            }
            _ = sender.send(String::from_utf8_lossy(&request).into_owned());
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        (Url::parse(&format!("http://{address}/resource")).unwrap(), receiver)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_pdf() {
        let (url, request) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: Application/PDF\r\nContent-Length: 8\r\nConnection: close\r\n\r\n%PDF-1.7",
        )
        .await;
        let result = fetcher().fetch(&url).await.unwrap();
        assert_eq!(result.body, b"%PDF-1.7");
        assert_eq!(result.content_type, "application/pdf");
        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /resource http/1.1"));
        assert!(request.contains("user-agent: mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_empty() {
        let (url, _request) =
            serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi").await;
        let result = fetcher().fetch(&url).await.unwrap();
        assert_eq!(result.content_type, "");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let (url, _request) = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        )
        .await;
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Status(404));
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let (url, _request) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 100\r\nConnection: close\r\n\r\n<html>",
        )
        .await;
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Body);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nothing listens on.
        let address = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let url = Url::parse(&format!("http://{address}/")).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Request);
    }

    #[tokio::test]
    async fn test_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        // Accept, then never answer.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Request);
        server.abort();
    }
}
