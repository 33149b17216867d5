use crate::error::{ErrorKind, Result};
use crate::outcome::{Outcome, ResourceRef, Stage, Summary};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream;
use linkstash_cache::{CacheEntry, CacheIndex, Kind, Layout};
use linkstash_fetch::FetcherHandle;
use linkstash_storage::BackendHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::instrument;
use url::Url;

/// Hosts skipped unless configured otherwise; their papers are handled by a
/// dedicated pipeline.
pub const DEFAULT_EXCLUDED_HOSTS: [&str; 1] = ["arxiv.org"];
/// Resolutions in flight at once during [`ResourceCache::resolve_all`].
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Turns bookmark URLs into local files, downloading each at most once.
///
/// Owns the [`CacheIndex`] for the duration of a run: load it with
/// [`open`](Self::open), resolve URLs, then [`persist`](Self::persist) it.
/// Every URL is resolved at most once per instance; repeated and concurrent
/// resolutions of the same URL share the first one's [`Outcome`].
pub struct ResourceCache {
    backend: BackendHandle,
    fetcher: FetcherHandle,
    layout: Layout,
    excluded_hosts: Vec<String>,
    index: Mutex<CacheIndex>,
    resolutions: Mutex<HashMap<String, Arc<OnceCell<Outcome>>>>,
}

impl ResourceCache {
    pub fn new(backend: BackendHandle, fetcher: FetcherHandle, layout: Layout, index: CacheIndex) -> Self {
        Self {
            backend,
            fetcher,
            layout,
            excluded_hosts: Vec::new(),
            index: Mutex::new(index),
            resolutions: Mutex::new(HashMap::new()),
        }
        .with_excluded_hosts(DEFAULT_EXCLUDED_HOSTS)
    }

    /// Load the index from `backend` and build a cache around it.
    ///
    /// # Errors
    /// [`ErrorKind::Index`] if the index file exists but can't be read or
    /// parsed.
    pub async fn open(backend: BackendHandle, fetcher: FetcherHandle, layout: Layout) -> Result<Self> {
        let index = CacheIndex::load(&*backend, &layout.index_file).await.or_raise(|| ErrorKind::Index)?;
        Ok(Self::new(backend, fetcher, layout, index))
    }

    /// Replace the excluded hosts. Each host also excludes its subdomains.
    pub fn with_excluded_hosts(mut self, hosts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.excluded_hosts = hosts
            .into_iter()
            .map(|host| host.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        self
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Snapshot of the index as it currently stands.
    pub async fn index(&self) -> CacheIndex {
        self.index.lock().await.clone()
    }

    /// Resolve a single URL.
    ///
    /// Never fails as a whole: everything that can go wrong is described by
    /// [`Outcome::Failed`].
    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn resolve(&self, url: &str) -> Outcome {
        let url = url.trim();
        let cell = self.resolutions.lock().await.entry(url.to_string()).or_default().clone();
        cell.get_or_init(|| self.resolve_once(url)).await.clone()
    }

    /// Resolve every URL with at most `concurrency` resolutions in flight.
    ///
    /// Outcomes are returned in input order, regardless of which finished
    /// first. A `concurrency` of `0` is treated as `1`.
    #[instrument(skip_all, fields(concurrency = concurrency))]
    pub async fn resolve_all<I>(&self, urls: I, concurrency: usize) -> Vec<Outcome>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let outcomes: Vec<Outcome> = stream::iter(urls)
            .map(|url| async move { self.resolve(url.as_ref()).await })
            .buffered(concurrency.max(1))
            .collect()
            .await;
        let summary: Summary = outcomes.iter().collect();
        tracing::info!(
            resolved = summary.resolved,
            skipped = summary.skipped,
            failed = summary.failed,
            "Resolution complete"
        );
        outcomes
    }

    /// Write the index back to storage, replacing the previous index file.
    pub async fn persist(&self) -> Result<()> {
        let index = self.index.lock().await;
        index.persist(&*self.backend, &self.layout.index_file).await.or_raise(|| ErrorKind::Index)
    }

    async fn resolve_once(&self, url: &str) -> Outcome {
        let outcome = self.resolve_inner(url).await;
        match &outcome {
            Outcome::Resolved(resource) => {
                tracing::debug!(url, kind = %resource.kind, id = %resource.id, "Resolved");
            },
            Outcome::Skipped => tracing::debug!(url, "Skipped excluded host"),
            Outcome::Failed(failure) => {
                tracing::warn!(url, stage = %failure.stage, reason = %failure.reason, "Resolution failed");
            },
        }
        outcome
    }

    async fn resolve_inner(&self, url: &str) -> Outcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => return Outcome::failed(url, Stage::InvalidUrl, format!("unparseable URL: {err}")),
        };
        // Excluded hosts are skipped whatever the scheme.
        if self.is_excluded(&parsed) {
            return Outcome::Skipped;
        }
        if let Err(reason) = fetchable(&parsed) {
            return Outcome::failed(url, Stage::InvalidUrl, reason);
        }
        let cached = self.index.lock().await.get(url).cloned();
        match cached {
            Some(entry) => self.verify(entry).await,
            None => self.download(url, &parsed).await,
        }
    }

    fn is_excluded(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.');
        self.excluded_hosts
            .iter()
            .any(|excluded| host == excluded || host.strip_suffix(excluded.as_str()).is_some_and(|sub| sub.ends_with('.')))
    }

    /// A cache hit only counts if the file is still there.
    async fn verify(&self, entry: CacheEntry) -> Outcome {
        let path = self.layout.path_of(&entry);
        let exists = self.backend.exists(&path).await;
        let resource = self.reference(entry);
        match exists {
            Ok(true) => Outcome::Resolved(resource),
            Ok(false) => Outcome::failed_at(
                resource,
                Stage::MissingCacheFile,
                format!("indexed file {} is missing", path.display()),
            ),
            Err(err) => Outcome::failed_at(resource, Stage::Storage, err.to_string()),
        }
    }

    async fn download(&self, url: &str, parsed: &Url) -> Outcome {
        let fetched = match self.fetcher.fetch(parsed).await {
            Ok(fetched) => fetched,
            Err(err) => return Outcome::failed(url, Stage::Network, err.to_string()),
        };
        if fetched.body.is_empty() {
            return Outcome::failed(url, Stage::Network, "empty response body");
        }
        let Some(kind) = Kind::from_content_type(&fetched.content_type) else {
            let reason = match fetched.content_type.as_str() {
                "" => "no content type declared".to_string(),
                content_type => format!("unsupported content type {content_type}"),
            };
            return Outcome::failed(url, Stage::UnsupportedType, reason);
        };
        let entry = CacheEntry::fresh(url, kind);
        let path = self.layout.path_of(&entry);
        if let Err(err) = self.backend.write(&path, &fetched.body).await {
            return Outcome::failed(url, Stage::Storage, err.to_string());
        }
        // Only index files that are completely written.
        self.index.lock().await.insert(entry.clone());
        tracing::info!(url, kind = %kind, bytes = fetched.body.len(), path = %path.display(), "Downloaded");
        Outcome::Resolved(self.reference(entry))
    }

    fn reference(&self, entry: CacheEntry) -> ResourceRef {
        let relative = self.layout.path_of(&entry);
        let path = self.backend.locate(&relative).unwrap_or(relative);
        ResourceRef {
            url: entry.url,
            kind: entry.kind,
            id: entry.id,
            path,
        }
    }
}

fn fetchable(url: &Url) -> std::result::Result<(), String> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {}", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("URL has no host".to_string());
    }
    Ok(())
}
