//! Consistency check between the index and the files on disk.
//!
//! Read-only. Nothing found here is ever repaired automatically.

use crate::ResourceCache;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use linkstash_cache::{CacheEntry, Kind};
use linkstash_storage::{is_staging, validate_path};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Index entries whose file is gone, sorted by URL.
    pub missing: Vec<CacheEntry>,
    /// Files in a kind directory that no index entry points at, sorted by
    /// path. Includes staging files left by interrupted writes.
    pub orphans: Vec<PathBuf>,
}
impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.orphans.is_empty()
    }

    /// Orphans that are leftovers of an interrupted write.
    pub fn staging(&self) -> impl Iterator<Item = &PathBuf> {
        self.orphans.iter().filter(|path| is_staging(path))
    }
}

impl ResourceCache {
    /// Compare the index against the contents of both kind directories.
    ///
    /// # Errors
    /// [`ErrorKind::Storage`] if the backend can't be queried at all.
    #[instrument(skip(self), fields(backend = self.backend().name()))]
    pub async fn check(&self) -> Result<CheckReport> {
        let index = self.index().await;
        let mut report = CheckReport::default();
        let mut referenced = HashSet::with_capacity(index.len());
        for entry in index.iter() {
            let path = self.layout().path_of(entry);
            if !self.backend().exists(&path).await.or_raise(|| ErrorKind::Storage)? {
                tracing::warn!(url = %entry.url, path = %path.display(), "Indexed file is missing");
                report.missing.push(entry.clone());
            }
            referenced.insert(validate_path(&path).unwrap_or(path));
        }
        for kind in Kind::ALL {
            let files = self.backend().list(Some(self.layout().dir(kind))).await.or_raise(|| ErrorKind::Storage)?;
            for file in files {
                if !referenced.contains(&file.path) {
                    tracing::warn!(path = %file.path.display(), size = file.size, "File is not in the index");
                    report.orphans.push(file.path);
                }
            }
        }
        report.missing.sort_by(|a, b| a.url.cmp(&b.url));
        report.orphans.sort();
        tracing::info!(
            entries = index.len(),
            missing = report.missing.len(),
            orphans = report.orphans.len(),
            "Check complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstash_cache::{CacheIndex, Layout};
    use linkstash_fetch::MockFetcher;
    use linkstash_storage::StorageBackend;
    use linkstash_storage::backend::MockBackend;
    use std::path::Path;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_consistent() {
        let backend = Arc::new(MockBackend::with_files([
            ("downloaded_pdfs/a.pdf", b"%PDF".as_slice()),
            ("downloaded_html/b.html", b"<html>".as_slice()),
            // Not inside a kind directory, so never an orphan.
            ("notes.txt", b"hello".as_slice()),
        ]));
        let mut index = CacheIndex::new();
        index.insert(CacheEntry::new("https://a.example/", Kind::Pdf, "a.pdf"));
        index.insert(CacheEntry::new("https://b.example/", Kind::Html, "b.html"));
        let cache = ResourceCache::new(backend, Arc::new(MockFetcher::default()), Layout::default(), index);
        let report = cache.check().await.unwrap();
        assert!(report.is_consistent(), "{report:?}");
    }

    #[tokio::test]
    async fn test_missing_and_orphans() {
        let backend = Arc::new(MockBackend::with_files([
            ("downloaded_pdfs/a.pdf", b"%PDF".as_slice()),
            ("downloaded_pdfs/stray.pdf", b"%PDF".as_slice()),
            ("downloaded_html/c.html.partial", b"<ht".as_slice()),
        ]));
        let mut index = CacheIndex::new();
        index.insert(CacheEntry::new("https://a.example/", Kind::Pdf, "a.pdf"));
        index.insert(CacheEntry::new("https://b.example/", Kind::Html, "b.html"));
        let cache = ResourceCache::new(backend.clone(), Arc::new(MockFetcher::default()), Layout::default(), index);
        let report = cache.check().await.unwrap();
        assert_eq!(report.missing, [CacheEntry::new("https://b.example/", Kind::Html, "b.html")]);
        assert_eq!(
            report.orphans,
            [PathBuf::from("downloaded_html/c.html.partial"), PathBuf::from("downloaded_pdfs/stray.pdf")]
        );
        assert_eq!(report.staging().count(), 1);
        // Reporting never touches storage or the index.
        assert_eq!(backend.len().await, 3);
        assert!(backend.exists(Path::new("downloaded_pdfs/stray.pdf")).await.unwrap());
        assert_eq!(cache.index().await.len(), 2);
    }
}
