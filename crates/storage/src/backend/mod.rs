//! Storage backend trait and implementations.
//!
//! The resource cache only ever needs a handful of operations: check that a
//! cached file is still there, write a freshly downloaded one, read files back
//! for extraction, and walk a directory to find orphans.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::FileInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;

pub(crate) type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All paths are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations enforce
/// this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use linkstash_storage::{StorageBackend, error::Result};
///
/// async fn cached_size(backend: &dyn StorageBackend) -> Result<u64> {
///     let path = Path::new("downloaded_pdfs/0b9f.pdf");
///     if backend.exists(path).await? {
///         Ok(backend.read(path).await?.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Absolute location of a relative storage path, if the backend has one.
    ///
    /// Downstream tools open cached resources by this path, so backends that
    /// don't live on a filesystem return `None`.
    fn locate(&self, path: &Path) -> Option<PathBuf>;

    /// List all files matching an optional prefix.
    ///
    /// Collects [`list_stream()`](Self::list_stream) into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream file metadata matching an optional prefix.
    ///
    /// Prefix matching is component-based: `downloaded_pdfs` matches
    /// `downloaded_pdfs/a.pdf` but not `downloaded_pdfs_old/a.pdf`. Listing a
    /// prefix that doesn't exist yields nothing rather than an error.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents atomically.
    ///
    /// Either the complete `data` ends up at `path`, or `path` is left as it
    /// was before the call. Parent directories are created as needed and an
    /// existing file is replaced.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}
