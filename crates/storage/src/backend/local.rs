//! Local filesystem storage backend.
//!
//! Files are stored in a configured directory and accessed using
//! `tokio::fs`. Writes go to a staging sibling first and are renamed into
//! place, so a crash mid-download never leaves a truncated file under the
//! real name.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::path::{staging as staging_path, validate as validate_path};
use crate::{FileInfo, StorageBackend, error::Result};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncWriteExt;

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// All paths are relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use linkstash_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/home/me/bookmarks")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at `root`.
    ///
    /// The root is created if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Only happens once at startup; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_path(relative)
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Pulled out of the walk so errors can use `?`; the stream body then
    /// only has to decide what to yield.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_path(&path)?;
        if metadata.is_dir() {
            // Keep descending while we are still above the prefix.
            let wanted = prefix.is_none_or(|pfx| relative.starts_with(pfx) || pfx.starts_with(&relative));
            return Ok(if wanted { WalkEntry::Descend(path) } else { WalkEntry::Skip });
        }
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(FileInfo::new(relative, metadata.len())));
        }
        // Most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }

    async fn write_staged(staged: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(staged).await?;
        file.write_all(data).await?;
        // Data must be on disk before the rename makes it visible.
        file.sync_all().await
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate(&self, path: &Path) -> Option<PathBuf> {
        self.absolute_path(path).ok()
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // A kind directory that was never written to is simply empty.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        let staged = staging_path(&abs_path);
        let written = match Self::write_staged(&staged, data).await {
            Ok(()) => fs::rename(&staged, &abs_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staged).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(path = %staged.display(), error = %cleanup, "Could not remove staging file");
            }
            exn::bail!(Self::map_io_error(e, path));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STAGING_SUFFIX;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", temp_dir.path()).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("local", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("local", "relative/path").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("cache");
        LocalBackend::new("local", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        assert!(LocalBackend::new("local", &file).is_err());
    }

    #[test]
    fn test_locate() {
        let (temp_dir, backend) = backend();
        assert_eq!(
            backend.locate(Path::new("downloaded_pdfs/a.pdf")).unwrap(),
            temp_dir.path().join("downloaded_pdfs/a.pdf")
        );
        assert!(backend.locate(Path::new("../escape.pdf")).is_none());
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("downloaded_html/a.html"), b"<html></html>").await.unwrap();
        assert_eq!(backend.read(Path::new("downloaded_html/a.html")).await.unwrap(), b"<html></html>");
    }

    #[tokio::test]
    async fn test_write_leaves_no_staging_file() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("downloaded_pdfs/a.pdf"), b"%PDF-1.7").await.unwrap();
        let staged = temp_dir.path().join(format!("downloaded_pdfs/a.pdf{STAGING_SUFFIX}"));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("download_log.csv"), b"old").await.unwrap();
        backend.write(Path::new("download_log.csv"), b"new").await.unwrap();
        assert_eq!(backend.read(Path::new("download_log.csv")).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_contents() {
        let (temp_dir, backend) = backend();
        backend.write(Path::new("downloaded_pdfs/a.pdf"), b"original").await.unwrap();
        // A directory squatting on the staging name makes the staged write fail.
        std::fs::create_dir(temp_dir.path().join(format!("downloaded_pdfs/a.pdf{STAGING_SUFFIX}"))).unwrap();
        assert!(backend.write(Path::new("downloaded_pdfs/a.pdf"), b"replacement").await.is_err());
        assert_eq!(backend.read(Path::new("downloaded_pdfs/a.pdf")).await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_exists() {
        let (_temp_dir, backend) = backend();
        assert!(!backend.exists(Path::new("a.html")).await.unwrap());
        backend.write(Path::new("a.html"), b"data").await.unwrap();
        assert!(backend.exists(Path::new("a.html")).await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_temp_dir, backend) = backend();
        let err = backend.read(Path::new("downloaded_html/gone.html")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_reports_sizes() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("downloaded_html/b.html"), b"12345").await.unwrap();
        let files = backend.list(Some(Path::new("downloaded_html"))).await.unwrap();
        assert_eq!(files, vec![FileInfo::new("downloaded_html/b.html", 5)]);
    }

    #[tokio::test]
    async fn test_list_with_prefix() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("downloaded_pdfs/a.pdf"), b"a").await.unwrap();
        backend.write(Path::new("downloaded_pdfs/b.pdf"), b"b").await.unwrap();
        backend.write(Path::new("downloaded_pdfs_old/c.pdf"), b"c").await.unwrap();
        backend.write(Path::new("download_log.csv"), b"url,kind,id\n").await.unwrap();
        assert_eq!(backend.list(None).await.unwrap().len(), 4);
        let files = backend.list(Some(Path::new("downloaded_pdfs"))).await.unwrap();
        let mut paths: Vec<_> = files.into_iter().map(|f| f.path).collect();
        paths.sort();
        assert_eq!(paths, vec![PathBuf::from("downloaded_pdfs/a.pdf"), PathBuf::from("downloaded_pdfs/b.pdf")]);
    }

    #[tokio::test]
    async fn test_list_nested_prefix() {
        let (_temp_dir, backend) = backend();
        backend.write(Path::new("cache/pdf/a.pdf"), b"a").await.unwrap();
        backend.write(Path::new("cache/html/b.html"), b"b").await.unwrap();
        let files = backend.list(Some(Path::new("cache/pdf"))).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("cache/pdf/a.pdf"));
    }

    #[tokio::test]
    async fn test_list_missing_prefix_is_empty() {
        let (_temp_dir, backend) = backend();
        assert!(backend.list(Some(Path::new("downloaded_pdfs"))).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_security() {
        let (_temp_dir, backend) = backend();
        assert!(backend.read(Path::new("../etc/passwd")).await.is_err());
        assert!(backend.write(Path::new("../escape"), b"data").await.is_err());
        assert!(backend.exists(Path::new("a/../../file")).await.is_err());
    }
}
