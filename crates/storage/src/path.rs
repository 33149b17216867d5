//! Path validation and staging helpers.
//!
//! Resource ids come from a CSV file on disk that anyone can edit, so every
//! path handed to a backend is normalized and checked here before it gets
//! anywhere near the filesystem.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Suffix given to files while an atomic write is still in progress.
pub const STAGING_SUFFIX: &str = ".partial";

/// Validates a storage path, ensuring it never escapes the storage root.
///
/// Returns the normalized path if valid, or
/// [`InvalidPath`](crate::error::ErrorKind::InvalidPath) if invalid.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use linkstash_storage::validate_path;
/// assert!(validate_path("downloaded_pdfs/0b9f.pdf").is_ok());
/// assert!(validate_path("downloaded_html/../download_log.csv").is_ok());
/// assert!(validate_path("../download_log.csv").is_err());
/// assert!(validate_path("a\0b").is_err());
/// assert_eq!(
///     validate_path("./downloaded_html//x/../page.html").unwrap(),
///     Path::new("downloaded_html/page.html")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            // Null bytes pass through Path::components() on Unix but truncate
            // the path in C-based syscalls.
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}

/// Sibling path used while writing `path`; renamed over `path` once complete.
pub fn staging(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    path.with_file_name(name)
}

/// Whether `path` names a leftover staging file from an interrupted write.
pub fn is_staging(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(STAGING_SUFFIX))
}
