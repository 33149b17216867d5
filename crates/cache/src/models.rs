use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Classification of a downloaded resource.
///
/// Decides which directory the resource is stored in and which extraction
/// method runs on it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Pdf,
    Html,
}
impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Pdf, Kind::Html];

    /// Tag written to the index file and to resolution output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Pdf => "PDF",
            Kind::Html => "HTML",
        }
    }

    /// File extension appended to generated ids.
    pub fn extension(&self) -> &'static str {
        match self {
            Kind::Pdf => "pdf",
            Kind::Html => "html",
        }
    }

    /// Classify a declared content type.
    ///
    /// Matching is by substring so parameters (`; charset=utf-8`) and odd
    /// capitalisation don't matter. Returns `None` for anything that is
    /// neither a PDF nor an HTML document.
    ///
    /// ```
    /// use linkstash_cache::Kind;
    /// assert_eq!(Kind::from_content_type("application/pdf"), Some(Kind::Pdf));
    /// assert_eq!(Kind::from_content_type("Text/HTML; charset=UTF-8"), Some(Kind::Html));
    /// assert_eq!(Kind::from_content_type("image/png"), None);
    /// ```
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("application/pdf") {
            Some(Kind::Pdf)
        } else if content_type.contains("text/html") {
            Some(Kind::Html)
        } else {
            None
        }
    }

    /// Generate a fresh, collision-free id for a resource of this kind.
    pub fn fresh_id(&self) -> String {
        format!("{}.{}", Uuid::new_v4(), self.extension())
    }
}
impl FromStr for Kind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "html" => Self::Html,
            _ => exn::bail!(ErrorKind::UnknownKind(s.to_string())),
        })
    }
}
impl Display for Kind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One cached resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub url: String,
    pub kind: Kind,
    /// Opaque file name inside the kind's directory.
    pub id: String,
}
impl CacheEntry {
    pub fn new(url: impl Into<String>, kind: Kind, id: impl Into<String>) -> Self {
        Self { url: url.into(), kind, id: id.into() }
    }

    /// A new entry with a freshly generated id.
    pub fn fresh(url: impl Into<String>, kind: Kind) -> Self {
        Self::new(url, kind, kind.fresh_id())
    }
}

/// Where the index file and the per-kind directories live, relative to the
/// storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub index_file: PathBuf,
    pub pdf_dir: PathBuf,
    pub html_dir: PathBuf,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            index_file: PathBuf::from("download_log.csv"),
            pdf_dir: PathBuf::from("downloaded_pdfs"),
            html_dir: PathBuf::from("downloaded_html"),
        }
    }
}
impl Layout {
    pub fn dir(&self, kind: Kind) -> &Path {
        match kind {
            Kind::Pdf => &self.pdf_dir,
            Kind::Html => &self.html_dir,
        }
    }

    /// Storage path of a cached resource.
    pub fn path_of(&self, entry: &CacheEntry) -> PathBuf {
        self.dir(entry.kind).join(&entry.id)
    }
}
