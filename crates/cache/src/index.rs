use crate::error::{ErrorKind, Result};
use crate::models::{CacheEntry, Kind};
use exn::ResultExt;
use linkstash_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};
use tracing::instrument;

const HEADER: [&str; 3] = ["url", "kind", "id"];

/// A row of the index table exactly as it appears on disk.
///
/// Older index files used `filetype` and `uuid` as column names; both are
/// still accepted when loading.
#[derive(Debug, Serialize, Deserialize)]
struct IndexRow {
    url: String,
    #[serde(alias = "filetype")]
    kind: String,
    #[serde(alias = "uuid")]
    id: String,
}
impl IndexRow {
    fn into_entry(self, row: u64) -> Result<CacheEntry> {
        if self.url.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidData { row, field: "url" });
        }
        let kind = self.kind.parse::<Kind>().or_raise(|| ErrorKind::InvalidData { row, field: "kind" })?;
        // The id becomes a file name inside the kind directory, so it must be
        // exactly one plain path component.
        let mut components = Path::new(&self.id).components();
        let single = match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => name == self.id.as_str(),
            _ => false,
        };
        if !single {
            exn::bail!(ErrorKind::InvalidData { row, field: "id" });
        }
        Ok(CacheEntry::new(self.url, kind, self.id))
    }
}
impl From<&CacheEntry> for IndexRow {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            url: entry.url.clone(),
            kind: entry.kind.as_str().to_string(),
            id: entry.id.clone(),
        }
    }
}

/// In-memory view of the persisted URL index.
///
/// Not synchronised; callers that resolve concurrently wrap it in a lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
}
impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index stored at `path`.
    ///
    /// A missing file is an empty index. A malformed file is an error rather
    /// than a partial index: silently dropping rows would re-download those
    /// URLs and orphan their files.
    #[instrument(skip(backend, path), fields(backend = backend.name(), path = %path.display()))]
    pub async fn load(backend: &dyn StorageBackend, path: &Path) -> Result<Self> {
        if !backend.exists(path).await.or_raise(|| ErrorKind::Storage)? {
            tracing::info!("No index file yet; starting with an empty index");
            return Ok(Self::new());
        }
        let data = backend.read(path).await.or_raise(|| ErrorKind::Storage)?;
        let index = Self::from_csv(&data)?;
        tracing::info!(entries = index.len(), "Loaded index");
        Ok(index)
    }

    /// Replace the index file at `path` with the current contents.
    #[instrument(skip(self, backend, path), fields(backend = backend.name(), path = %path.display(), entries = self.len()))]
    pub async fn persist(&self, backend: &dyn StorageBackend, path: &Path) -> Result<()> {
        let data = self.to_csv()?;
        backend.write(path, &data).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!("Persisted index");
        Ok(())
    }

    fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
        let mut entries = HashMap::new();
        for (number, record) in reader.deserialize::<IndexRow>().enumerate() {
            let row = u64::try_from(number).unwrap_or(u64::MAX).saturating_add(1);
            let entry = record.or_raise(|| ErrorKind::Malformed)?.into_entry(row)?;
            if let Some(previous) = entries.insert(entry.url.clone(), entry) {
                tracing::warn!(url = %previous.url, row, "Duplicate URL in index; keeping the later row");
            }
        }
        Ok(Self { entries })
    }

    fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        writer.write_record(HEADER).or_raise(|| ErrorKind::Storage)?;
        // Row order carries no meaning; sorting keeps diffs of the file readable.
        let mut rows: Vec<IndexRow> = self.entries.values().map(IndexRow::from).collect();
        rows.sort_by(|a, b| a.url.cmp(&b.url));
        for row in rows {
            writer.serialize(row).or_raise(|| ErrorKind::Storage)?;
        }
        writer.into_inner().map_err(|e| e.into_error()).or_raise(|| ErrorKind::Storage)
    }

    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Record a resource. Only call once its file is completely written.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(entry.url.clone(), entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }
}
