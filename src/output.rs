use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use linkstash_library::ResourceRecord;
use std::ffi::OsString;
use std::path::Path;

/// Write records as a pretty-printed JSON array, replacing `path` only once
/// the whole report is on disk.
pub async fn write_records(path: &Path, records: &[ResourceRecord]) -> Result<()> {
    let output = || ErrorKind::Output(path.to_path_buf());
    let mut data = serde_json::to_vec_pretty(records).or_raise(output)?;
    data.push(b'\n');
    let mut staging = path.file_name().map(OsString::from).ok_or_raise(output)?;
    staging.push(linkstash_storage::STAGING_SUFFIX);
    let staging = path.with_file_name(staging);
    let written = match tokio::fs::write(&staging, &data).await {
        Ok(()) => tokio::fs::rename(&staging, path).await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        _ = tokio::fs::remove_file(&staging).await;
        return Err(err).or_raise(output);
    }
    tracing::info!(path = %path.display(), records = records.len(), "Wrote report");
    Ok(())
}
