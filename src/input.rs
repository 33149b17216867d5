use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use linkstash_library::ResourceRecord;
use std::path::Path;

const URL_COLUMN: &str = "url";

/// Read the `url` column of a bookmarks CSV, in file order.
///
/// Other columns are ignored. Rows too short to have a URL are skipped with a
/// warning; values that aren't valid URLs are kept so they show up as
/// failures in the report.
pub fn read_urls(path: &Path) -> Result<Vec<String>> {
    let input = || ErrorKind::Input(path.to_path_buf());
    let mut reader = csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_path(path).or_raise(input)?;
    let headers = reader.headers().or_raise(input)?;
    let Some(column) = headers.iter().position(|header| header.eq_ignore_ascii_case(URL_COLUMN)) else {
        exn::bail!(ErrorKind::MissingUrlColumn(path.to_path_buf()));
    };
    let mut urls = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.or_raise(input)?;
        match record.get(column) {
            Some(url) => urls.push(url.to_string()),
            None => tracing::warn!(row = row + 1, "Row has no url value; skipping"),
        }
    }
    tracing::info!(path = %path.display(), urls = urls.len(), "Read bookmarks");
    Ok(urls)
}

/// Read a JSON resolution report.
pub async fn read_records(path: &Path) -> Result<Vec<ResourceRecord>> {
    let input = || ErrorKind::Input(path.to_path_buf());
    let data = tokio::fs::read(path).await.or_raise(input)?;
    serde_json::from_slice(&data).or_raise(input)
}
