use crate::record::ResourceRecord;
use futures::StreamExt;
use futures::stream;
use linkstash_cache::{Kind, Layout};
use linkstash_extract::{extract_html, extract_pdf};
use linkstash_storage::BackendHandle;
use std::path::PathBuf;
use tracing::instrument;

/// Fill in the `extracted_*` fields of every resolved record.
///
/// Files are read back through `backend` using the record's kind and id.
/// Records that failed resolution pass through untouched, as do records whose
/// file can't be read (the failure is logged).
#[instrument(skip_all, fields(backend = backend.name(), records = records.len()))]
pub async fn extract_records(
    backend: &BackendHandle,
    layout: &Layout,
    records: Vec<ResourceRecord>,
    concurrency: usize,
) -> Vec<ResourceRecord> {
    stream::iter(records)
        .map(|record| extract_record(backend, layout, record))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

async fn extract_record(backend: &BackendHandle, layout: &Layout, mut record: ResourceRecord) -> ResourceRecord {
    let Some((kind, path)) = stored_path(layout, &record) else {
        return record;
    };
    let bytes = match backend.read(&path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(url = %record.url, path = %path.display(), error = %err, "Could not read cached file");
            return record;
        },
    };
    let metadata = match kind {
        Kind::Pdf => extract_pdf(bytes),
        Kind::Html => extract_html(bytes),
    };
    record.extracted_title = Some(metadata.title);
    record.extracted_author = Some(metadata.author);
    record.extracted_date = Some(metadata.date);
    record.extracted_text = Some(metadata.text);
    record
}

fn stored_path(layout: &Layout, record: &ResourceRecord) -> Option<(Kind, PathBuf)> {
    if !record.is_resolved() {
        return None;
    }
    let (kind, id) = (record.kind.as_deref()?, record.id.as_deref()?);
    match kind.parse::<Kind>() {
        Ok(kind) => Some((kind, layout.dir(kind).join(id))),
        Err(err) => {
            tracing::warn!(url = %record.url, error = %err, "Skipping record with unknown kind");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkstash_storage::backend::MockBackend;
    use std::sync::Arc;

    fn resolved(url: &str, kind: &str, id: &str) -> ResourceRecord {
        ResourceRecord {
            url: url.to_string(),
            kind: Some(kind.to_string()),
            id: Some(id.to_string()),
            local_file: Some(format!("/mock/{id}")),
            ..ResourceRecord::default()
        }
    }

    #[tokio::test]
    async fn test_extract_records() {
        let backend: BackendHandle = Arc::new(MockBackend::with_files([
            (
                "downloaded_html/1.html",
                br#"<title>Post</title><meta name="author" content="Ada"><p>Body text</p>"#.as_slice(),
            ),
            // Unparseable, so the metadata is present but empty.
            ("downloaded_pdfs/2.pdf", b"%PDF-1.7\ntruncated".as_slice()),
        ]));
        let failed = ResourceRecord {
            url: "https://c.example/".to_string(),
            stage: Some(crate::Stage::Network),
            error: Some("request failed".to_string()),
            ..ResourceRecord::default()
        };
        let records = vec![
            resolved("https://a.example/", "HTML", "1.html"),
            resolved("https://b.example/paper.pdf", "PDF", "2.pdf"),
            failed.clone(),
            resolved("https://d.example/", "HTML", "missing.html"),
        ];
        let records = extract_records(&backend, &Layout::default(), records, 2).await;

        assert_eq!(records[0].extracted_title.as_deref(), Some("Post"));
        assert_eq!(records[0].extracted_author.as_deref(), Some("Ada"));
        assert_eq!(records[0].extracted_date.as_deref(), Some(""));
        assert_eq!(records[0].extracted_text.as_deref(), Some("Post Body text"));

        assert_eq!(records[1].extracted_title.as_deref(), Some(""));
        assert_eq!(records[1].extracted_text.as_deref(), Some(""));

        assert_eq!(records[2], failed);

        assert_eq!(records[3].url, "https://d.example/");
        assert_eq!(records[3].extracted_title, None);
    }
}
