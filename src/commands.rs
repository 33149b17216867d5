use crate::error::{ErrorKind, Result};
use crate::input::{read_records, read_urls};
use crate::output::write_records;
use exn::ResultExt;
use linkstash_cache::Layout;
use linkstash_fetch::FetcherHandle;
use linkstash_library::{CheckReport, ResourceCache, ResourceRecord, extract_records};
use linkstash_storage::BackendHandle;
use std::path::Path;
use std::process::ExitCode;
use tracing::instrument;

/// Everything a command needs, built once from the configuration.
pub struct Context {
    pub backend: BackendHandle,
    pub fetcher: FetcherHandle,
    pub layout: Layout,
    pub excluded_hosts: Vec<String>,
    pub concurrency: usize,
}

impl Context {
    async fn open_cache(&self) -> Result<ResourceCache> {
        let cache = ResourceCache::open(self.backend.clone(), self.fetcher.clone(), self.layout.clone())
            .await
            .or_raise(|| ErrorKind::Cache)?;
        Ok(cache.with_excluded_hosts(&self.excluded_hosts))
    }
}

/// Resolve every URL in `input`, persist the index and write the report.
///
/// The index is persisted before the report is written, so a report never
/// refers to files the next run wouldn't know about.
#[instrument(skip(ctx))]
pub async fn resolve(ctx: &Context, input: &Path, output: &Path) -> Result<ExitCode> {
    let urls = read_urls(input)?;
    let cache = ctx.open_cache().await?;
    let outcomes = cache.resolve_all(&urls, ctx.concurrency).await;
    cache.persist().await.or_raise(|| ErrorKind::Cache)?;
    let records: Vec<ResourceRecord> = outcomes.iter().filter_map(ResourceRecord::from_outcome).collect();
    write_records(output, &records).await?;
    Ok(ExitCode::SUCCESS)
}

#[instrument(skip(ctx))]
pub async fn extract(ctx: &Context, input: &Path, output: &Path) -> Result<ExitCode> {
    let records = read_records(input).await?;
    let records = extract_records(&ctx.backend, &ctx.layout, records, ctx.concurrency).await;
    write_records(output, &records).await?;
    Ok(ExitCode::SUCCESS)
}

/// Print the consistency report. Exits with status 2 when anything is off.
#[instrument(skip(ctx))]
pub async fn check(ctx: &Context) -> Result<ExitCode> {
    let cache = ctx.open_cache().await?;
    let report = cache.check().await.or_raise(|| ErrorKind::Cache)?;
    print!("{}", render(&report));
    Ok(if report.is_consistent() { ExitCode::SUCCESS } else { ExitCode::from(2) })
}

fn render(report: &CheckReport) -> String {
    if report.is_consistent() {
        return "Cache is consistent.\n".to_string();
    }
    let mut out = String::new();
    for entry in &report.missing {
        out.push_str(&format!("missing\t{}\t{}\t{}\n", entry.kind, entry.id, entry.url));
    }
    for path in &report.orphans {
        out.push_str(&format!("orphan\t{}\n", path.display()));
    }
    out
}
