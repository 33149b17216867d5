mod cli;
mod commands;
mod error;
mod input;
mod output;

use crate::cli::{Args, Command, LogFormat};
use crate::commands::Context;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use linkstash_config::Config;
use linkstash_fetch::HttpFetcher;
use linkstash_storage::backend::LocalBackend;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet, args.log_format);
    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "{err}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = Config::load(args.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
        config.validate().or_raise(|| ErrorKind::Config)?;
    }
    let ctx = context(&config)?;
    match args.command {
        Command::Resolve { input, output } => commands::resolve(&ctx, &input, &output).await,
        Command::Extract { input, output } => commands::extract(&ctx, &input, &output).await,
        Command::Check => commands::check(&ctx).await,
    }
}

fn context(config: &Config) -> Result<Context> {
    let root = std::path::absolute(&config.root).or_raise(|| ErrorKind::Config)?;
    let backend = LocalBackend::new("local", &root).or_raise(|| ErrorKind::Storage)?;
    let fetcher = HttpFetcher::new(&config.user_agent, config.timeout()).or_raise(|| ErrorKind::Config)?;
    tracing::debug!(root = %root.display(), concurrency = config.concurrency, "Configured");
    Ok(Context {
        backend: Arc::new(backend),
        fetcher: Arc::new(fetcher),
        layout: config.layout().or_raise(|| ErrorKind::Config)?,
        excluded_hosts: config.excluded_hosts.clone(),
        concurrency: config.concurrency,
    })
}

/// Logs go to stderr so reports printed on stdout stay clean.
fn init_logging(verbose: u8, quiet: bool, format: LogFormat) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new("error"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => subscriber.with_target(false).init(),
        LogFormat::Json => subscriber.json().init(),
    }
}
