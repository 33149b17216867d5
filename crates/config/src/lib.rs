//! Layered configuration for linkstash.
//!
//! Values are merged in order, later layers winning:
//! 1. built-in defaults ([`Config::default`]),
//! 2. a config file (TOML, YAML or JSON, picked by extension), either given
//!    explicitly or `linkstash.toml` in the platform config directory,
//! 3. environment variables prefixed `LINKSTASH_` (e.g.
//!    `LINKSTASH_CONCURRENCY=8`, `LINKSTASH_EXCLUDED_HOSTS=[arxiv.org]`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use linkstash_cache::Layout;
use linkstash_fetch::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use linkstash_library::{DEFAULT_CONCURRENCY, DEFAULT_EXCLUDED_HOSTS};
use linkstash_storage::validate_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::instrument;

pub const ENV_PREFIX: &str = "LINKSTASH_";
pub const DEFAULT_FILE_NAME: &str = "linkstash.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage root holding the index file and both kind directories.
    pub root: PathBuf,
    /// Relative to `root`.
    pub index_file: PathBuf,
    /// Relative to `root`.
    pub pdf_dir: PathBuf,
    /// Relative to `root`.
    pub html_dir: PathBuf,
    /// URLs on these hosts, or any subdomain of them, are skipped.
    pub excluded_hosts: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Maximum number of resolutions in flight.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        let layout = Layout::default();
        Self {
            root: PathBuf::from("."),
            index_file: layout.index_file,
            pdf_dir: layout.pdf_dir,
            html_dir: layout.html_dir,
            excluded_hosts: DEFAULT_EXCLUDED_HOSTS.map(String::from).to_vec(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `path` must exist. Without one, the platform default file
    /// is used when present and silently skipped otherwise.
    #[instrument(skip_all, fields(explicit = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => default_file().filter(|path| path.is_file()),
        };
        if let Some(file) = &file {
            tracing::debug!(file = %file.display(), "Using config file");
        }
        Self::from_figment(figment(file.as_deref())?)
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency < 1 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.timeout_secs < 1 {
            exn::bail!(ErrorKind::Invalid("timeout_secs must be at least 1".to_string()));
        }
        let layout = self.layout()?;
        if layout.pdf_dir == layout.html_dir {
            exn::bail!(ErrorKind::Invalid("pdf_dir and html_dir must differ".to_string()));
        }
        if layout.index_file.starts_with(&layout.pdf_dir) || layout.index_file.starts_with(&layout.html_dir) {
            exn::bail!(ErrorKind::Invalid("index_file must not live inside a kind directory".to_string()));
        }
        Ok(())
    }

    /// The storage layout, with every path normalized relative to `root`.
    pub fn layout(&self) -> Result<Layout> {
        Ok(Layout {
            index_file: relative("index_file", &self.index_file)?,
            pdf_dir: relative("pdf_dir", &self.pdf_dir)?,
            html_dir: relative("html_dir", &self.html_dir)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn relative(key: &str, path: &Path) -> Result<PathBuf> {
    let outside = || ErrorKind::Invalid(format!("{key} must be a relative path inside root: {}", path.display()));
    if path.is_absolute() {
        exn::bail!(outside());
    }
    validate_path(path).or_raise(outside)
}

fn figment(file: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(file) = file {
        let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        figment = match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file_exact(file)),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
            Some("json") => figment.merge(Json::file_exact(file)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
        };
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
}

/// `linkstash.toml` inside the platform config directory, if one exists for
/// this user.
pub fn default_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "linkstash").map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
}
