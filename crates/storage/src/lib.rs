//! Storage backends for the resource cache.
//!
//! Everything the cache persists (downloaded resources and the index table)
//! goes through a [`StorageBackend`], addressed by paths relative to the
//! backend's root.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::models::FileInfo;
pub use crate::path::{STAGING_SUFFIX, is_staging, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
