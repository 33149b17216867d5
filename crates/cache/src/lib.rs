//! Persisted URL index for the resource cache.
//!
//! The index is the only record of which URLs have already been downloaded.
//! It maps every URL to the [`Kind`] of resource it turned out to be and the
//! opaque id the resource is stored under. The files themselves live in one
//! directory per kind, laid out according to a [`Layout`].
//!
//! # Lifecycle
//! 1. [`CacheIndex::load`] once at startup (an absent index file is an empty
//!    index),
//! 2. [`CacheIndex::get`]/[`CacheIndex::insert`] while resolving URLs,
//! 3. [`CacheIndex::persist`] at the end of the run, replacing the index file
//!    atomically.

pub mod error;
mod index;
mod models;

pub use crate::index::CacheIndex;
pub use crate::models::{CacheEntry, Kind, Layout};
