//! Resolution of bookmark URLs into cached local resources.
//!
//! [`ResourceCache`] is the entry point: it decides for every URL whether a
//! local copy already exists, downloads and stores it if not, and reports an
//! [`Outcome`] per URL. [`ResourceRecord`]s turn outcomes into the report
//! consumed downstream, and [`extract_records`] enriches that report with
//! metadata scraped from the cached files.

mod check;
pub mod error;
mod extract;
mod outcome;
mod record;
mod resolve;

pub use crate::check::CheckReport;
pub use crate::extract::extract_records;
pub use crate::outcome::{Failure, Outcome, ResourceRef, Stage, Summary};
pub use crate::record::ResourceRecord;
pub use crate::resolve::{DEFAULT_CONCURRENCY, DEFAULT_EXCLUDED_HOSTS, ResourceCache};
