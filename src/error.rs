//! Application Error Types
//!
//! Everything here aborts the command with a non-zero exit code. Problems
//! with individual URLs never get this far.

use derive_more::{Display, Error};
use std::path::PathBuf;

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("invalid configuration")]
    Config,
    #[display("storage root unavailable")]
    Storage,
    #[display("could not read input {}", _0.display())]
    Input(#[error(not(source))] PathBuf),
    #[display("input {} has no `url` column", _0.display())]
    MissingUrlColumn(#[error(not(source))] PathBuf),
    #[display("cache index unavailable")]
    Cache,
    #[display("could not write output {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
}
