//! Monitor Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A monitor error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Watch roots must be absolute so that catalog paths are unambiguous.
    #[display("watch root is not an absolute path: {}", _0.display())]
    InvalidRoot(#[error(not(source))] PathBuf),
    /// The monitor must be started from inside a Tokio runtime.
    #[display("no async runtime available")]
    Runtime,
    /// Opening a session, or reading from or writing to it, failed.
    #[display("catalog operation failed")]
    Catalog,
    /// A single file could not be turned into a catalog record.
    #[display("unable to process file: {}", _0.display())]
    File(#[error(not(source))] PathBuf),
    #[display("unable to watch for filesystem changes")]
    Watch,
    /// A background task panicked or was cancelled.
    #[display("background task failed")]
    Worker,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Files can be mid-copy and the database can be busy; both settle.
        matches!(self, Self::File(_) | Self::Catalog)
    }
}
