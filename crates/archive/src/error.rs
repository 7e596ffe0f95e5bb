//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened or read from disk.
    #[display("unable to read file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The file is not a readable archive (corrupt, truncated or unsupported).
    #[display("unreadable archive: {}", _0.display())]
    UnreadableArchive(#[error(not(source))] PathBuf),
    /// The requested page does not exist in the archive.
    #[display("page {index} out of range ({count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    /// The requested metadata style is not embedded in the archive.
    #[display("no {_0} metadata in archive")]
    MissingMetadata(#[error(not(source))] crate::MetadataStyle),
    /// Embedded metadata was present but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// Details about the parsing failure.
        value: String,
    },
    /// The page image could not be decoded or re-encoded.
    #[display("image could not be decoded")]
    Image,
}
