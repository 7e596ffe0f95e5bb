//! The seam between the library monitor and whatever persists its records.

use crate::error::Result;
use async_trait::async_trait;
use derive_more::{Display, From};
use longbox_archive::{Metadata, MetadataSource};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Identifier assigned by the catalog when a comic is inserted.
#[derive(Debug, Display, From, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComicId(pub i64);

/// The identity of a catalogued file: just enough to reconcile against disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComic {
    pub id: ComicId,
    pub path: PathBuf,
    pub modified: UtcDateTime,
}

/// Everything learned about a new file, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComic {
    pub path: PathBuf,
    pub page_count: usize,
    /// On-disk modification time, already truncated to whole microseconds.
    pub modified: UtcDateTime,
    pub file_size: u64,
    /// Reserved for a content hash; always empty for now.
    pub hash: String,
    /// JPEG cover thumbnail, if one could be rendered.
    pub thumbnail: Option<Vec<u8>>,
    pub metadata: Metadata,
    pub source: MetadataSource,
}

/// A full catalog record.
#[derive(Debug, Clone, PartialEq)]
pub struct Comic {
    pub id: ComicId,
    pub path: PathBuf,
    pub page_count: usize,
    pub modified: UtcDateTime,
    pub file_size: u64,
    pub hash: String,
    pub thumbnail: Option<Vec<u8>>,
    pub metadata: Metadata,
    pub source: MetadataSource,
    pub added_at: UtcDateTime,
}

/// Something that can hand out [`Session`]s.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn session(&self) -> Result<Box<dyn Session>>;
}

/// A long-lived handle on the catalog, owned by exactly one worker.
///
/// Each bulk call is atomic: either every row is written or none are.
#[async_trait]
pub trait Session: Send {
    /// Every stored record's identity.
    async fn query_all_paths(&mut self) -> Result<Vec<StoredComic>>;

    /// Delete the given records, returning how many existed.
    async fn bulk_delete(&mut self, ids: &[ComicId]) -> Result<u64>;

    /// Insert the given comics, returning their assigned ids in input order.
    ///
    /// A comic whose path is already catalogued replaces the existing record.
    async fn bulk_insert(&mut self, comics: &[NewComic]) -> Result<Vec<ComicId>>;

    async fn count(&mut self) -> Result<u64>;

    async fn get_by_path(&mut self, path: &Path) -> Result<Option<Comic>>;
}
