mod archive;
mod classifier;
mod consts;
pub mod error;
pub mod metadata;
pub mod models;
pub mod thumbnail;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use crate::archive::ComicArchive;
pub use crate::classifier::{ArchiveClassifier, Classifier};
pub use crate::consts::{ARCHIVE_EXTENSIONS, PAGE_EXTENSIONS, THUMBNAIL_SIZE};
pub use crate::models::{Credit, Metadata, MetadataSource, MetadataStyle};
