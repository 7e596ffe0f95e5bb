use crate::archive::ComicArchive;
use crate::error::{ErrorKind, Result};
use crate::models::{Metadata, MetadataStyle};
use std::path::Path;
use tracing::{debug, instrument};

/// Everything the library monitor needs to know about a file on disk.
///
/// All methods block on file I/O and image decoding; async callers should run
/// them on a blocking thread.
pub trait Classifier: Send + Sync {
    /// Whether the file is a readable comic archive with at least one page.
    fn looks_like_comic(&self, path: &Path) -> bool;
    fn has_embedded_metadata(&self, path: &Path, style: MetadataStyle) -> bool;
    fn read_metadata(&self, path: &Path, style: MetadataStyle) -> Result<Metadata>;
    fn guess_metadata_from_filename(&self, path: &Path) -> Metadata;
    fn page_count(&self, path: &Path) -> Result<usize>;
    /// Raw, still-encoded image bytes of the page at `index`.
    fn decode_page(&self, path: &Path, index: usize) -> Result<Vec<u8>>;
}

/// [`Classifier`] for ZIP-based comic archives (`.cbz`, `.zip`).
///
/// Stateless: every call reopens the archive, so a file replaced between calls
/// is read fresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveClassifier;

impl ArchiveClassifier {
    pub fn new() -> Self {
        Self
    }

    fn open(&self, path: &Path) -> Result<ComicArchive> {
        if !ComicArchive::has_archive_extension(path) {
            exn::bail!(ErrorKind::UnreadableArchive(path.to_path_buf()));
        }
        ComicArchive::open(path)
    }
}

impl Classifier for ArchiveClassifier {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn looks_like_comic(&self, path: &Path) -> bool {
        match self.open(path) {
            Ok(archive) => archive.seems_to_be_a_comic(),
            Err(err) => {
                debug!(error = %err, "not a comic archive");
                false
            },
        }
    }

    fn has_embedded_metadata(&self, path: &Path, style: MetadataStyle) -> bool {
        self.open(path).is_ok_and(|archive| archive.has_metadata(style))
    }

    fn read_metadata(&self, path: &Path, style: MetadataStyle) -> Result<Metadata> {
        self.open(path)?.read_metadata(style)
    }

    fn guess_metadata_from_filename(&self, path: &Path) -> Metadata {
        crate::metadata::metadata_from_filename(path)
    }

    fn page_count(&self, path: &Path) -> Result<usize> {
        Ok(self.open(path)?.page_count())
    }

    fn decode_page(&self, path: &Path, index: usize) -> Result<Vec<u8>> {
        self.open(path)?.page(index)
    }
}
