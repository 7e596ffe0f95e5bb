//! Random access to the pages and tags of a single ZIP-based comic archive.

use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::metadata;
use crate::models::{Metadata, MetadataStyle};
use exn::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;
use zip::ZipArchive;

/// Upper bound on the buffer reserved ahead of reading a single entry.
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// An opened comic archive (CBZ).
///
/// Opening only reads the ZIP central directory; page data and tags are read
/// on demand. Every accessor needs `&mut self` because the underlying reader
/// seeks.
pub struct ComicArchive {
    path: PathBuf,
    zip: ZipArchive<BufReader<File>>,
    /// Page entry names, in reading order.
    pages: Vec<String>,
    /// Name of the root-level `ComicInfo.xml` entry, whatever its case.
    comic_info: Option<String>,
}

impl std::fmt::Debug for ComicArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComicArchive")
            .field("path", &self.path)
            .field("pages", &self.pages.len())
            .field("comic_info", &self.comic_info)
            .finish()
    }
}

impl ComicArchive {
    /// Returns `true` if the extension is one this crate knows how to open.
    pub fn has_archive_extension(path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| consts::ARCHIVE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    }

    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
        let zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::UnreadableArchive(path.clone()))?;
        let mut pages: Vec<String> = zip.file_names().filter(|name| is_page(name)).map(String::from).collect();
        pages.sort_by_cached_key(|name| name.to_lowercase());
        let comic_info = zip.file_names().find(|name| name.eq_ignore_ascii_case(consts::COMIC_INFO_ENTRY)).map(String::from);
        Ok(Self { path, zip, pages, comic_info })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page entry names, in reading order.
    pub fn page_names(&self) -> &[String] {
        &self.pages
    }

    /// A readable archive with at least one page image is considered a comic.
    pub fn seems_to_be_a_comic(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn has_metadata(&self, style: MetadataStyle) -> bool {
        match style {
            MetadataStyle::ComicInfo => self.comic_info.is_some(),
            MetadataStyle::ComicBookInfo => metadata::has_comic_book_info(self.zip.comment()),
        }
    }

    pub fn read_metadata(&mut self, style: MetadataStyle) -> Result<Metadata> {
        match style {
            MetadataStyle::ComicInfo => {
                let entry = self.comic_info.clone().ok_or_raise(|| ErrorKind::MissingMetadata(style))?;
                let xml = self.read_entry(&entry)?;
                metadata::parse_comic_info(&xml)
            },
            MetadataStyle::ComicBookInfo => {
                if !self.has_metadata(style) {
                    exn::bail!(ErrorKind::MissingMetadata(style));
                }
                metadata::parse_comic_book_info(self.zip.comment())
            },
        }
    }

    pub fn metadata_from_filename(&self) -> Metadata {
        metadata::metadata_from_filename(&self.path)
    }

    /// Raw (still encoded) bytes of the page at `index`.
    pub fn page(&mut self, index: usize) -> Result<Vec<u8>> {
        let count = self.pages.len();
        let name = self.pages.get(index).cloned().ok_or_raise(|| ErrorKind::PageOutOfRange { index, count })?;
        self.read_entry(&name)
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(name).or_raise(|| ErrorKind::UnreadableArchive(self.path.clone()))?;
        let mut buffer = Vec::with_capacity(preallocation(entry.size()));
        entry.read_to_end(&mut buffer).or_raise(|| ErrorKind::UnreadableArchive(self.path.clone()))?;
        Ok(buffer)
    }
}

/// Buffer size to reserve for an entry whose header claims `declared` bytes.
/// The header comes from the archive itself and may be a lie; anything past
/// the cap is grown into as the data actually arrives.
fn preallocation(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_PREALLOCATION)
}

/// Image entries count as pages, unless they are directories, hidden files,
/// or resource-fork junk added by macOS.
fn is_page(name: &str) -> bool {
    if name.ends_with('/') {
        return false;
    }
    let path = Path::new(name);
    let hidden = path.components().any(|c| {
        let c = c.as_os_str().to_string_lossy();
        c.starts_with('.') || c == "__MACOSX"
    });
    !hidden
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| consts::PAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}
