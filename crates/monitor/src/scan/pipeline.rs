use crate::error::{ErrorKind, Result};
use crate::scan::walk::DiskFile;
use derive_more::Display;
use exn::ResultExt;
use longbox_archive::{Classifier, Metadata, MetadataSource, MetadataStyle, thumbnail};
use longbox_catalog::NewComic;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// The result of running a single file through the metadata pipeline.
#[derive(Debug)]
pub enum FileOutcome {
    /// The file is a comic; this record is ready to be catalogued.
    Processed(Box<NewComic>),
    /// The file was deliberately left out of the catalog.
    Skipped(SkipReason),
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    #[display("not a comic archive")]
    NotAComic,
    /// The catalog stores paths as UTF-8 text.
    #[display("path is not valid UTF-8")]
    UnsupportedPath,
}

/// Turn a file on disk into a catalog record.
///
/// Embedded metadata is preferred in [`MetadataStyle::PREFERENCE`] order; a
/// style that is present but unparseable falls through to the next one, and
/// the file name is the last resort. Failing to count pages or to render the
/// cover thumbnail fails the whole file.
///
/// Blocks on file I/O and image decoding.
#[instrument(level = "debug", skip_all, fields(path = %file.path.display()))]
pub(crate) fn process_file(
    classifier: &dyn Classifier,
    file: &DiskFile,
    thumbnail_size: (u32, u32),
) -> Result<FileOutcome> {
    let path = file.path.as_path();
    if path.to_str().is_none() {
        warn!(path = %path.display(), "file name is not valid UTF-8, skipping");
        return Ok(FileOutcome::Skipped(SkipReason::UnsupportedPath));
    }
    if !classifier.looks_like_comic(path) {
        return Ok(FileOutcome::Skipped(SkipReason::NotAComic));
    }
    let (metadata, source) = read_metadata(classifier, path);
    let page_count = classifier.page_count(path).or_raise(|| ErrorKind::File(file.path.clone()))?;
    let cover = classifier.decode_page(path, 0).or_raise(|| ErrorKind::File(file.path.clone()))?;
    let thumbnail = thumbnail::resize(cover, thumbnail_size).or_raise(|| ErrorKind::File(file.path.clone()))?;
    debug!(source = source.as_short_str(), page_count, "read comic");
    Ok(FileOutcome::Processed(Box::new(NewComic {
        path: file.path.clone(),
        page_count,
        modified: file.modified,
        file_size: file.size,
        hash: String::new(),
        thumbnail: Some(thumbnail),
        metadata,
        source,
    })))
}

fn read_metadata(classifier: &dyn Classifier, path: &Path) -> (Metadata, MetadataSource) {
    for style in MetadataStyle::PREFERENCE {
        if !classifier.has_embedded_metadata(path, style) {
            continue;
        }
        match classifier.read_metadata(path, style) {
            Ok(metadata) => return (metadata, MetadataSource::Embedded(style)),
            Err(err) => warn!(path = %path.display(), %style, error = %err, "unable to parse embedded metadata"),
        }
    }
    (classifier.guess_metadata_from_filename(path), MetadataSource::Filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::walk::walk;
    use image::GenericImageView;
    use longbox_archive::ArchiveClassifier;
    use longbox_archive::fixtures::{CbzBuilder, png};
    use std::path::PathBuf;

    const CIX: &str = "<ComicInfo><Series>Saga</Series><Number>12</Number><Year>2013</Year></ComicInfo>";
    const CBI: &str = r#"{"appID":"test","ComicBookInfo/1.0":{"series":"Monstress","issue":"3"}}"#;

    fn disk_file(dir: &Path, name: &str, builder: CbzBuilder) -> DiskFile {
        builder.write(dir.join(name));
        walk(&[dir.to_path_buf()]).into_iter().find(|f| f.path.ends_with(name)).unwrap()
    }

    fn processed(outcome: FileOutcome) -> NewComic {
        match outcome {
            FileOutcome::Processed(comic) => *comic,
            FileOutcome::Skipped(reason) => panic!("expected a comic, skipped: {reason}"),
        }
    }

    #[test]
    fn test_comic_info_preferred_over_comic_book_info() {
        let dir = tempfile::tempdir().unwrap();
        let file = disk_file(dir.path(), "both.cbz", CbzBuilder::new().pages(2).comic_info(CIX).comic_book_info(CBI));
        let comic = processed(process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap());
        assert_eq!(comic.source, MetadataSource::Embedded(MetadataStyle::ComicInfo));
        assert_eq!(comic.metadata.series.as_deref(), Some("Saga"));
        assert_eq!(comic.metadata.issue.as_deref(), Some("12"));
        assert_eq!(comic.metadata.year, Some(2013));
        assert_eq!(comic.page_count, 2);
        assert_eq!(comic.modified, file.modified);
        assert_eq!(comic.file_size, file.size);
        assert!(comic.hash.is_empty());
    }

    #[test]
    fn test_comic_book_info_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = disk_file(dir.path(), "cbi.cbz", CbzBuilder::new().pages(1).comic_book_info(CBI));
        let comic = processed(process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap());
        assert_eq!(comic.source, MetadataSource::Embedded(MetadataStyle::ComicBookInfo));
        assert_eq!(comic.metadata.series.as_deref(), Some("Monstress"));
    }

    #[test]
    fn test_untagged_falls_back_to_filename() {
        let dir = tempfile::tempdir().unwrap();
        let file = disk_file(dir.path(), "Paper Girls 004 (2016).cbz", CbzBuilder::new().pages(1));
        let comic = processed(process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap());
        assert_eq!(comic.source, MetadataSource::Filename);
        assert_eq!(comic.metadata.series.as_deref(), Some("Paper Girls"));
    }

    #[test]
    fn test_thumbnail_fits_bound() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CbzBuilder::new().page("cover.png", png(600, 900)).pages(1);
        let file = disk_file(dir.path(), "big.cbz", builder);
        let comic = processed(process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap());
        let thumbnail = image::load_from_memory(&comic.thumbnail.unwrap()).unwrap();
        let (w, h) = thumbnail.dimensions();
        assert!(w <= 200 && h <= 200);
        assert_eq!(h, 200);
    }

    #[test]
    fn test_plain_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("B.txt");
        std::fs::write(&path, "not a comic").unwrap();
        let file = DiskFile {
            path: PathBuf::from(&path),
            modified: time::UtcDateTime::now(),
            size: 11,
        };
        let outcome = process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap();
        assert!(matches!(outcome, FileOutcome::Skipped(SkipReason::NotAComic)));
    }

    #[test]
    fn test_undecodable_cover_fails_file() {
        let dir = tempfile::tempdir().unwrap();
        let builder = CbzBuilder::new().page("cover.png", b"not really a png".to_vec());
        let file = disk_file(dir.path(), "broken.cbz", builder);
        let err = process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap_err();
        assert_eq!(*err, ErrorKind::File(file.path.clone()));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"Bad \xff.cbz"));
        CbzBuilder::new().pages(1).write(&path);
        let file = walk(&[dir.path().to_path_buf()]).pop().unwrap();
        let outcome = process_file(&ArchiveClassifier::new(), &file, (200, 200)).unwrap();
        assert!(matches!(outcome, FileOutcome::Skipped(SkipReason::UnsupportedPath)));
    }
}
