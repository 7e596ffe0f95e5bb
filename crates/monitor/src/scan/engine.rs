use crate::error::{ErrorKind, Result};
use crate::scan::pipeline::{FileOutcome, process_file};
use crate::scan::reconcile::{Delta, reconcile};
use crate::scan::walk::{DiskFile, walk};
use crate::status::{Counters, ScanStatus};
use exn::ResultExt;
use longbox_archive::Classifier;
use longbox_catalog::{ComicId, NewComic, Session};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::UtcDateTime;
use tracing::{debug, info, instrument, warn};

/// How a [`ScanEngine::full_scan`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(Counters),
    /// The stop flag was raised mid-scan. Batches committed before that point
    /// stay in the catalog; the batch being filled is dropped.
    Halted(Counters),
}

/// Reconciles the watch roots against the catalog.
///
/// Runs on the monitor's single worker only; it is not reentrant.
pub(crate) struct ScanEngine {
    classifier: Arc<dyn Classifier>,
    status: Arc<ScanStatus>,
    stop: Arc<AtomicBool>,
    batch_size: usize,
    thumbnail_size: (u32, u32),
}

impl ScanEngine {
    pub(crate) fn new(
        classifier: Arc<dyn Classifier>,
        status: Arc<ScanStatus>,
        stop: Arc<AtomicBool>,
        batch_size: usize,
        thumbnail_size: (u32, u32),
    ) -> Self {
        Self {
            classifier,
            status,
            stop,
            batch_size: batch_size.max(1),
            thumbnail_size,
        }
    }

    /// Bring the catalog in line with every file currently under `roots`.
    ///
    /// Stale records (deleted, modified or outside the roots) are removed in one
    /// call before anything is added. New files are then read one at a time, in
    /// walk order, and inserted in batches. Files that cannot be read are
    /// logged and skipped; a catalog failure aborts the scan and leaves the
    /// status as it was.
    #[instrument(level = "info", skip_all, fields(roots = roots.len()))]
    pub(crate) async fn full_scan(&self, session: &mut dyn Session, roots: &[PathBuf]) -> Result<ScanOutcome> {
        info!("scan started");
        self.status.begin_scan();
        self.status.set_detail("making a list of all files in the folders");
        let walk_roots = roots.to_vec();
        let on_disk = tokio::task::spawn_blocking(move || walk(&walk_roots)).await.or_raise(|| ErrorKind::Worker)?;
        let stored = session.query_all_paths().await.or_raise(|| ErrorKind::Catalog)?;
        debug!(on_disk = on_disk.len(), catalogued = stored.len(), "comparing library with catalog");
        let Delta { to_add, to_remove } = reconcile(roots, on_disk, stored);

        if !to_remove.is_empty() {
            for stale in &to_remove {
                info!(path = %stale.path.display(), reason = %stale.reason, "removing catalog record");
            }
            self.status.set_detail(format!("removing {} missing or modified files", to_remove.len()));
            let ids: Vec<ComicId> = to_remove.iter().map(|stale| stale.id).collect();
            let removed = session.bulk_delete(&ids).await.or_raise(|| ErrorKind::Catalog)?;
            self.status.set_removed(removed);
        }

        let total = to_add.len();
        self.status.set_total(total as u64);
        self.status.set_detail(format!("{total} new files to scan"));
        info!(total, "new files to scan");

        let mut batch: Vec<NewComic> = Vec::with_capacity(self.batch_size);
        let mut read = 0;
        for file in to_add {
            if self.stop.load(Ordering::Acquire) {
                info!(read, total, "halting scan");
                self.status.set_detail("halting scan");
                return Ok(ScanOutcome::Halted(self.status.counters()));
            }
            let path = file.path.clone();
            match self.process(file).await {
                Ok(FileOutcome::Processed(comic)) => {
                    batch.push(*comic);
                    read = self.status.file_read();
                },
                Ok(FileOutcome::Skipped(reason)) => debug!(path = %path.display(), %reason, "skipping file"),
                Err(err) => warn!(
                    path = %path.display(),
                    retryable = err.is_retryable(),
                    error = ?err,
                    "unable to read file, skipping"
                ),
            }
            let added = self.status.counters().files_added;
            self.status.set_detail(format!("{total} files: {read} scanned, {added} added to library"));
            if batch.len() >= self.batch_size {
                self.commit(session, &mut batch).await?;
            }
        }
        self.commit(session, &mut batch).await?;

        let finished = format!("finished scanning metadata in {read} of {total} files");
        info!("{finished}");
        self.status.set_detail(finished);
        let counters = self.status.counters();
        self.status.finish_scan(UtcDateTime::now());
        info!(added = counters.files_added, removed = counters.files_removed, "scan complete");
        Ok(ScanOutcome::Completed(counters))
    }

    async fn process(&self, file: DiskFile) -> Result<FileOutcome> {
        let classifier = Arc::clone(&self.classifier);
        let thumbnail_size = self.thumbnail_size;
        tokio::task::spawn_blocking(move || process_file(classifier.as_ref(), &file, thumbnail_size))
            .await
            .or_raise(|| ErrorKind::Worker)?
    }

    async fn commit(&self, session: &mut dyn Session, batch: &mut Vec<NewComic>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let ids = session.bulk_insert(batch.as_slice()).await.or_raise(|| ErrorKind::Catalog)?;
        let added = self.status.files_added(ids.len() as u64);
        debug!(batch = ids.len(), added, "committed batch to catalog");
        batch.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Phase;
    use longbox_archive::fixtures::CbzBuilder;
    use longbox_archive::{ArchiveClassifier, Metadata, MetadataSource, MetadataStyle};
    use longbox_catalog::{Catalog, MockCall, MockCatalog};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, SystemTime};

    fn engine(classifier: Arc<dyn Classifier>, stop: Arc<AtomicBool>, batch_size: usize) -> (ScanEngine, Arc<ScanStatus>) {
        let status = Arc::new(ScanStatus::new());
        let engine = ScanEngine::new(classifier, Arc::clone(&status), stop, batch_size, (200, 200));
        (engine, status)
    }

    fn archive_engine(batch_size: usize) -> (ScanEngine, Arc<ScanStatus>) {
        engine(Arc::new(ArchiveClassifier::new()), Arc::default(), batch_size)
    }

    fn library(dir: &Path, count: usize) {
        for i in 0..count {
            CbzBuilder::new().pages(1).write(dir.join(format!("Issue {i:03}.cbz")));
        }
    }

    async fn scan(engine: &ScanEngine, catalog: &MockCatalog, root: &Path) -> Result<ScanOutcome> {
        let mut session = catalog.session().await.unwrap();
        engine.full_scan(&mut *session, &[root.to_path_buf()]).await
    }

    /// Raises the stop flag while reading the `n`th file.
    struct StopAfter {
        inner: ArchiveClassifier,
        remaining: AtomicUsize,
        stop: Arc<AtomicBool>,
    }

    impl Classifier for StopAfter {
        fn looks_like_comic(&self, path: &Path) -> bool {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                self.stop.store(true, Ordering::Release);
            }
            self.inner.looks_like_comic(path)
        }
        fn has_embedded_metadata(&self, path: &Path, style: MetadataStyle) -> bool {
            self.inner.has_embedded_metadata(path, style)
        }
        fn read_metadata(&self, path: &Path, style: MetadataStyle) -> longbox_archive::error::Result<Metadata> {
            self.inner.read_metadata(path, style)
        }
        fn guess_metadata_from_filename(&self, path: &Path) -> Metadata {
            self.inner.guess_metadata_from_filename(path)
        }
        fn page_count(&self, path: &Path) -> longbox_archive::error::Result<usize> {
            self.inner.page_count(path)
        }
        fn decode_page(&self, path: &Path, index: usize) -> longbox_archive::error::Result<Vec<u8>> {
            self.inner.decode_page(path, index)
        }
    }

    #[tokio::test]
    async fn test_new_files_inserted_in_batches() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 25);
        let catalog = MockCatalog::default();
        let (engine, status) = archive_engine(10);
        let outcome = scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.insert_batches().await, vec![10, 10, 5]);
        assert_eq!(catalog.paths().await.len(), 25);
        let ScanOutcome::Completed(counters) = outcome else {
            panic!("scan did not complete");
        };
        assert_eq!(counters.files_total, 25);
        assert_eq!(counters.files_read, 25);
        assert_eq!(counters.files_added, 25);
        assert_eq!(status.phase(), Phase::Idle);
        assert_eq!(status.detail(), "");
        assert!(status.last_completed().is_some());
    }

    #[tokio::test]
    async fn test_second_scan_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 3);
        let catalog = MockCatalog::default();
        let (engine, _) = archive_engine(10);
        scan(&engine, &catalog, dir.path()).await.unwrap();
        catalog.clear_calls().await;
        let outcome = scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.calls().await, vec![MockCall::QueryAllPaths]);
        assert_eq!(outcome, ScanOutcome::Completed(Counters::default()));
    }

    #[tokio::test]
    async fn test_modified_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 3);
        let catalog = MockCatalog::default();
        let (engine, status) = archive_engine(10);
        scan(&engine, &catalog, dir.path()).await.unwrap();
        catalog.clear_calls().await;

        let touched = dir.path().join("Issue 001.cbz");
        let before = catalog.comic(&touched).await.unwrap();
        let file = std::fs::File::options().write(true).open(&touched).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60)).unwrap();
        drop(file);

        scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.deleted_count().await, 1);
        assert_eq!(catalog.insert_batches().await, vec![1]);
        assert_eq!(catalog.paths().await.len(), 3);
        let counters = status.counters();
        assert_eq!((counters.files_removed, counters.files_added), (1, 1));
        let replaced = catalog.comic(&touched).await.unwrap();
        assert!(replaced.modified > before.modified);
    }

    #[tokio::test]
    async fn test_deleted_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 2);
        let catalog = MockCatalog::default();
        let (engine, _) = archive_engine(10);
        scan(&engine, &catalog, dir.path()).await.unwrap();
        std::fs::remove_file(dir.path().join("Issue 000.cbz")).unwrap();
        scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.paths().await, vec![dir.path().join("Issue 001.cbz")]);
    }

    #[tokio::test]
    async fn test_records_outside_roots_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 1);
        let catalog = MockCatalog::with_comics([NewComic {
            path: PathBuf::from("/old-library/Issue 000.cbz"),
            page_count: 1,
            modified: UtcDateTime::now(),
            file_size: 10,
            hash: String::new(),
            thumbnail: None,
            metadata: Metadata::default(),
            source: MetadataSource::Filename,
        }]);
        let (engine, _) = archive_engine(10);
        scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.paths().await, vec![dir.path().join("Issue 000.cbz")]);
        assert!(catalog.calls().await.contains(&MockCall::Delete(vec![ComicId(1)])));
    }

    #[tokio::test]
    async fn test_stop_flag_halts_within_one_file() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 25);
        let catalog = MockCatalog::default();
        let stop = Arc::new(AtomicBool::new(false));
        let classifier = StopAfter {
            inner: ArchiveClassifier::new(),
            remaining: AtomicUsize::new(12),
            stop: Arc::clone(&stop),
        };
        let (engine, status) = engine(Arc::new(classifier), stop, 10);
        let outcome = scan(&engine, &catalog, dir.path()).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Halted(counters) if counters.files_read == 12));
        // The first batch was committed; the two files read since were not.
        assert_eq!(catalog.insert_batches().await, vec![10]);
        assert_eq!(catalog.paths().await.len(), 10);
        assert_eq!(status.detail(), "halting scan");
        assert_eq!(status.last_completed(), None);
    }

    #[tokio::test]
    async fn test_mixed_library() {
        let dir = tempfile::tempdir().unwrap();
        CbzBuilder::new()
            .pages(2)
            .comic_info("<ComicInfo><Series>Saga</Series><Number>1</Number></ComicInfo>")
            .write(dir.path().join("A.cbz"));
        std::fs::write(dir.path().join("B.txt"), "shopping list").unwrap();
        CbzBuilder::new().pages(1).write(dir.path().join("C.cbz"));

        let catalog = MockCatalog::default();
        let (engine, status) = archive_engine(10);
        scan(&engine, &catalog, dir.path()).await.unwrap();
        assert_eq!(catalog.paths().await, vec![dir.path().join("A.cbz"), dir.path().join("C.cbz")]);
        let a = catalog.comic(dir.path().join("A.cbz")).await.unwrap();
        assert_eq!(a.source, MetadataSource::Embedded(MetadataStyle::ComicInfo));
        assert_eq!(a.metadata.series.as_deref(), Some("Saga"));
        assert!(a.thumbnail.is_some());
        let c = catalog.comic(dir.path().join("C.cbz")).await.unwrap();
        assert_eq!(c.source, MetadataSource::Filename);
        let counters = status.counters();
        assert_eq!((counters.files_total, counters.files_read, counters.files_added), (3, 2, 2));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 1);
        CbzBuilder::new()
            .page("cover.png", b"garbage".to_vec())
            .write(dir.path().join("Broken.cbz"));
        let catalog = MockCatalog::default();
        let (engine, _) = archive_engine(10);
        let outcome = scan(&engine, &catalog, dir.path()).await.unwrap();
        assert!(matches!(outcome, ScanOutcome::Completed(counters) if counters.files_added == 1));
        assert_eq!(catalog.paths().await, vec![dir.path().join("Issue 000.cbz")]);
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_scan() {
        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 2);
        let catalog = MockCatalog::default();
        catalog.fail_inserts(true).await;
        let (engine, status) = archive_engine(10);
        let err = scan(&engine, &catalog, dir.path()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Catalog);
        assert_eq!(status.phase(), Phase::Scanning);
        assert_eq!(status.last_completed(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_name_does_not_block_library() {
        use longbox_catalog::Database;
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        library(dir.path(), 5);
        CbzBuilder::new().pages(1).write(dir.path().join(OsStr::from_bytes(b"Bad \xff.cbz")));
        let database = Database::connect_in_memory().await.unwrap();
        let (engine, status) = archive_engine(2);
        for _ in 0..2 {
            let mut session = database.session().await.unwrap();
            let outcome = engine.full_scan(&mut *session, &[dir.path().to_path_buf()]).await.unwrap();
            assert!(matches!(outcome, ScanOutcome::Completed(_)));
            assert_eq!(session.count().await.unwrap(), 5);
            assert_eq!(status.phase(), Phase::Idle);
        }
    }
}
