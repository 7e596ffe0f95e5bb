use crate::scan::walk::{DiskFile, is_within};
use derive_more::Display;
use longbox_catalog::{ComicId, StoredComic};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use time::UtcDateTime;

/// Why a catalog record no longer matches the disk.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub(crate) enum StaleReason {
    #[display("missing on disk")]
    Missing,
    #[display("outside every watch root")]
    OutsideRoots,
    #[display("modified (catalogued {stored}, on disk {on_disk})")]
    Modified { stored: UtcDateTime, on_disk: UtcDateTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stale {
    pub(crate) id: ComicId,
    pub(crate) path: PathBuf,
    pub(crate) reason: StaleReason,
}

#[derive(Debug, Default)]
pub(crate) struct Delta {
    /// Files with no exactly matching record, in walk order.
    pub(crate) to_add: Vec<DiskFile>,
    pub(crate) to_remove: Vec<Stale>,
}

/// Compare the files on disk with the catalog by `(path, modified)`.
///
/// A modified file shows up on both sides: its old record is removed and the
/// file is read again.
pub(crate) fn reconcile(roots: &[PathBuf], on_disk: Vec<DiskFile>, stored: Vec<StoredComic>) -> Delta {
    let current: HashMap<&PathBuf, UtcDateTime> = on_disk.iter().map(|f| (&f.path, f.modified)).collect();
    let to_remove = stored
        .iter()
        .filter_map(|record| {
            let reason = match current.get(&record.path) {
                Some(modified) if *modified == record.modified => return None,
                _ if !is_within(&record.path, roots) => StaleReason::OutsideRoots,
                Some(modified) => StaleReason::Modified {
                    stored: record.modified,
                    on_disk: *modified,
                },
                None => StaleReason::Missing,
            };
            Some(Stale {
                id: record.id,
                path: record.path.clone(),
                reason,
            })
        })
        .collect();
    let catalogued: HashSet<(&PathBuf, UtcDateTime)> = stored.iter().map(|r| (&r.path, r.modified)).collect();
    let to_add = on_disk
        .iter()
        .filter(|f| !catalogued.contains(&(&f.path, f.modified)))
        .cloned()
        .collect();
    Delta { to_add, to_remove }
}
