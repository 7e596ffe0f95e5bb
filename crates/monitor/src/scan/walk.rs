use std::collections::HashSet;
use std::fs::{self, DirEntry};
use std::io;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::warn;

/// A regular file found under a watch root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiskFile {
    pub(crate) path: PathBuf,
    /// Truncated to whole microseconds so it survives a catalog round trip.
    pub(crate) modified: UtcDateTime,
    pub(crate) size: u64,
}

enum WalkEntry {
    File(DiskFile),
    Descend(PathBuf),
    Skip,
}

pub(crate) fn truncate_to_micros(timestamp: UtcDateTime) -> UtcDateTime {
    timestamp.replace_nanosecond(timestamp.nanosecond() / 1_000 * 1_000).unwrap_or(timestamp)
}

/// Every regular file under `roots`, recursively.
///
/// Entries within a directory are visited in name order, files before the
/// subdirectories that follow them, so the result is stable between runs.
/// Missing roots and unreadable directories are skipped. Symlinks to files are
/// followed; symlinks to directories are not, so there can be no cycles. A file
/// reachable from more than one root is reported once.
pub(crate) fn walk(roots: &[PathBuf]) -> Vec<DiskFile> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for root in roots {
        let mut stack = vec![root.clone()];
        while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current) {
                Ok(entries) => entries.filter_map(|entry| entry.ok()).collect::<Vec<_>>(),
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => {
                    warn!(path = %current.display(), error = %err, "unable to read directory");
                    continue;
                },
            };
            entries.sort_by_key(DirEntry::file_name);
            let mut subdirs = Vec::new();
            for entry in entries {
                match process_entry(&entry) {
                    Ok(WalkEntry::File(file)) => {
                        if seen.insert(file.path.clone()) {
                            files.push(file);
                        }
                    },
                    Ok(WalkEntry::Descend(dir)) => subdirs.push(dir),
                    Ok(WalkEntry::Skip) => {},
                    Err(err) => warn!(path = %entry.path().display(), error = %err, "unable to read file metadata"),
                }
            }
            // Popped in name order.
            stack.extend(subdirs.into_iter().rev());
        }
    }
    files
}

fn process_entry(entry: &DirEntry) -> io::Result<WalkEntry> {
    let path = entry.path();
    let file_type = entry.file_type()?;
    if file_type.is_dir() {
        return Ok(WalkEntry::Descend(path));
    }
    let metadata = if file_type.is_symlink() {
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata,
            // Broken links and links to directories.
            _ => return Ok(WalkEntry::Skip),
        }
    } else if file_type.is_file() {
        entry.metadata()?
    } else {
        return Ok(WalkEntry::Skip);
    };
    Ok(WalkEntry::File(DiskFile {
        modified: truncate_to_micros(metadata.modified()?.into()),
        size: metadata.len(),
        path,
    }))
}

/// Whether `path` lies inside any of `roots`, compared by path component.
pub(crate) fn is_within(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}
