//! Live scan progress, shared between the worker and any number of readers.

use derive_more::Display;
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use time::UtcDateTime;

#[repr(u8)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    #[display("IDLE")]
    Idle = 0,
    #[display("SCANNING")]
    Scanning = 1,
}
impl From<u8> for Phase {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Scanning,
            _ => Self::Idle,
        }
    }
}

/// Progress counters of the current (or last) scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// New or modified files found on disk.
    pub files_total: u64,
    /// Files recognised as comics and read.
    pub files_read: u64,
    /// Comics committed to the catalog.
    pub files_added: u64,
    /// Stale records deleted from the catalog.
    pub files_removed: u64,
}

/// Status of the library monitor.
///
/// Only the worker writes; anyone holding the `Arc` may read. Every field is
/// individually consistent, but a reader can observe a mix of old and new
/// fields while the worker is in the middle of an update.
#[derive(Debug, Default)]
pub struct ScanStatus {
    phase: AtomicU8,
    detail: RwLock<String>,
    last_completed: Mutex<Option<UtcDateTime>>,
    files_total: AtomicU64,
    files_read: AtomicU64,
    files_added: AtomicU64,
    files_removed: AtomicU64,
}

impl ScanStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        Phase::from(self.phase.load(Ordering::Acquire))
    }

    pub fn detail(&self) -> String {
        self.detail.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_completed(&self) -> Option<UtcDateTime> {
        *self.last_completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn counters(&self) -> Counters {
        Counters {
            files_total: self.files_total.load(Ordering::Relaxed),
            files_read: self.files_read.load(Ordering::Relaxed),
            files_added: self.files_added.load(Ordering::Relaxed),
            files_removed: self.files_removed.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase(),
            detail: self.detail(),
            last_completed: self.last_completed(),
            current_time: UtcDateTime::now(),
            counters: self.counters(),
        }
    }

    pub(crate) fn begin_scan(&self) {
        self.files_total.store(0, Ordering::Relaxed);
        self.files_read.store(0, Ordering::Relaxed);
        self.files_added.store(0, Ordering::Relaxed);
        self.files_removed.store(0, Ordering::Relaxed);
        self.phase.store(Phase::Scanning as u8, Ordering::Release);
    }

    pub(crate) fn finish_scan(&self, at: UtcDateTime) {
        self.set_detail("");
        *self.last_completed.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
        self.phase.store(Phase::Idle as u8, Ordering::Release);
    }

    pub(crate) fn set_detail(&self, detail: impl Into<String>) {
        *self.detail.write().unwrap_or_else(PoisonError::into_inner) = detail.into();
    }

    pub(crate) fn set_total(&self, total: u64) {
        self.files_total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn file_read(&self) -> u64 {
        self.files_read.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn files_added(&self, count: u64) -> u64 {
        self.files_added.fetch_add(count, Ordering::Relaxed) + count
    }

    pub(crate) fn set_removed(&self, count: u64) {
        self.files_removed.store(count, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`ScanStatus`].
///
/// Serializes to the status payload external callers poll:
/// `{"status", "detail", "last_complete", "current_time", ...counters}`, with
/// timestamps as Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    #[serde(rename = "status")]
    pub phase: Phase,
    pub detail: String,
    #[serde(rename = "last_complete", serialize_with = "unix_millis_opt")]
    pub last_completed: Option<UtcDateTime>,
    #[serde(serialize_with = "unix_millis")]
    pub current_time: UtcDateTime,
    #[serde(flatten)]
    pub counters: Counters,
}

fn millis(timestamp: &UtcDateTime) -> i64 {
    i64::try_from(timestamp.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn unix_millis<S: Serializer>(timestamp: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(millis(timestamp))
}

fn unix_millis_opt<S: Serializer>(timestamp: &Option<UtcDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match timestamp {
        Some(timestamp) => serializer.serialize_some(&millis(timestamp)),
        None => serializer.serialize_none(),
    }
}
