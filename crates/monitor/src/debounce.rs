//! Coalesces bursts of filesystem events into a single deferred rescan.

use crate::command::{Command, CommandSender};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Restarts a single timer on every event; only when the timer runs out is a
/// rescan queued.
///
/// If events keep arriving faster than the quiet period, the rescan is put off
/// for as long as they do.
///
/// Events usually come from a thread that belongs to no runtime, so timers are
/// spawned onto the runtime handle captured at construction. Clones share the
/// same timer slot.
#[derive(Debug, Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    quiet_period: Duration,
    commands: CommandSender,
    runtime: Handle,
    slot: Mutex<Slot>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u64,
    pending: Option<PendingTimer>,
}

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
    /// Every path seen since the last time a timer fired.
    paths: BTreeSet<PathBuf>,
}

impl Debouncer {
    pub(crate) fn new(quiet_period: Duration, commands: CommandSender, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                quiet_period,
                commands,
                runtime,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Record a change to `path`, (re)starting the quiet period.
    pub fn on_file_event(&self, path: PathBuf) {
        trace!(path = %path.display(), "filesystem event");
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut paths = match slot.pending.take() {
            Some(pending) => {
                pending.handle.abort();
                pending.paths
            },
            None => BTreeSet::new(),
        };
        paths.insert(path);
        slot.generation += 1;
        let generation = slot.generation;
        // The timer must not keep the debouncer alive on its own.
        let weak = Arc::downgrade(&self.inner);
        let quiet_period = self.inner.quiet_period;
        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(quiet_period).await;
            if let Some(inner) = Weak::upgrade(&weak) {
                inner.fire(generation);
            }
        });
        slot.pending = Some(PendingTimer { generation, handle, paths });
    }

    /// Drop any pending timer without queueing a rescan.
    pub fn cancel(&self) {
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.pending.take() {
            pending.handle.abort();
            debug!(paths = pending.paths.len(), "cancelled pending rescan");
        }
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner).pending.is_some()
    }
}

impl Inner {
    fn fire(&self, generation: u64) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        // A newer event may have replaced this timer after it woke up but
        // before it got the lock; that newer timer owns the slot now.
        let Some(pending) = slot.pending.take_if(|pending| pending.generation == generation) else {
            return;
        };
        drop(slot);
        let paths: Vec<PathBuf> = pending.paths.into_iter().collect();
        debug!(paths = paths.len(), "quiet period elapsed, queueing rescan");
        // A closed channel means the worker has already shut down.
        if self.commands.send(Command::Events(paths)).is_ok() {
            _ = self.commands.send(Command::Scan);
        }
    }
}
