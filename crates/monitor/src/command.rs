use std::path::PathBuf;
use tokio::sync::mpsc;

/// Work items processed, in order, by the monitor's worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reconcile every watch root against the catalog.
    Scan,
    /// The set of paths that changed during the last quiet period. Only
    /// logged; the [`Scan`](Command::Scan) that follows does the work.
    Events(Vec<PathBuf>),
}

pub(crate) type CommandSender = mpsc::UnboundedSender<Command>;
pub(crate) type CommandReceiver = mpsc::UnboundedReceiver<Command>;

pub(crate) fn channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}
