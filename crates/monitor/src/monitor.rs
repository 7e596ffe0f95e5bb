//! The long-lived worker that owns the catalog session and runs every scan.

use crate::command::{self, Command, CommandReceiver, CommandSender};
use crate::debounce::Debouncer;
use crate::error::{ErrorKind, Result};
use crate::scan::{ScanEngine, ScanOutcome};
use crate::status::{ScanStatus, StatusSnapshot};
use crate::watcher::ChangeWatcher;
use exn::ResultExt;
use longbox_archive::{Classifier, THUMBNAIL_SIZE};
use longbox_catalog::Catalog;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// How long the library must be free of file events before a rescan.
    pub quiet_period: Duration,
    /// Number of comics committed to the catalog per insert.
    pub batch_size: usize,
    /// Longest the idle worker waits before checking the stop flag again.
    pub poll_timeout: Duration,
    pub thumbnail_size: (u32, u32),
    /// Stop the worker once a scan has completed. Used for one-off scans.
    pub exit_when_done: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_secs(30),
            batch_size: 10,
            poll_timeout: Duration::from_secs(1),
            thumbnail_size: THUMBNAIL_SIZE,
            exit_when_done: false,
        }
    }
}

/// Keeps a catalog in sync with a set of library folders.
///
/// Nothing is scanned until asked: call [`MonitorHandle::request_scan`] once
/// after starting for the initial reconciliation. After that, file changes
/// under the roots queue rescans on their own.
pub struct Monitor {
    roots: Vec<PathBuf>,
    catalog: Arc<dyn Catalog>,
    classifier: Arc<dyn Classifier>,
    options: MonitorOptions,
}

impl Monitor {
    pub fn new(roots: Vec<PathBuf>, catalog: Arc<dyn Catalog>, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            roots,
            catalog,
            classifier,
            options: MonitorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawn the worker onto the current Tokio runtime.
    ///
    /// Fails if any root is relative or if called outside a runtime. Roots that
    /// do not exist yet are accepted; they are neither watched nor scanned
    /// until the monitor is restarted.
    #[instrument(level = "debug", skip_all, fields(roots = self.roots.len()))]
    pub fn start(self) -> Result<MonitorHandle> {
        if let Some(relative) = self.roots.iter().find(|root| !root.is_absolute()) {
            exn::bail!(ErrorKind::InvalidRoot(relative.clone()));
        }
        let runtime = Handle::try_current().or_raise(|| ErrorKind::Runtime)?;
        let (sender, receiver) = command::channel();
        let status = Arc::new(ScanStatus::new());
        let stop = Arc::new(AtomicBool::new(false));
        let debouncer = Debouncer::new(self.options.quiet_period, sender.clone(), runtime.clone());
        let engine = ScanEngine::new(
            self.classifier,
            Arc::clone(&status),
            Arc::clone(&stop),
            self.options.batch_size,
            self.options.thumbnail_size,
        );
        let worker = Worker {
            roots: self.roots,
            catalog: self.catalog,
            engine,
            commands: receiver,
            debouncer,
            stop: Arc::clone(&stop),
            poll_timeout: self.options.poll_timeout,
            exit_when_done: self.options.exit_when_done,
        };
        let worker = runtime.spawn(worker.run());
        Ok(MonitorHandle {
            commands: sender,
            status,
            stop,
            worker: Some(worker),
        })
    }
}

struct Worker {
    roots: Vec<PathBuf>,
    catalog: Arc<dyn Catalog>,
    engine: ScanEngine,
    commands: CommandReceiver,
    debouncer: Debouncer,
    stop: Arc<AtomicBool>,
    poll_timeout: Duration,
    exit_when_done: bool,
}

impl Worker {
    async fn run(mut self) -> Result<()> {
        let mut session = self
            .catalog
            .session()
            .await
            .inspect_err(|err| error!(error = ?err, "unable to open catalog session, monitor stopping"))
            .or_raise(|| ErrorKind::Catalog)?;
        let watcher = ChangeWatcher::new(&self.roots, self.debouncer.clone())
            .inspect_err(|err| error!(error = ?err, "unable to watch library, monitor stopping"))?;
        info!(roots = self.roots.len(), watched = watcher.watched().len(), "monitor started");

        let result = loop {
            if self.stop.load(Ordering::Acquire) {
                break Ok(());
            }
            let command = match tokio::time::timeout(self.poll_timeout, self.commands.recv()).await {
                Ok(Some(command)) => command,
                // Every sender is gone; nothing can ask for work again.
                Ok(None) => break Ok(()),
                Err(_) => continue,
            };
            match command {
                Command::Scan => match self.engine.full_scan(&mut *session, &self.roots).await {
                    Ok(ScanOutcome::Completed(_)) if self.exit_when_done => {
                        info!("scan complete, exiting");
                        self.stop.store(true, Ordering::Release);
                    },
                    Ok(outcome) => debug!(?outcome, "scan finished"),
                    Err(err) if self.exit_when_done => break Err(err),
                    Err(err) => error!(retryable = err.is_retryable(), error = ?err, "scan failed"),
                },
                Command::Events(paths) => {
                    info!(changed = paths.len(), "library changed");
                    for path in &paths {
                        debug!(path = %path.display(), "changed");
                    }
                },
            }
        };
        self.debouncer.cancel();
        drop(watcher);
        info!("monitor stopped");
        result
    }
}

/// Control and status of a running [`Monitor`].
///
/// Dropping the handle asks the worker to stop without waiting for it.
#[derive(Debug)]
pub struct MonitorHandle {
    commands: CommandSender,
    status: Arc<ScanStatus>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl MonitorHandle {
    /// Queue a full scan. Never blocks; scans already queued behind another
    /// simply find nothing left to do.
    pub fn request_scan(&self) {
        if self.commands.send(Command::Scan).is_err() {
            debug!("monitor has exited, dropping scan request");
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// The live status, for readers that outlive this handle.
    pub fn status_handle(&self) -> Arc<ScanStatus> {
        Arc::clone(&self.status)
    }

    /// Whether the worker has exited, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Ask the worker to stop and wait for it. A scan in progress halts
    /// before its next file.
    pub async fn stop(mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        self.join().await
    }

    /// Wait for the worker to exit by itself.
    pub async fn wait(mut self) -> Result<()> {
        self.join().await
    }

    async fn join(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => worker.await.or_raise(|| ErrorKind::Worker)?,
            None => Ok(()),
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}
