//! Keeps a comic catalog in sync with the folders the comics live in.
//!
//! A [`Monitor`] owns a single worker task. The worker holds the only catalog
//! session and runs every scan, one at a time, in the order they were asked
//! for. Scans are requested explicitly through a [`MonitorHandle`] or queued
//! by the filesystem watcher once the library has been quiet for a while.

mod command;
mod debounce;
pub mod error;
mod monitor;
mod scan;
mod status;
mod watcher;

pub use crate::command::Command;
pub use crate::monitor::{Monitor, MonitorHandle, MonitorOptions};
pub use crate::scan::ScanOutcome;
pub use crate::status::{Counters, Phase, ScanStatus, StatusSnapshot};
