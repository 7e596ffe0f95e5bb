mod engine;
mod pipeline;
mod reconcile;
mod walk;

pub(crate) use self::engine::ScanEngine;
pub use self::engine::ScanOutcome;
