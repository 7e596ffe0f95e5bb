//! The persisted catalog of comic files.
//!
//! The catalog is not the source of truth: the files on disk are. It records
//! which archives the library monitor has already read, keyed by path and
//! modification time, so that a rescan only has to look at what changed. If
//! the database is deleted it is rebuilt by the next full scan.
//!
//! The monitor only talks to the [`Catalog`] and [`Session`] traits;
//! [`Database`] is the SQLite implementation.

mod catalog;
mod db;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod models;
mod repo;

pub use crate::catalog::{Catalog, Comic, ComicId, NewComic, Session, StoredComic};
pub use crate::db::Database;
#[cfg(feature = "mock")]
pub use crate::mock::{MockCall, MockCatalog};
pub use crate::repo::Repository;
