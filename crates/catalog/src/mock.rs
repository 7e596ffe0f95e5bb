//! In-memory catalog for testing.

use crate::catalog::{Catalog, Comic, ComicId, NewComic, Session, StoredComic};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::UtcDateTime;
use tokio::sync::Mutex;

/// A bulk call made against a [`MockCatalog`] session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    QueryAllPaths,
    /// Ids passed to `bulk_delete`.
    Delete(Vec<ComicId>),
    /// Paths passed to `bulk_insert`, in order.
    Insert(Vec<PathBuf>),
}

#[derive(Debug, Default)]
struct State {
    comics: BTreeMap<ComicId, NewComic>,
    next_id: i64,
    calls: Vec<MockCall>,
    sessions: usize,
    fail_sessions: bool,
    fail_inserts: bool,
}

/// In-memory [`Catalog`] that records every call made through its sessions.
///
/// Clones share state, so a test can hand one clone to the code under test
/// and inspect the other afterwards.
///
/// # Examples
///
/// ```
/// use longbox_catalog::{Catalog, MockCatalog};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let catalog = MockCatalog::default();
/// let mut session = catalog.session().await.unwrap();
/// assert!(session.query_all_paths().await.unwrap().is_empty());
/// assert_eq!(catalog.sessions_opened().await, 1);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    state: Arc<Mutex<State>>,
}

impl MockCatalog {
    /// Create a mock catalog pre-populated with comics. Their ids start at 1.
    pub fn with_comics(comics: impl IntoIterator<Item = NewComic>) -> Self {
        let mut state = State::default();
        for comic in comics {
            state.next_id += 1;
            state.comics.insert(ComicId(state.next_id), comic);
        }
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Make every subsequent `session()` call fail.
    pub async fn fail_sessions(&self, fail: bool) {
        self.state.lock().await.fail_sessions = fail;
    }

    /// Make every subsequent `bulk_insert()` call fail without writing anything.
    pub async fn fail_inserts(&self, fail: bool) {
        self.state.lock().await.fail_inserts = fail;
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Number of comics passed to each `bulk_insert` call, in call order.
    pub async fn insert_batches(&self) -> Vec<usize> {
        self.calls()
            .await
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Insert(paths) => Some(paths.len()),
                _ => None,
            })
            .collect()
    }

    /// Total number of ids passed to `bulk_delete`.
    pub async fn deleted_count(&self) -> usize {
        self.calls()
            .await
            .into_iter()
            .map(|call| match call {
                MockCall::Delete(ids) => ids.len(),
                _ => 0,
            })
            .sum()
    }

    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.state.lock().await.comics.values().map(|c| c.path.clone()).collect();
        paths.sort();
        paths
    }

    pub async fn comic(&self, path: impl AsRef<Path>) -> Option<NewComic> {
        let path = path.as_ref();
        self.state.lock().await.comics.values().find(|c| c.path == path).cloned()
    }

    pub async fn sessions_opened(&self) -> usize {
        self.state.lock().await.sessions
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn session(&self) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock().await;
        if state.fail_sessions {
            exn::bail!(ErrorKind::Database);
        }
        state.sessions += 1;
        Ok(Box::new(MockSession { state: Arc::clone(&self.state) }))
    }
}

struct MockSession {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl Session for MockSession {
    async fn query_all_paths(&mut self) -> Result<Vec<StoredComic>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::QueryAllPaths);
        Ok(state
            .comics
            .iter()
            .map(|(id, comic)| StoredComic {
                id: *id,
                path: comic.path.clone(),
                modified: comic.modified,
            })
            .collect())
    }

    async fn bulk_delete(&mut self, ids: &[ComicId]) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Delete(ids.to_vec()));
        Ok(ids.iter().filter(|id| state.comics.remove(*id).is_some()).count() as u64)
    }

    async fn bulk_insert(&mut self, comics: &[NewComic]) -> Result<Vec<ComicId>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::Insert(comics.iter().map(|c| c.path.clone()).collect()));
        if state.fail_inserts {
            exn::bail!(ErrorKind::Database);
        }
        let mut ids = Vec::with_capacity(comics.len());
        for comic in comics {
            state.comics.retain(|_, existing| existing.path != comic.path);
            state.next_id += 1;
            let id = ComicId(state.next_id);
            state.comics.insert(id, comic.clone());
            ids.push(id);
        }
        Ok(ids)
    }

    async fn count(&mut self) -> Result<u64> {
        Ok(self.state.lock().await.comics.len() as u64)
    }

    async fn get_by_path(&mut self, path: &Path) -> Result<Option<Comic>> {
        let state = self.state.lock().await;
        Ok(state.comics.iter().find(|(_, c)| c.path == path).map(|(id, c)| Comic {
            id: *id,
            path: c.path.clone(),
            page_count: c.page_count,
            modified: c.modified,
            file_size: c.file_size,
            hash: c.hash.clone(),
            thumbnail: c.thumbnail.clone(),
            metadata: c.metadata.clone(),
            source: c.source,
            added_at: UtcDateTime::now(),
        }))
    }
}
