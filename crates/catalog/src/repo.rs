//! SQLite implementation of a catalog [`Session`].

use crate::catalog::{Comic, ComicId, NewComic, Session, StoredComic};
use crate::error::{ErrorKind, Result};
use crate::models::{ComicRow, PathRow, sqlx_hates_paths};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite};
use std::path::Path;
use tracing::{debug, instrument};

/// A catalog session pinned to one pooled connection.
///
/// The connection goes back to the pool when the repository is dropped.
#[derive(Debug)]
pub struct Repository {
    conn: PoolConnection<Sqlite>,
}

impl Repository {
    pub fn new(conn: PoolConnection<Sqlite>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Session for Repository {
    async fn query_all_paths(&mut self) -> Result<Vec<StoredComic>> {
        let rows: Vec<PathRow> = sqlx::query_as(include_str!("../queries/list_all_paths.sql"))
            .fetch_all(&mut *self.conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(StoredComic::try_from).collect()
    }

    #[instrument(level = "debug", skip_all, fields(count = ids.len()))]
    async fn bulk_delete(&mut self, ids: &[ComicId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut deleted = 0;
        let mut tx = self.conn.begin().await.or_raise(|| ErrorKind::Database)?;
        for id in ids {
            let result = sqlx::query(include_str!("../queries/delete_comic.sql"))
                .bind(id.0)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            deleted += result.rows_affected();
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        debug!(deleted, "deleted comics from catalog");
        Ok(deleted)
    }

    #[instrument(level = "debug", skip_all, fields(count = comics.len()))]
    async fn bulk_insert(&mut self, comics: &[NewComic]) -> Result<Vec<ComicId>> {
        if comics.is_empty() {
            return Ok(Vec::new());
        }
        // Convert everything up front so a bad value never leaves a
        // half-written transaction behind.
        let rows = comics.iter().map(ComicRow::new).collect::<Result<Vec<_>>>()?;
        let mut ids = Vec::with_capacity(rows.len());
        let mut tx = self.conn.begin().await.or_raise(|| ErrorKind::Database)?;
        for row in rows {
            let id: i64 = sqlx::query_scalar(include_str!("../queries/insert_comic.sql"))
                .bind(row.path)
                .bind(row.modified_at)
                .bind(row.file_size)
                .bind(row.page_count)
                .bind(row.hash)
                .bind(row.thumbnail)
                .bind(row.metadata_source)
                .bind(row.series)
                .bind(row.issue)
                .bind(row.volume)
                .bind(row.title)
                .bind(row.publisher)
                .bind(row.year)
                .bind(row.month)
                .bind(row.summary)
                .bind(row.credits)
                .bind(row.genres)
                .bind(row.added_at)
                .fetch_one(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
            ids.push(ComicId(id));
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        debug!(inserted = ids.len(), "inserted comics into catalog");
        Ok(ids)
    }

    async fn count(&mut self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_comics.sql"))
            .fetch_one(&mut *self.conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("count"))
    }

    async fn get_by_path(&mut self, path: &Path) -> Result<Option<Comic>> {
        let row: Option<ComicRow> = sqlx::query_as(include_str!("../queries/get_by_path.sql"))
            .bind(sqlx_hates_paths(path)?)
            .fetch_optional(&mut *self.conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(Comic::try_from).transpose()
    }
}
