use crate::catalog::{Comic, ComicId, NewComic, StoredComic};
use crate::error::{Error, ErrorKind, Result};
use crate::models::facet::CreditProxy;
use exn::{OptionExt, ResultExt};
use facet_json::{from_str as from_json, to_string as to_json};
use longbox_archive::{Credit, Metadata, MetadataSource};
use std::path::{Path, PathBuf};
use time::UtcDateTime;

/// Microseconds since the Unix epoch; anything finer is dropped.
pub(crate) fn to_micros(timestamp: UtcDateTime) -> Result<i64> {
    i64::try_from(timestamp.unix_timestamp_nanos() / 1_000).or_raise(|| ErrorKind::InvalidData("timestamp"))
}

pub(crate) fn from_micros(micros: i64) -> Result<UtcDateTime> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000).or_raise(|| ErrorKind::InvalidData("timestamp"))
}

pub(crate) fn sqlx_hates_paths(path: &Path) -> Result<String> {
    Ok(path.to_str().ok_or_raise(|| ErrorKind::InvalidData("path"))?.to_string())
}

#[derive(sqlx::FromRow)]
pub(crate) struct PathRow {
    id: i64,
    path: String,
    modified_at: i64,
}
impl TryFrom<PathRow> for StoredComic {
    type Error = Error;
    fn try_from(row: PathRow) -> Result<Self> {
        Ok(Self {
            id: ComicId(row.id),
            path: PathBuf::from(row.path),
            modified: from_micros(row.modified_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ComicRow {
    pub(crate) id: i64,
    pub(crate) path: String,
    pub(crate) modified_at: i64,
    pub(crate) file_size: i64,
    pub(crate) page_count: i64,
    pub(crate) hash: String,
    pub(crate) thumbnail: Option<Vec<u8>>,
    pub(crate) metadata_source: String,
    pub(crate) series: Option<String>,
    pub(crate) issue: Option<String>,
    pub(crate) volume: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) publisher: Option<String>,
    pub(crate) year: Option<i64>,
    pub(crate) month: Option<i64>,
    pub(crate) summary: Option<String>,
    pub(crate) credits: String,
    pub(crate) genres: String,
    pub(crate) added_at: i64,
}
impl ComicRow {
    /// Builds the row for a comic about to be inserted, stamped as added now.
    pub(crate) fn new(comic: &NewComic) -> Result<Self> {
        let metadata = &comic.metadata;
        let credits = metadata.credits.iter().map(CreditProxy::from).collect::<Vec<_>>();
        Ok(Self {
            id: 0,
            path: sqlx_hates_paths(&comic.path)?,
            modified_at: to_micros(comic.modified)?,
            file_size: i64::try_from(comic.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            page_count: i64::try_from(comic.page_count).or_raise(|| ErrorKind::InvalidData("page count"))?,
            hash: comic.hash.clone(),
            thumbnail: comic.thumbnail.clone(),
            metadata_source: comic.source.as_short_str().to_string(),
            series: metadata.series.clone(),
            issue: metadata.issue.clone(),
            volume: metadata.volume.clone(),
            title: metadata.title.clone(),
            publisher: metadata.publisher.clone(),
            year: metadata.year.map(i64::from),
            month: metadata.month.map(i64::from),
            summary: metadata.summary.clone(),
            credits: to_json(&credits).or_raise(|| ErrorKind::InvalidData("credits"))?,
            genres: to_json(&metadata.genres).or_raise(|| ErrorKind::InvalidData("genres"))?,
            added_at: UtcDateTime::now().unix_timestamp(),
        })
    }
}
impl TryFrom<ComicRow> for Comic {
    type Error = Error;
    fn try_from(row: ComicRow) -> Result<Self> {
        Ok(Self {
            id: ComicId(row.id),
            path: PathBuf::from(row.path),
            page_count: usize::try_from(row.page_count).or_raise(|| ErrorKind::InvalidData("page count"))?,
            modified: from_micros(row.modified_at)?,
            file_size: u64::try_from(row.file_size).or_raise(|| ErrorKind::InvalidData("file size"))?,
            hash: row.hash,
            thumbnail: row.thumbnail,
            metadata: Metadata {
                series: row.series,
                issue: row.issue,
                volume: row.volume,
                title: row.title,
                publisher: row.publisher,
                year: row
                    .year
                    .map(|y| u16::try_from(y).or_raise(|| ErrorKind::InvalidData("year")))
                    .transpose()?,
                month: row
                    .month
                    .map(|m| u8::try_from(m).or_raise(|| ErrorKind::InvalidData("month")))
                    .transpose()?,
                summary: row.summary,
                credits: from_json::<Vec<CreditProxy>>(&row.credits)
                    .or_raise(|| ErrorKind::InvalidData("credits"))?
                    .into_iter()
                    .map(Credit::from)
                    .collect::<Vec<_>>(),
                genres: from_json::<Vec<String>>(&row.genres).or_raise(|| ErrorKind::InvalidData("genres"))?,
            },
            source: row
                .metadata_source
                .parse::<MetadataSource>()
                .or_raise(|| ErrorKind::InvalidData("metadata source"))?,
            added_at: UtcDateTime::from_unix_timestamp(row.added_at).or_raise(|| ErrorKind::InvalidData("added at"))?,
        })
    }
}
