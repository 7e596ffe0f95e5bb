mod comic;
mod facet;

pub(crate) use self::comic::{ComicRow, PathRow, sqlx_hates_paths};
