//! Parsers turning archive contents (or just a file name) into [`Metadata`].
//!
//! [`Metadata`]: crate::models::Metadata

mod comic_book_info;
mod comic_info;
mod filename;

pub use self::comic_book_info::{has_comic_book_info, parse_comic_book_info};
pub use self::comic_info::parse_comic_info;
pub use self::filename::metadata_from_filename;

/// Splits a comma-separated tag value into trimmed, non-empty, de-duplicated entries.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    value
        .split([',', ';'])
        .filter_map(crate::models::non_empty)
        .filter(|v| seen.insert(v.to_lowercase()))
        .collect()
}
