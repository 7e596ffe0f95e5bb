//! ComicBookInfo parsing.
//!
//! ComicBookInfo lives in the archive comment as a JSON envelope:
//! `{"appID": "...", "lastModified": "...", "ComicBookInfo/1.0": {...}}`.

use super::split_list;
use crate::consts::COMIC_BOOK_INFO_KEY;
use crate::error::{ErrorKind, Result};
use crate::models::{Credit, Metadata, non_empty};
use exn::{OptionExt, ResultExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ComicBookInfo {
    series: Option<String>,
    title: Option<String>,
    publisher: Option<String>,
    // Taggers disagree on whether these are numbers or strings.
    issue: Option<Value>,
    volume: Option<Value>,
    publication_year: Option<Value>,
    publication_month: Option<Value>,
    comments: Option<String>,
    genre: Option<String>,
    credits: Vec<CbiCredit>,
}

#[derive(Deserialize)]
struct CbiCredit {
    person: String,
    role: String,
}

fn envelope(comment: &[u8]) -> Option<HashMap<String, Value>> {
    serde_json::from_slice::<HashMap<String, Value>>(comment).ok()
}

fn scalar_to_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Returns `true` if the archive comment carries a ComicBookInfo object.
pub fn has_comic_book_info(comment: &[u8]) -> bool {
    envelope(comment).is_some_and(|map| map.get(COMIC_BOOK_INFO_KEY).is_some_and(Value::is_object))
}

/// Parses an archive comment holding a ComicBookInfo envelope.
pub fn parse_comic_book_info(comment: &[u8]) -> Result<Metadata> {
    let mut map = envelope(comment).ok_or_raise(|| ErrorKind::ParseError {
        field: "ComicBookInfo",
        value: "archive comment is not a JSON object".to_string(),
    })?;
    let info = map.remove(COMIC_BOOK_INFO_KEY).ok_or_raise(|| ErrorKind::ParseError {
        field: "ComicBookInfo",
        value: format!("missing `{COMIC_BOOK_INFO_KEY}` key"),
    })?;
    let info: ComicBookInfo = serde_json::from_value(info).or_raise(|| ErrorKind::ParseError {
        field: "ComicBookInfo",
        value: "unexpected object layout".to_string(),
    })?;
    Ok(Metadata {
        series: info.series.and_then(non_empty),
        issue: scalar_to_string(info.issue),
        volume: scalar_to_string(info.volume),
        title: info.title.and_then(non_empty),
        publisher: info.publisher.and_then(non_empty),
        year: scalar_to_string(info.publication_year).and_then(|y| y.parse().ok()).filter(|y| *y > 0),
        month: scalar_to_string(info.publication_month)
            .and_then(|m| m.parse().ok())
            .filter(|m| (1..=12).contains(m)),
        summary: info.comments.and_then(non_empty),
        credits: info
            .credits
            .into_iter()
            .filter_map(|c| Some(Credit::new(non_empty(c.person)?, c.role.trim())))
            .collect(),
        genres: info.genre.map(|g| split_list(&g)).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = r#"{
        "appID": "ComicTagger/1.0.0",
        "lastModified": "2012-08-13 20:24:48.405735",
        "ComicBookInfo/1.0": {
            "series": "Hellboy",
            "title": "Seed of Destruction",
            "publisher": "Dark Horse",
            "publicationMonth": 3,
            "publicationYear": 1994,
            "issue": 1,
            "numberOfIssues": 4,
            "volume": "1",
            "genre": "Horror",
            "credits": [
                {"person": "Mike Mignola", "role": "Writer", "primary": true},
                {"person": "John Byrne", "role": "Writer"}
            ],
            "tags": ["demons"]
        }
    }"#;

    #[test]
    fn test_parse_envelope() {
        let metadata = parse_comic_book_info(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.series.as_deref(), Some("Hellboy"));
        assert_eq!(metadata.issue.as_deref(), Some("1"));
        assert_eq!(metadata.volume.as_deref(), Some("1"));
        assert_eq!(metadata.year, Some(1994));
        assert_eq!(metadata.month, Some(3));
        assert_eq!(metadata.genres, vec!["Horror".to_string()]);
        assert_eq!(metadata.credits.len(), 2);
        assert_eq!(metadata.credits[0], Credit::new("Mike Mignola", "Writer"));
    }

    #[rstest]
    #[case(SAMPLE, true)]
    #[case(r#"{"appID": "x"}"#, false)]
    #[case(r#"{"ComicBookInfo/1.0": "not an object"}"#, false)]
    #[case("", false)]
    #[case("scanned by someone", false)]
    fn test_has_comic_book_info(#[case] comment: &str, #[case] expected: bool) {
        assert_eq!(has_comic_book_info(comment.as_bytes()), expected);
    }

    #[test]
    fn test_plain_comment_is_an_error() {
        let err = parse_comic_book_info(b"scanned by someone").unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "ComicBookInfo", .. }));
    }
}
