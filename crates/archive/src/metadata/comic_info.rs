//! ComicInfo (`ComicInfo.xml`) parsing.
//!
//! The document is tiny and flat, so it goes through the same HTML parser
//! used everywhere else instead of pulling in a dedicated XML stack. Element
//! names come out lowercased, which also makes matching case-insensitive.

use super::split_list;
use crate::consts;
use crate::error::{ErrorKind, Result};
use crate::models::{Credit, Metadata, non_empty};
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

fn credit_roles() -> [(&'static Selector, &'static str); 7] {
    [
        (&*consts::WRITER_SELECTOR, "Writer"),
        (&*consts::PENCILLER_SELECTOR, "Penciller"),
        (&*consts::INKER_SELECTOR, "Inker"),
        (&*consts::COLORIST_SELECTOR, "Colorist"),
        (&*consts::LETTERER_SELECTOR, "Letterer"),
        (&*consts::COVER_ARTIST_SELECTOR, "Cover Artist"),
        (&*consts::EDITOR_SELECTOR, "Editor"),
    ]
}

/// Parses the raw bytes of a `ComicInfo.xml` entry.
///
/// Unknown elements are ignored and malformed numbers are dropped rather than
/// rejected; only a document without a `<ComicInfo>` root is an error.
#[instrument(skip(xml), fields(xml_size = xml.len()))]
pub fn parse_comic_info(xml: &[u8]) -> Result<Metadata> {
    let text = String::from_utf8_lossy(xml);
    let document = Html::parse_document(&text);
    let Some(root) = document.select(&consts::COMIC_INFO_SELECTOR).next() else {
        exn::bail!(ErrorKind::ParseError {
            field: "ComicInfo",
            value: "missing <ComicInfo> root element".to_string(),
        });
    };
    let credits = credit_roles()
        .into_iter()
        .flat_map(|(selector, role)| {
            text_of(root, selector)
                .map(|people| split_list(&people))
                .unwrap_or_default()
                .into_iter()
                .map(move |person| Credit::new(person, role))
        })
        .collect();
    Ok(Metadata {
        series: text_of(root, &consts::SERIES_SELECTOR),
        issue: text_of(root, &consts::NUMBER_SELECTOR),
        volume: text_of(root, &consts::VOLUME_SELECTOR),
        title: text_of(root, &consts::TITLE_SELECTOR),
        publisher: text_of(root, &consts::PUBLISHER_SELECTOR),
        // ComicInfo writes `-1` for "unknown", treat it (and junk) as absent.
        year: text_of(root, &consts::YEAR_SELECTOR).and_then(|y| y.parse().ok()).filter(|y| *y > 0),
        month: text_of(root, &consts::MONTH_SELECTOR)
            .and_then(|m| m.parse().ok())
            .filter(|m| (1..=12).contains(m)),
        summary: text_of(root, &consts::SUMMARY_SELECTOR),
        credits,
        genres: text_of(root, &consts::GENRE_SELECTOR).map(|g| split_list(&g)).unwrap_or_default(),
    })
}

fn text_of(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().and_then(|el| non_empty(el.text().collect::<String>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ComicInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Title>The Long Way Home</Title>
  <Series>Buffy the Vampire Slayer Season Eight</Series>
  <Number>1</Number>
  <Volume>2007</Volume>
  <Summary>Buffy &amp; the gang are back.</Summary>
  <Year>2007</Year>
  <Month>3</Month>
  <Writer>Joss Whedon</Writer>
  <Penciller>Georges Jeanty</Penciller>
  <CoverArtist>Jo Chen, Georges Jeanty</CoverArtist>
  <Publisher>Dark Horse Comics</Publisher>
  <Genre>Horror, Fantasy</Genre>
  <Pages>
    <Page Image="0" Type="FrontCover" />
    <Page Image="1" />
  </Pages>
</ComicInfo>"#;

    #[test]
    fn test_parse_full_document() {
        let metadata = parse_comic_info(SAMPLE.as_bytes()).unwrap();
        assert_eq!(metadata.series.as_deref(), Some("Buffy the Vampire Slayer Season Eight"));
        assert_eq!(metadata.issue.as_deref(), Some("1"));
        assert_eq!(metadata.volume.as_deref(), Some("2007"));
        assert_eq!(metadata.title.as_deref(), Some("The Long Way Home"));
        assert_eq!(metadata.publisher.as_deref(), Some("Dark Horse Comics"));
        assert_eq!(metadata.year, Some(2007));
        assert_eq!(metadata.month, Some(3));
        assert_eq!(metadata.summary.as_deref(), Some("Buffy & the gang are back."));
        assert_eq!(metadata.genres, vec!["Horror".to_string(), "Fantasy".to_string()]);
        assert!(metadata.credits.contains(&Credit::new("Joss Whedon", "Writer")));
        assert!(metadata.credits.contains(&Credit::new("Jo Chen", "Cover Artist")));
        assert!(metadata.credits.contains(&Credit::new("Georges Jeanty", "Cover Artist")));
        assert_eq!(metadata.credits.len(), 4);
    }

    #[test]
    fn test_unknown_year_is_dropped() {
        let xml = "<ComicInfo><Series>Saga</Series><Year>-1</Year><Month>13</Month></ComicInfo>";
        let metadata = parse_comic_info(xml.as_bytes()).unwrap();
        assert_eq!(metadata.series.as_deref(), Some("Saga"));
        assert_eq!(metadata.year, None);
        assert_eq!(metadata.month, None);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let err = parse_comic_info(b"<NotComicInfo><Series>x</Series></NotComicInfo>").unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "ComicInfo", .. }));
    }
}
