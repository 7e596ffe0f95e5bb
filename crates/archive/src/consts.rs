use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> = LazyLock::new(|| Selector::parse($css).unwrap());
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// File extensions (lowercase) that are treated as comic archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["cbz", "zip"];
/// File extensions (lowercase) of archive entries that count as pages.
pub const PAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];
/// Archive entry holding ComicInfo tags; only honoured at the archive root.
pub const COMIC_INFO_ENTRY: &str = "ComicInfo.xml";
/// Key of the ComicBookInfo object inside the archive comment.
pub const COMIC_BOOK_INFO_KEY: &str = "ComicBookInfo/1.0";
/// Default bounding box for generated thumbnails.
pub const THUMBNAIL_SIZE: (u32, u32) = (200, 200);

// html5ever lowercases every element name, ComicInfo's PascalCase included.
selector!(COMIC_INFO_SELECTOR, "comicinfo");
selector!(SERIES_SELECTOR, "comicinfo > series");
selector!(NUMBER_SELECTOR, "comicinfo > number");
selector!(VOLUME_SELECTOR, "comicinfo > volume");
selector!(TITLE_SELECTOR, "comicinfo > title");
selector!(PUBLISHER_SELECTOR, "comicinfo > publisher");
selector!(YEAR_SELECTOR, "comicinfo > year");
selector!(MONTH_SELECTOR, "comicinfo > month");
selector!(SUMMARY_SELECTOR, "comicinfo > summary");
selector!(GENRE_SELECTOR, "comicinfo > genre");
selector!(WRITER_SELECTOR, "comicinfo > writer");
selector!(PENCILLER_SELECTOR, "comicinfo > penciller");
selector!(INKER_SELECTOR, "comicinfo > inker");
selector!(COLORIST_SELECTOR, "comicinfo > colorist");
selector!(LETTERER_SELECTOR, "comicinfo > letterer");
selector!(COVER_ARTIST_SELECTOR, "comicinfo > coverartist");
selector!(EDITOR_SELECTOR, "comicinfo > editor");

regex!(YEAR_REGEX, r"\(((?:18|19|20)\d{2})\)");
regex!(BRACKETED_REGEX, r"\([^)]*\)|\[[^\]]*\]|\{[^}]*\}");
regex!(VOLUME_REGEX, r"(?i)\b(?:v|vol\.?|volume)\s*(\d+)\b");
regex!(ISSUE_COUNT_REGEX, r"(?i)\s+of\s+\d+\b");
regex!(ISSUE_TOKEN_REGEX, r"(?i)^(?:-?\d+(?:\.\d+)?[a-z]?|½)$");
