use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::sanitize;
use crate::error::{Error, ErrorKind};

/// Embedded tagging schemes, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataStyle {
    /// `ComicInfo.xml` entry inside the archive (CIX).
    ComicInfo,
    /// JSON blob in the archive comment (CBI).
    ComicBookInfo,
}
impl MetadataStyle {
    /// All styles, most preferred first.
    pub const PREFERENCE: [MetadataStyle; 2] = [MetadataStyle::ComicInfo, MetadataStyle::ComicBookInfo];

    pub fn as_short_str(&self) -> &'static str {
        match self {
            MetadataStyle::ComicInfo => "cix",
            MetadataStyle::ComicBookInfo => "cbi",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataStyle::ComicInfo => "ComicInfo",
            MetadataStyle::ComicBookInfo => "ComicBookInfo",
        }
    }
}
impl Display for MetadataStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Where the metadata for a catalogued comic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataSource {
    Embedded(MetadataStyle),
    /// Guessed from the file name because the archive carried no tags.
    Filename,
}
impl MetadataSource {
    pub fn as_short_str(&self) -> &'static str {
        match self {
            MetadataSource::Embedded(style) => style.as_short_str(),
            MetadataSource::Filename => "filename",
        }
    }
}
impl FromStr for MetadataSource {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match sanitize(s).as_str() {
            "cix" | "comicinfo" | "comicinfoxml" => Self::Embedded(MetadataStyle::ComicInfo),
            "cbi" | "comicbookinfo" => Self::Embedded(MetadataStyle::ComicBookInfo),
            "filename" => Self::Filename,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "metadata source",
                value: format!("unknown metadata source: {}", s)
            }),
        })
    }
}
impl Display for MetadataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataSource::Embedded(style) => write!(f, "{style}"),
            MetadataSource::Filename => write!(f, "filename"),
        }
    }
}
