mod credit;
mod metadata;
mod style;

pub use self::credit::Credit;
pub use self::metadata::Metadata;
pub use self::style::{MetadataSource, MetadataStyle};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace(['-', '_', ' ', '/', '.'], "")
}

/// Trims a string, mapping empty results to `None`.
pub(crate) fn non_empty(s: impl AsRef<str>) -> Option<String> {
    let s = s.as_ref().trim();
    (!s.is_empty()).then(|| s.to_string())
}
