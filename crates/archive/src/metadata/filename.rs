//! Best-effort metadata inference from a file name alone.
//!
//! Handles the common scene naming conventions:
//! `Series Name 001 (2011) (digital) [Group].cbz`, `Series #12.cbz`,
//! `Series_v2_007.cbz`, `Series 03 of 12 (1999).cbz`.

use crate::consts;
use crate::models::{Metadata, non_empty};
use std::path::Path;

/// Guesses series, issue, volume and year from `path`'s file name.
///
/// Never fails: anything that can't be recognised is left empty, and a name
/// with no recognisable issue number becomes the series name as a whole.
pub fn metadata_from_filename(path: impl AsRef<Path>) -> Metadata {
    let stem = path.as_ref().file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    // Only treat underscores as separators when there are no real spaces.
    let name = if stem.contains(' ') { stem } else { stem.replace('_', " ") };

    let year = consts::YEAR_REGEX.captures(&name).and_then(|c| c.get(1)).and_then(|y| y.as_str().parse().ok());
    let name = consts::BRACKETED_REGEX.replace_all(&name, " ");
    let volume = consts::VOLUME_REGEX
        .captures(&name)
        .and_then(|c| c.get(1))
        .map(|v| normalize_number(v.as_str()));
    let name = consts::VOLUME_REGEX.replace_all(&name, " ");
    let name = consts::ISSUE_COUNT_REGEX.replace_all(&name, " ");

    let tokens: Vec<&str> = name.split_whitespace().collect();
    let (series_tokens, issue) = split_issue(&tokens);
    let series = non_empty(series_tokens.join(" ").trim_end_matches(['-', ',', ':', ' ']));

    Metadata {
        series,
        issue,
        volume,
        year,
        ..Metadata::default()
    }
}

/// Splits tokens into the series part and the issue number.
///
/// An explicit `#` marker wins; otherwise the last numeric token is the issue,
/// as long as something precedes it (a bare `300.cbz` is a series name).
fn split_issue<'a>(tokens: &'a [&'a str]) -> (&'a [&'a str], Option<String>) {
    if let Some(position) = tokens.iter().position(|t| t.starts_with('#')) {
        let marker = tokens[position].trim_start_matches('#');
        let issue = match marker.is_empty() {
            true => tokens.get(position + 1).copied(),
            false => Some(marker),
        };
        return (&tokens[..position], issue.and_then(non_empty).map(|i| normalize_number(&i)));
    }
    match tokens.iter().rposition(|t| consts::ISSUE_TOKEN_REGEX.is_match(t)) {
        Some(position) if position > 0 => (&tokens[..position], Some(normalize_number(tokens[position]))),
        _ => (tokens, None),
    }
}

/// Strips zero-padding (`007` → `7`) while keeping `0` and `0.5` intact.
fn normalize_number(raw: &str) -> String {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw),
    };
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() || trimmed.starts_with('.') || !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        // Put back a single zero when everything before the decimal point (or
        // a suffix letter) was zero-padding.
        let zero = if digits.starts_with('0') { "0" } else { "" };
        return format!("{sign}{zero}{trimmed}");
    }
    format!("{sign}{trimmed}")
}
