use super::Credit;

/// Descriptive metadata for a single comic issue.
///
/// Every field is optional: embedded tags are frequently incomplete, and
/// filename inference can only ever recover a handful of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Series name
    pub series: Option<String>,
    /// Issue number, kept as text (`"1"`, `"12.5"`, `"½"`, `"Annual 2"`)
    pub issue: Option<String>,
    /// Volume, usually a number or the year the volume started
    pub volume: Option<String>,
    /// Story title
    pub title: Option<String>,
    pub publisher: Option<String>,
    /// Cover year
    pub year: Option<u16>,
    /// Cover month (1-12)
    pub month: Option<u8>,
    pub summary: Option<String>,
    pub credits: Vec<Credit>,
    pub genres: Vec<String>,
}
impl Metadata {
    /// Returns `true` if nothing at all is known about the issue.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
