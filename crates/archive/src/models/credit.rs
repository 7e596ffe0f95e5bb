use std::fmt::{Display, Formatter, Result as FmtResult};

/// A person credited on an issue, along with what they did.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credit {
    pub person: String,
    /// Free-form role as written by the tagger (`Writer`, `Penciller`, ...).
    pub role: String,
}
impl Credit {
    pub fn new(person: impl Into<String>, role: impl Into<String>) -> Self {
        Self { person: person.into(), role: role.into() }
    }
}
impl Display for Credit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.person, self.role)
    }
}
