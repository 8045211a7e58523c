//! Split selected text into package names.

use serde::Serialize;
use std::fmt;

/// Characters that separate package names in a query.
pub const SEPARATORS: [char; 9] = [' ', '\n', '+', '(', ')', '*', '/', ':', '?'];

/// A non-empty token taken from a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// `None` for an empty string.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (!name.is_empty()).then_some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split `query` on [`SEPARATORS`], dropping empty tokens.
///
/// Order is preserved and duplicates are kept.
pub fn tokenize(query: &str) -> Vec<PackageName> {
    query.split(SEPARATORS).filter_map(PackageName::new).collect()
}
