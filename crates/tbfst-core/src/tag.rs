// Marker identifiers and tier lines

use std::fmt;
use std::sync::Arc;

use crate::ConfigError;

/// A Toolbox marker such as `\tx` or `\ge`.
///
/// Stored without the leading backslash and displayed with it. The name is
/// reference counted because tags are cloned into every record, token and
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Parse a marker, with or without its leading backslash.
    ///
    /// Empty markers and markers containing whitespace are rejected. Unusual
    /// but otherwise valid markers (e.g. `\tx*`) are accepted; see
    /// [`Tag::is_well_formed`].
    pub fn new(marker: &str) -> Result<Self, ConfigError> {
        let name = marker.strip_prefix('\\').unwrap_or(marker);
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidTag(marker.to_string()));
        }
        Ok(Self(Arc::from(name)))
    }

    /// The marker name without the backslash.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether the marker only uses ASCII letters, digits and underscores,
    /// which is what Toolbox itself produces.
    pub fn is_well_formed(&self) -> bool {
        self.0
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\{}", self.0)
    }
}

impl std::str::FromStr for Tag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// One tier of a record: its marker plus the full, unwrapped text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierLine {
    pub tag: Tag,
    pub text: String,
}

impl TierLine {
    pub fn new(tag: Tag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslash_is_optional() {
        let a = Tag::new("tx").unwrap();
        let b = Tag::new("\\tx").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name(), "tx");
        assert_eq!(a.to_string(), "\\tx");
    }

    #[test]
    fn reject_empty_and_whitespace() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("\\").is_err());
        assert!(Tag::new("t x").is_err());
    }

    #[test]
    fn well_formedness() {
        assert!(Tag::new("ge2").unwrap().is_well_formed());
        assert!(Tag::new("_sh").unwrap().is_well_formed());
        assert!(!Tag::new("tx*").unwrap().is_well_formed());
    }

    #[test]
    fn parse_via_from_str() {
        let tag: Tag = "\\mb".parse().unwrap();
        assert_eq!(tag.name(), "mb");
    }

    #[test]
    fn tier_line_new() {
        let line = TierLine::new(Tag::new("tx").unwrap(), "baixou a bola");
        assert_eq!(line.tag.name(), "tx");
        assert_eq!(line.text, "baixou a bola");
    }
}
