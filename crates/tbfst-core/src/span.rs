// Column spans and aligned tokens

use std::fmt;

/// Character extent of a token within a padded tier line.
///
/// Offsets count characters, not bytes, so multi-byte letters occupy one
/// column like they do in Toolbox. The range is half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
}

impl ColumnSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for ColumnSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A whitespace-delimited token together with its column span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubToken {
    pub text: String,
    pub span: ColumnSpan,
}

/// A token of the tier aligned against, with the tokens of the dependent
/// tier that fall into its column region.
///
/// Unaligned tiers (free translations and the like) produce a single
/// `AlignedToken` whose `token` is `None` and whose only sub-token is the
/// whole line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedToken {
    pub token: Option<String>,
    pub span: Option<ColumnSpan>,
    pub sub_tokens: Vec<SubToken>,
}

impl AlignedToken {
    /// Texts of the sub-tokens, in column order.
    pub fn sub_texts(&self) -> impl Iterator<Item = &str> {
        self.sub_tokens.iter().map(|s| s.text.as_str())
    }

    /// Sub-token texts joined by `separator`.
    pub fn joined(&self, separator: &str) -> String {
        self.sub_texts().collect::<Vec<_>>().join(separator)
    }
}

/// Split a line on maximal whitespace runs.
///
/// Each token keeps its exact character offsets in `line`.
pub fn tokenize(line: &str) -> Vec<SubToken> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (col, ch) in line.chars().enumerate() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                tokens.push(SubToken {
                    text: std::mem::take(&mut current),
                    span: ColumnSpan::new(start, col),
                });
            }
        } else {
            if current.is_empty() {
                start = col;
            }
            current.push(ch);
        }
    }
    if !current.is_empty() {
        let end = start + current.chars().count();
        tokens.push(SubToken {
            text: current,
            span: ColumnSpan::new(start, end),
        });
    }

    tokens
}
