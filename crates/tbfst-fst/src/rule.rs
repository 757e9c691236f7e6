// Rule pairs and transduction rules

use serde::Serialize;

/// A distinct (source, target) observation with its raw occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RulePair {
    pub source: String,
    pub target: String,
    pub count: u64,
}

impl RulePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>, count: u64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            count,
        }
    }
}

/// A (source pattern, target pattern) rewrite, after diffing and context
/// widening.
///
/// Ordered lexicographically by source, then target; this is the order in
/// which grammars list their rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransductionRule {
    pub source: String,
    pub target: String,
}

impl TransductionRule {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether the rule maps its source onto itself.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}
