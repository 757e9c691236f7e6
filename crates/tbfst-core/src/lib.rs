//! Shared types for bootstrapping FST grammars from Toolbox corpora.
//!
//! Toolbox (SFM) corpora store interlinear glossed text as `\marker value`
//! lines. Dependent tiers are laid out in space-padded columns under the tier
//! they gloss, so token correspondences can be recovered from character
//! positions alone. This crate holds the types every later stage works on
//! and the column-based field aligner.
//!
//! # Architecture
//!
//! - [`tag`] -- Validated marker identifiers and unwrapped tier lines
//! - [`span`] -- Column spans and aligned tokens
//! - [`mapping`] -- Tier alignment map, validated as a DAG at load time
//! - [`align`] -- Field aligner (column inference between tiers)
//! - [`case`] -- Case folding used for case-insensitive grammars

pub mod align;
pub mod case;
pub mod mapping;
pub mod span;
pub mod tag;

pub use align::{align, align_tier};
pub use mapping::AlignmentMap;
pub use span::{AlignedToken, ColumnSpan, SubToken};
pub use tag::{Tag, TierLine};

/// Errors in user-supplied configuration: tags, alignment maps and
/// numeric options. All of them are fatal and reported before any corpus
/// is read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid marker {0:?}: markers must be non-empty and contain no whitespace")]
    InvalidTag(String),
    #[error("alignment map contains a cycle through {}", format_cycle(.0))]
    MappingCycle(Vec<Tag>),
    #[error("tier {tag} cannot be resolved: {reason}")]
    UnresolvedMapping { tag: Tag, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

fn format_cycle(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Per-record alignment failures. These are recoverable: the caller skips
/// the affected record and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignError {
    /// A dependent token does not fall inside exactly one column region of
    /// the tier it is aligned against.
    #[error("token {token:?} of {tag} at columns {span} does not align with {parent}")]
    Ambiguous {
        tag: Tag,
        parent: Tag,
        token: String,
        span: ColumnSpan,
    },
    /// A dependent tier is mapped to a tier that is absent from the record.
    #[error("tier {tag} is aligned to {parent}, which is missing from the record")]
    MissingParent { tag: Tag, parent: Tag },
    /// Re-joining the inferred sub-tokens does not reproduce the line.
    #[error("sub-tokens of {tag} do not reproduce the original line")]
    Lossy { tag: Tag },
}
