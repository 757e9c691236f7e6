//! Bootstrapping SFST grammars from aligned Toolbox tiers.
//!
//! The stages run strictly in order, each consuming the complete output of
//! the previous one:
//!
//! - [`collect`] -- Aligned (source, target) pairs with occurrence counts
//! - [`prune`] -- Frequency threshold on raw pairs
//! - [`diff`] -- Rule extraction by prefix/suffix diffing and context windows
//! - [`emit`] -- SFST grammar rendering and output
//! - [`pipeline`] -- Wiring the stages to corpus files
//!
//! The grammar is meant for `fst-compiler`; compiling and running it is out
//! of scope here.

pub mod collect;
pub mod diff;
pub mod emit;
pub mod pipeline;
pub mod prune;
pub mod rule;

use std::path::PathBuf;

pub use collect::{CollectStats, CollectWarning, PairCollector, PairCounts, collect};
pub use diff::extract;
pub use emit::{Grammar, GrammarOptions, RuleMode, emit};
pub use pipeline::{Pipeline, PipelineOptions, write_counts};
pub use prune::prune;
pub use rule::{RulePair, TransductionRule};

/// Error type for grammar emission.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// No rule survived pruning and identity removal.
    #[error("empty grammar: no transduction rules left to emit")]
    EmptyGrammar,

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize pair counts: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot format grammar: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Any fatal error of a grammar bootstrapping run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] tbfst_core::ConfigError),

    #[error(transparent)]
    Corpus(#[from] tbfst_corpus::CorpusError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}
