//! Reading Toolbox (SFM) corpora.
//!
//! A corpus file is a sequence of `\marker value` lines. This crate turns a
//! byte stream into marker fields, groups fields into records under key
//! markers, joins interlinear blocks that were wrapped for display, and finds
//! corpus files on disk.
//!
//! - [`scanner`] -- `\marker value` fields from a byte stream
//! - [`record`] -- Grouping fields into records by key markers
//! - [`unwrap`] -- Joining wrapped interlinear blocks
//! - [`files`] -- Corpus file enumeration

pub mod files;
pub mod record;
pub mod scanner;
pub mod unwrap;

use std::path::PathBuf;

pub use files::{DEFAULT_EXTENSIONS, corpus_files};
pub use record::{Record, RecordContext, Records};
pub use scanner::{Field, MarkerReader};
pub use unwrap::unwrap_record;

/// Error type for reading corpora.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} does not exist", .0.display())]
    NotFound(PathBuf),
}
