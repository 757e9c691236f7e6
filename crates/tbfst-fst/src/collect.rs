// Pair collector
//
// Source and target tiers are related through the alignment map. When one
// of them is an ancestor of the other (the usual case: glosses aligned to
// words), each ancestor token pairs with the descendant sub-tokens under it,
// joined by the segment separator. Otherwise both tiers are projected onto
// their nearest common ancestor and the sub-tokens under each anchor token
// are paired position by position.

use hashbrown::HashMap;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use tbfst_core::align::align_tier;
use tbfst_core::{AlignError, AlignedToken, AlignmentMap, ConfigError, Tag};
use tbfst_corpus::{Record, RecordContext, unwrap_record};

use crate::rule::RulePair;

/// Default separator between the segments of a multi-token target.
pub const DEFAULT_SEPARATOR: &str = " ";

// ---------------------------------------------------------------------------
// Count table
// ---------------------------------------------------------------------------

/// Occurrence counts per distinct (source, target) pair.
///
/// Merging is plain addition, so partial tables from different files can be
/// combined in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairCounts {
    counts: HashMap<(String, String), u64>,
}

impl PairCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation of `(source, target)`.
    pub fn add(&mut self, source: &str, target: &str) {
        self.add_count(source, target, 1);
    }

    pub fn add_count(&mut self, source: &str, target: &str, count: u64) {
        *self
            .counts
            .entry((source.to_string(), target.to_string()))
            .or_insert(0) += count;
    }

    pub fn get(&self, source: &str, target: &str) -> u64 {
        self.counts
            .get(&(source.to_string(), target.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn merge(&mut self, other: PairCounts) {
        for ((source, target), count) in other.counts {
            *self.counts.entry((source, target)).or_insert(0) += count;
        }
    }

    /// Number of distinct pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of observations.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// All pairs, sorted by source and target.
    pub fn pairs(&self) -> Vec<RulePair> {
        let mut pairs: Vec<RulePair> = self
            .counts
            .iter()
            .map(|((s, t), &c)| RulePair::new(s.clone(), t.clone(), c))
            .collect();
        pairs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        pairs
    }
}

impl FromIterator<RulePair> for PairCounts {
    fn from_iter<I: IntoIterator<Item = RulePair>>(iter: I) -> Self {
        let mut counts = Self::new();
        for pair in iter {
            counts.add_count(&pair.source, &pair.target, pair.count);
        }
        counts
    }
}

impl Serialize for PairCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.pairs())
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A recoverable anomaly met while collecting pairs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectWarning {
    /// The record's tiers are not column consistent; the record is skipped.
    #[error("record {context} (line {line}): {error}")]
    Alignment {
        context: String,
        line: usize,
        error: AlignError,
    },

    /// Source and target have a different number of sub-tokens under the
    /// same anchor token; that token is skipped.
    #[error(
        "record {context} (line {line}): {anchor} token {token:?} has {source_count} {source_tag} \
         sub-tokens but {target_count} {target_tag} sub-tokens"
    )]
    SubtokenCountMismatch {
        context: String,
        line: usize,
        anchor: Tag,
        token: String,
        source_tag: Tag,
        source_count: usize,
        target_tag: Tag,
        target_count: usize,
    },
}

/// What happened to the records of one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Records seen.
    pub records: usize,
    /// Records that contributed pairs.
    pub aligned_records: usize,
    /// Records lacking the source, target or anchor tier.
    pub incomplete_records: usize,
    /// Records skipped because of an alignment error.
    pub skipped_records: usize,
    /// Anchor tokens skipped because of a sub-token count mismatch.
    pub skipped_tokens: usize,
    pub warnings: Vec<CollectWarning>,
}

impl CollectStats {
    pub fn merge(&mut self, other: CollectStats) {
        self.records += other.records;
        self.aligned_records += other.aligned_records;
        self.incomplete_records += other.incomplete_records;
        self.skipped_records += other.skipped_records;
        self.skipped_tokens += other.skipped_tokens;
        self.warnings.extend(other.warnings);
    }

    fn warn(&mut self, warning: CollectWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// Target tokens are grouped under source tokens.
    SourceIsAnchor,
    /// Source tokens are grouped under target tokens.
    TargetIsAnchor,
    /// Both are grouped under a third tier.
    SharedAnchor,
}

/// Pulls aligned (source, target) pairs out of records.
#[derive(Debug, Clone)]
pub struct PairCollector {
    source: Tag,
    target: Tag,
    anchor: Tag,
    relation: Relation,
    /// Tiers on the paths from source and target up to the anchor; these are
    /// unwrapped together so their columns stay consistent.
    tiers: Vec<Tag>,
    separator: String,
}

impl PairCollector {
    /// Check `source` and `target` against the alignment map.
    ///
    /// Both tiers must be declared in the map and share an ancestor.
    pub fn new(map: &AlignmentMap, source: Tag, target: Tag) -> Result<Self, ConfigError> {
        if source == target {
            return Err(ConfigError::InvalidConfiguration(format!(
                "source and target marker are both {source}"
            )));
        }
        map.require(&source)?;
        map.require(&target)?;

        let anchor = map
            .common_anchor(&source, &target)
            .ok_or_else(|| ConfigError::UnresolvedMapping {
                tag: target.clone(),
                reason: format!("it is not aligned, directly or transitively, with {source}"),
            })?;

        let relation = if map.is_ancestor(&source, &target) {
            Relation::SourceIsAnchor
        } else if map.is_ancestor(&target, &source) {
            Relation::TargetIsAnchor
        } else {
            Relation::SharedAnchor
        };

        let mut tiers: Vec<Tag> = Vec::new();
        for tag in path_to(map, &source, &anchor)
            .into_iter()
            .chain(path_to(map, &target, &anchor))
        {
            if !tiers.contains(&tag) {
                tiers.push(tag);
            }
        }

        Ok(Self {
            source,
            target,
            anchor,
            relation,
            tiers,
            separator: DEFAULT_SEPARATOR.to_string(),
        })
    }

    /// Separator placed between sub-tokens grouped under one anchor token.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn anchor(&self) -> &Tag {
        &self.anchor
    }

    /// Tiers that must be unwrapped before alignment.
    pub fn tiers(&self) -> &[Tag] {
        &self.tiers
    }

    /// Collect pairs from every record.
    pub fn collect<I>(&self, records: I) -> (PairCounts, CollectStats)
    where
        I: IntoIterator<Item = Record>,
    {
        let mut counts = PairCounts::new();
        let mut stats = CollectStats::default();
        for record in records {
            self.collect_record(&record, &mut counts, &mut stats);
        }
        (counts, stats)
    }

    /// Add the pairs of one record to `counts`.
    ///
    /// Alignment errors skip the record and mismatched tokens skip the
    /// token; both are logged and recorded in `stats`.
    pub fn collect_record(&self, record: &Record, counts: &mut PairCounts, stats: &mut CollectStats) {
        stats.records += 1;
        let record = unwrap_record(record, &self.tiers);
        let line = record.line().unwrap_or(0);

        let (Some(anchor), Some(source), Some(target)) = (
            record.tier(&self.anchor),
            record.tier(&self.source),
            record.tier(&self.target),
        ) else {
            debug!(record = %record.context, "record lacks {} or {}", self.source, self.target);
            stats.incomplete_records += 1;
            return;
        };

        let aligned = match self.relation {
            Relation::SourceIsAnchor => align_tier(&anchor, &target).map(|t| (t, None)),
            Relation::TargetIsAnchor => align_tier(&anchor, &source).map(|s| (s, None)),
            Relation::SharedAnchor => align_tier(&anchor, &source)
                .and_then(|s| align_tier(&anchor, &target).map(|t| (s, Some(t)))),
        };
        let (first, second) = match aligned {
            Ok(a) => a,
            Err(error) => {
                stats.skipped_records += 1;
                stats.warn(CollectWarning::Alignment {
                    context: record.context.to_string(),
                    line,
                    error,
                });
                return;
            }
        };

        stats.aligned_records += 1;
        match (self.relation, second) {
            (Relation::SharedAnchor, Some(targets)) => {
                self.pair_shared(&record.context, line, &first, &targets, counts, stats)
            }
            (Relation::TargetIsAnchor, _) => {
                for tok in grouped(&first) {
                    counts.add(&tok.joined(&self.separator), tok.token.as_deref().unwrap_or(""));
                }
            }
            _ => {
                for tok in grouped(&first) {
                    counts.add(tok.token.as_deref().unwrap_or(""), &tok.joined(&self.separator));
                }
            }
        }
    }

    fn pair_shared(
        &self,
        context: &RecordContext,
        line: usize,
        sources: &[AlignedToken],
        targets: &[AlignedToken],
        counts: &mut PairCounts,
        stats: &mut CollectStats,
    ) {
        for (src, tgt) in sources.iter().zip(targets) {
            if src.sub_tokens.len() != tgt.sub_tokens.len() {
                stats.skipped_tokens += 1;
                stats.warn(CollectWarning::SubtokenCountMismatch {
                    context: context.to_string(),
                    line,
                    anchor: self.anchor.clone(),
                    token: src.token.clone().unwrap_or_default(),
                    source_tag: self.source.clone(),
                    source_count: src.sub_tokens.len(),
                    target_tag: self.target.clone(),
                    target_count: tgt.sub_tokens.len(),
                });
                continue;
            }
            for (s, t) in src.sub_texts().zip(tgt.sub_texts()) {
                counts.add(s, t);
            }
        }
    }
}

/// Anchor tokens with at least one sub-token; unglossed tokens carry no
/// pair.
fn grouped(tokens: &[AlignedToken]) -> impl Iterator<Item = &AlignedToken> {
    tokens.iter().filter(|t| !t.sub_tokens.is_empty())
}

/// `tag` and its ancestors, stopping at (and including) `anchor`.
fn path_to(map: &AlignmentMap, tag: &Tag, anchor: &Tag) -> Vec<Tag> {
    let mut path = Vec::new();
    for t in map.ancestors(tag) {
        let done = t == *anchor;
        path.push(t);
        if done {
            break;
        }
    }
    path
}

/// Collect all aligned (source, target) pairs of `records`.
///
/// Convenience wrapper around [`PairCollector`] with the default separator.
pub fn collect<I>(
    records: I,
    alignment_map: &AlignmentMap,
    source_tag: &Tag,
    target_tag: &Tag,
) -> Result<PairCounts, ConfigError>
where
    I: IntoIterator<Item = Record>,
{
    let collector = PairCollector::new(alignment_map, source_tag.clone(), target_tag.clone())?;
    Ok(collector.collect(records).0)
}
