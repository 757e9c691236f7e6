// Pipeline: corpus files -> pair counts -> rules -> grammar
//
// Collection runs per file on the rayon pool; the partial count tables are
// merged additively afterwards, in input order. Everything after the merge
// is single-threaded and deterministic.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, info_span};

use tbfst_core::{AlignmentMap, ConfigError, Tag};
use tbfst_corpus::{CorpusError, MarkerReader, Records};

use crate::collect::{CollectStats, DEFAULT_SEPARATOR, PairCollector, PairCounts};
use crate::emit::{Grammar, GrammarOptions, RuleMode};
use crate::prune::prune;
use crate::rule::{RulePair, TransductionRule};
use crate::{EmitError, PipelineError, diff};

/// Settings of one grammar bootstrapping run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Analysis tier (the grammar's input side).
    pub source: Tag,
    /// Generation tier (the grammar's output side).
    pub target: Tag,
    pub alignment: AlignmentMap,
    /// Record key markers, highest rank first.
    pub record_keys: Vec<Tag>,
    pub separator: String,
    /// Minimum raw count of a pair. 0 and 1 keep every pair.
    pub frequency: u64,
    /// Context window; `None` emits full-form rules.
    pub window: Option<usize>,
    pub case_insensitive: bool,
}

impl PipelineOptions {
    /// Options with `target` aligned directly against `source`, records keyed
    /// by `\id` and `\ref`.
    pub fn new(source: Tag, target: Tag) -> Result<Self, ConfigError> {
        let alignment = AlignmentMap::new([(target.clone(), source.clone())])?;
        Ok(Self {
            source,
            target,
            alignment,
            record_keys: vec![Tag::new("id")?, Tag::new("ref")?],
            separator: DEFAULT_SEPARATOR.to_string(),
            frequency: 1,
            window: None,
            case_insensitive: false,
        })
    }

    /// Transducer variable name, e.g. `TX_TO_GE`.
    pub fn grammar_name(&self) -> String {
        format!("{}_TO_{}", sanitize(self.source.name()), sanitize(self.target.name()))
    }
}

/// Upper-case a tag name into a valid SFST variable name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Runs the stages over a corpus.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    collector: PairCollector,
}

impl Pipeline {
    /// Validate the options against the alignment map.
    pub fn new(options: PipelineOptions) -> Result<Self, ConfigError> {
        let collector = PairCollector::new(
            &options.alignment,
            options.source.clone(),
            options.target.clone(),
        )?
        .with_separator(options.separator.clone());
        debug!(
            source = %options.source,
            target = %options.target,
            anchor = %collector.anchor(),
            root = %options.alignment.root(&options.source),
            "pipeline configured"
        );
        Ok(Self { options, collector })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Collect pairs from a single stream, e.g. stdin.
    pub fn collect_reader<R: BufRead>(
        &self,
        reader: R,
        label: impl Into<PathBuf>,
    ) -> Result<(PairCounts, CollectStats), CorpusError> {
        let records = Records::new(MarkerReader::new(reader, label), &self.options.record_keys);
        let mut counts = PairCounts::new();
        let mut stats = CollectStats::default();
        for record in records {
            self.collector.collect_record(&record?, &mut counts, &mut stats);
        }
        Ok((counts, stats))
    }

    /// Collect pairs from one corpus file.
    pub fn collect_file(&self, path: &Path) -> Result<(PairCounts, CollectStats), CorpusError> {
        let span = info_span!("file", path = %path.display());
        let _enter = span.enter();

        let records = Records::new(MarkerReader::open(path)?, &self.options.record_keys);
        let mut counts = PairCounts::new();
        let mut stats = CollectStats::default();
        for record in records {
            self.collector.collect_record(&record?, &mut counts, &mut stats);
        }
        debug!(
            records = stats.records,
            aligned = stats.aligned_records,
            pairs = counts.len(),
            "file collected"
        );
        Ok((counts, stats))
    }

    /// Collect pairs from several files in parallel and merge the results.
    ///
    /// The first I/O error aborts the run.
    pub fn collect_files(
        &self,
        paths: &[PathBuf],
    ) -> Result<(PairCounts, CollectStats), CorpusError> {
        let partial: Vec<(PairCounts, CollectStats)> = paths
            .par_iter()
            .map(|path| self.collect_file(path))
            .collect::<Result<_, _>>()?;

        let mut counts = PairCounts::new();
        let mut stats = CollectStats::default();
        for (c, s) in partial {
            counts.merge(c);
            stats.merge(s);
        }
        info!(
            files = paths.len(),
            records = stats.records,
            skipped = stats.skipped_records,
            pairs = counts.len(),
            "corpus collected"
        );
        Ok((counts, stats))
    }

    /// Pairs of `counts` that reach the frequency threshold.
    fn kept(&self, counts: &PairCounts) -> Vec<RulePair> {
        let kept = prune(counts.pairs(), self.options.frequency);
        debug!(
            threshold = self.options.frequency,
            kept = kept.len(),
            dropped = counts.len() - kept.len(),
            "pairs pruned"
        );
        kept
    }

    /// Prune the count table and extract the rules of the surviving pairs.
    pub fn rules(&self, counts: &PairCounts) -> Vec<TransductionRule> {
        self.kept(counts)
            .iter()
            .flat_map(|pair| diff::extract(&pair.source, &pair.target, self.options.window))
            .collect()
    }

    /// Build the grammar for a count table.
    ///
    /// Every character of a surviving source string belongs to the source
    /// alphabet, so the grammar accepts the words it was built from. Each
    /// rule is annotated with the counts of the pairs it was extracted from.
    pub fn grammar(&self, counts: &PairCounts) -> Grammar {
        let mode = match self.options.window {
            None => RuleMode::FullForm,
            Some(_) => RuleMode::Rewrite,
        };
        let window = match self.options.window {
            None => "none".to_string(),
            Some(k) => k.to_string(),
        };
        let kept = self.kept(counts);
        let options = GrammarOptions {
            name: self.options.grammar_name(),
            case_insensitive: self.options.case_insensitive,
            mode,
            comment: Some(format!(
                "{} -> {}, frequency >= {}, window {}{}",
                self.options.source,
                self.options.target,
                self.options.frequency.max(1),
                window,
                if self.options.case_insensitive {
                    ", case-insensitive"
                } else {
                    ""
                },
            )),
            alphabet: kept.iter().flat_map(|pair| pair.source.chars()).collect(),
        };
        let rules = kept.iter().flat_map(|pair| {
            diff::extract(&pair.source, &pair.target, self.options.window)
                .into_iter()
                .map(move |rule| (rule, pair.count))
        });
        let grammar = Grammar::with_counts(rules, options);
        info!(rules = grammar.len(), "grammar built");
        grammar
    }

    /// Render the grammar for `counts` and write it to `output`.
    pub fn write_grammar(&self, counts: &PairCounts, output: &Path) -> Result<usize, PipelineError> {
        let grammar = self.grammar(counts);
        grammar.write_to(output)?;
        info!(path = %output.display(), rules = grammar.len(), "grammar written");
        Ok(grammar.len())
    }

    /// Collect `paths` and write the grammar to `output`.
    pub fn run(&self, paths: &[PathBuf], output: &Path) -> Result<(PairCounts, CollectStats), PipelineError> {
        let (counts, stats) = self.collect_files(paths)?;
        self.write_grammar(&counts, output)?;
        Ok((counts, stats))
    }
}

/// Write the pair count table as JSON.
pub fn write_counts(counts: &PairCounts, path: &Path) -> Result<(), EmitError> {
    let json = serde_json::to_string_pretty(counts)?;
    std::fs::write(path, json + "\n").map_err(|source| EmitError::Io {
        path: path.to_path_buf(),
        source,
    })
}
