// tbfst-cli: argument parsing, configuration layering and logging for tb2fst.
//
// Settings are resolved in three layers: built-in defaults, then the JSON
// config file, then command-line flags. Everything is validated before the
// first corpus file is opened.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tbfst_core::{AlignmentMap, ConfigError, Tag};
use tbfst_corpus::{DEFAULT_EXTENSIONS, corpus_files};
use tbfst_fst::{CollectStats, PairCounts, Pipeline, PipelineError, PipelineOptions, write_counts};

/// Label used for diagnostics when the corpus comes from stdin.
const STDIN_LABEL: &str = "<stdin>";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Extrapolate an SFST grammar mapping one Toolbox marker onto another.
#[derive(Debug, Clone, Parser)]
#[command(name = "tb2fst", version, long_about = None)]
pub struct Cli {
    /// Source marker, e.g. \tx for the text tier
    pub source: String,

    /// Target marker, e.g. \ge for glosses or \lm for lemmas
    pub target: String,

    /// Toolbox files or directories; reads stdin when none are given
    pub paths: Vec<PathBuf>,

    /// Drop pairs seen fewer than N times (0 keeps everything)
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    pub frequency: Option<i64>,

    /// File to write the grammar to
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Match the source side case-insensitively
    #[arg(short = 'i', long)]
    pub case_insensitive: bool,

    /// Match the source side exactly, even if the config file says otherwise
    #[arg(long, conflicts_with = "case_insensitive")]
    pub case_sensitive: bool,

    /// Reduce rules to the changed part plus N characters of context
    #[arg(
        short = 'r',
        long,
        value_name = "N",
        visible_alias = "reduction_window",
        allow_negative_numbers = true
    )]
    pub reduction_window: Option<i64>,

    /// Align tier CHILD against tier PARENT (repeatable)
    #[arg(short, long, value_name = "CHILD:PARENT")]
    pub align: Vec<String>,

    /// Record key marker, highest rank first (repeatable)
    #[arg(short = 'k', long = "record-key", value_name = "MARKER")]
    pub record_keys: Vec<String>,

    /// Separator between sub-tokens grouped under one token
    #[arg(short, long, value_name = "STR")]
    pub separator: Option<String>,

    /// File extension read when walking directories (repeatable)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the pair count table as JSON
    #[arg(long, value_name = "PATH")]
    pub counts: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long, value_name = "N", env = "TB2FST_JOBS")]
    pub jobs: Option<usize>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot set up logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Configuration file
// ---------------------------------------------------------------------------

/// Contents of a `--config` file. Every field is optional.
///
/// ```json
/// {
///   "alignments": { "mb": "tx", "ge": "mb" },
///   "record_keys": ["id", "ref"],
///   "separator": " ",
///   "frequency": 2,
///   "reduction_window": 1
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Child tier -> parent tier.
    pub alignments: BTreeMap<String, String>,
    pub record_keys: Vec<String>,
    pub separator: Option<String>,
    pub extensions: Vec<String>,
    pub frequency: Option<i64>,
    pub reduction_window: Option<i64>,
    pub case_insensitive: Option<bool>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Everything a run needs, validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub options: PipelineOptions,
    pub inputs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub output: PathBuf,
    pub counts: Option<PathBuf>,
}

/// Parse a `CHILD:PARENT` alignment argument.
pub fn parse_alignment(arg: &str) -> Result<(Tag, Tag), ConfigError> {
    let (child, parent) = arg.split_once(':').ok_or_else(|| {
        ConfigError::InvalidConfiguration(format!("alignment {arg:?} is not of the form CHILD:PARENT"))
    })?;
    Ok((Tag::new(child.trim())?, Tag::new(parent.trim())?))
}

fn non_negative(name: &str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value)
        .map_err(|_| ConfigError::InvalidConfiguration(format!("{name} must be >= 0, got {value}")))
}

fn tags(names: &[String]) -> Result<Vec<Tag>, ConfigError> {
    names.iter().map(|n| Tag::new(n)).collect()
}

/// Layer defaults, the config file and the flags.
pub fn settings(cli: &Cli) -> Result<Settings, CliError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let source = Tag::new(&cli.source)?;
    let target = Tag::new(&cli.target)?;
    for tag in [&source, &target] {
        if !tag.is_well_formed() {
            warn!("unusual marker {tag}: Toolbox markers use letters, digits and underscores");
        }
    }
    let mut options = PipelineOptions::new(source, target)?;

    let alignments: Vec<(Tag, Tag)> = if !cli.align.is_empty() {
        cli.align
            .iter()
            .map(|a| parse_alignment(a))
            .collect::<Result<_, _>>()?
    } else {
        config
            .alignments
            .iter()
            .map(|(child, parent)| Ok((Tag::new(child)?, Tag::new(parent)?)))
            .collect::<Result<_, ConfigError>>()?
    };
    if !alignments.is_empty() {
        options.alignment = AlignmentMap::new(alignments)?;
    }

    if !cli.record_keys.is_empty() {
        options.record_keys = tags(&cli.record_keys)?;
    } else if !config.record_keys.is_empty() {
        options.record_keys = tags(&config.record_keys)?;
    }

    if let Some(separator) = cli.separator.clone().or(config.separator) {
        options.separator = separator;
    }
    options.frequency = match cli.frequency.or(config.frequency) {
        Some(n) => non_negative("frequency", n)?,
        None => 0,
    };
    options.window = cli
        .reduction_window
        .or(config.reduction_window)
        .map(|n| non_negative("reduction window", n).map(|k| k as usize))
        .transpose()?;
    options.case_insensitive = !cli.case_sensitive
        && (cli.case_insensitive || config.case_insensitive.unwrap_or(false));

    let extensions = if !cli.extensions.is_empty() {
        cli.extensions.clone()
    } else if !config.extensions.is_empty() {
        config.extensions
    } else {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    };

    Ok(Settings {
        options,
        inputs: cli.paths.clone(),
        extensions,
        output: cli.output.clone(),
        counts: cli.counts.clone(),
    })
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub counts: PairCounts,
    pub stats: CollectStats,
    pub rules: usize,
}

/// Collect the corpus, write the grammar and, if asked, the count table.
pub fn run(settings: Settings) -> Result<Summary, CliError> {
    let Settings {
        options,
        inputs,
        extensions,
        output,
        counts: counts_path,
    } = settings;
    let pipeline = Pipeline::new(options)?;

    let (counts, stats) = if inputs.is_empty() {
        warn!(
            "reading Toolbox data from stdin; records need {} and {}",
            pipeline.options().source,
            pipeline.options().target
        );
        pipeline
            .collect_reader(io::stdin().lock(), STDIN_LABEL)
            .map_err(PipelineError::from)?
    } else {
        let files = corpus_files(&inputs, &extensions).map_err(PipelineError::from)?;
        info!(files = files.len(), "reading corpus");
        pipeline.collect_files(&files).map_err(PipelineError::from)?
    };

    if stats.skipped_records > 0 || stats.skipped_tokens > 0 {
        warn!(
            records = stats.skipped_records,
            tokens = stats.skipped_tokens,
            "skipped misaligned input"
        );
    }

    if let Some(path) = &counts_path {
        write_counts(&counts, path).map_err(PipelineError::from)?;
        info!(path = %path.display(), pairs = counts.len(), "pair counts written");
    }
    let rules = pipeline.write_grammar(&counts, &output)?;

    Ok(Summary {
        counts,
        stats,
        rules,
    })
}

// ---------------------------------------------------------------------------
// Process helpers
// ---------------------------------------------------------------------------

/// Install the stderr log subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<(), CliError> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Size the global rayon pool.
pub fn init_threads(jobs: usize) -> Result<(), CliError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .map_err(|e| {
            CliError::Config(ConfigError::InvalidConfiguration(format!(
                "cannot start {jobs} worker threads: {e}"
            )))
        })
}

/// Print an error message and exit with code 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tbfst_fst::EmitError;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tb2fst").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let s = settings(&cli(&["\\tx", "\\ge", "-o", "out.fst"])).unwrap();
        assert_eq!(s.options.source, tag("tx"));
        assert_eq!(s.options.target, tag("ge"));
        assert_eq!(s.options.alignment.parent(&tag("ge")), Some(&tag("tx")));
        assert_eq!(s.options.frequency, 0);
        assert_eq!(s.options.window, None);
        assert!(!s.options.case_insensitive);
        assert_eq!(s.options.separator, " ");
        assert!(s.inputs.is_empty());
        assert_eq!(s.extensions.len(), DEFAULT_EXTENSIONS.len());
    }

    #[test]
    fn flags() {
        let s = settings(&cli(&[
            "tx", "ge", "corpus", "-o", "out.fst", "-f", "2", "-i", "--reduction_window", "1",
            "-a", "mb:tx", "-a", "ge:mb", "-k", "id", "-s", "", "--ext", "db",
        ]))
        .unwrap();
        assert_eq!(s.options.frequency, 2);
        assert_eq!(s.options.window, Some(1));
        assert!(s.options.case_insensitive);
        assert_eq!(s.options.alignment.parent(&tag("ge")), Some(&tag("mb")));
        assert_eq!(s.options.record_keys, vec![tag("id")]);
        assert_eq!(s.options.separator, "");
        assert_eq!(s.extensions, vec!["db".to_string()]);
        assert_eq!(s.inputs, vec![PathBuf::from("corpus")]);
    }

    #[test]
    fn negative_numbers_are_configuration_errors() {
        let err = settings(&cli(&["tx", "ge", "-o", "x", "-f", "-1"])).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::InvalidConfiguration(_))));
        let err = settings(&cli(&["tx", "ge", "-o", "x", "-r", "-2"])).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::InvalidConfiguration(_))));
    }

    #[test]
    fn output_is_required() {
        assert!(Cli::try_parse_from(["tb2fst", "tx", "ge"]).is_err());
    }

    #[test]
    fn alignment_argument() {
        assert_eq!(parse_alignment("\\ge:\\mb").unwrap(), (tag("ge"), tag("mb")));
        assert!(matches!(
            parse_alignment("ge"),
            Err(ConfigError::InvalidConfiguration(_))
        ));
        assert!(matches!(parse_alignment("ge:"), Err(ConfigError::InvalidTag(_))));
    }

    #[test]
    fn cyclic_alignment_is_rejected() {
        let err = settings(&cli(&["tx", "ge", "-o", "x", "-a", "ge:mb", "-a", "mb:ge"])).unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::MappingCycle(_))));
    }

    #[test]
    fn config_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tb2fst.json");
        std::fs::write(
            &path,
            r#"{
                "alignments": {"mb": "tx", "ge": "mb"},
                "record_keys": ["ref"],
                "frequency": 3,
                "reduction_window": 2
            }"#,
        )
        .unwrap();
        let config = path.to_str().unwrap();

        let s = settings(&cli(&["tx", "ge", "-o", "x", "-c", config])).unwrap();
        assert_eq!(s.options.alignment.parent(&tag("ge")), Some(&tag("mb")));
        assert_eq!(s.options.record_keys, vec![tag("ref")]);
        assert_eq!(s.options.frequency, 3);
        assert_eq!(s.options.window, Some(2));

        let s = settings(&cli(&["tx", "ge", "-o", "x", "-c", config, "-f", "1"])).unwrap();
        assert_eq!(s.options.frequency, 1);
        assert_eq!(s.options.window, Some(2));
    }

    #[test]
    fn config_case_folding_can_be_switched_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tb2fst.json");
        std::fs::write(&path, r#"{"case_insensitive": true}"#).unwrap();
        let config = path.to_str().unwrap();

        let s = settings(&cli(&["tx", "ge", "-o", "x", "-c", config])).unwrap();
        assert!(s.options.case_insensitive);
        let s = settings(&cli(&["tx", "ge", "-o", "x", "-c", config, "--case-sensitive"])).unwrap();
        assert!(!s.options.case_insensitive);

        assert!(Cli::try_parse_from(["tb2fst", "tx", "ge", "-o", "x", "-i", "--case-sensitive"]).is_err());
    }

    #[test]
    fn bad_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = settings(&cli(&["tx", "ge", "-o", "x", "-c", missing.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, CliError::ConfigIo { .. }));

        let unknown = dir.path().join("unknown.json");
        std::fs::write(&unknown, r#"{"window": 1}"#).unwrap();
        let err = settings(&cli(&["tx", "ge", "-o", "x", "-c", unknown.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, CliError::ConfigParse { .. }));
    }

    #[test]
    fn run_writes_grammar_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(
            &corpus,
            "\\ref 1\n\\tx gatos casa\n\\ge cat.PL house\n\\ref 2\n\\tx gatos\n\\ge cat.PL\n",
        )
        .unwrap();
        let output = dir.path().join("rules.fst");
        let counts = dir.path().join("counts.json");

        let s = settings(&cli(&[
            "tx",
            "ge",
            corpus.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--counts",
            counts.to_str().unwrap(),
            "-f",
            "2",
        ]))
        .unwrap();
        let summary = run(s).unwrap();
        assert_eq!(summary.rules, 1);
        assert_eq!(summary.counts.get("gatos", "cat.PL"), 2);

        let grammar = std::fs::read_to_string(&output).unwrap();
        assert!(grammar.contains("$TX_TO_GE$ = {gatos}:{cat\\.PL}\n"));
        assert!(!grammar.contains("house"));
        assert!(std::fs::read_to_string(&counts).unwrap().contains("\"house\""));
    }

    #[test]
    fn run_reports_empty_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, "\\ref 1\n\\tx a\n\\ge a\n").unwrap();
        let output = dir.path().join("rules.fst");
        let s = settings(&cli(&[
            "tx",
            "ge",
            corpus.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]))
        .unwrap();
        let err = run(s).unwrap_err();
        assert!(matches!(
            err,
            CliError::Pipeline(PipelineError::Emit(EmitError::EmptyGrammar))
        ));
    }
}
