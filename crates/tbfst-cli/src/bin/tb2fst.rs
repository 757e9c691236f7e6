// tb2fst: Bootstrap an SFST grammar from aligned Toolbox tiers.
//
// Reads Toolbox files (or stdin), pairs the tokens of the source tier with
// the tokens of the target tier and writes a grammar mapping one onto the
// other, for compilation with fst-compiler.
//
// Usage:
//   tb2fst SOURCE TARGET [PATH...] -o GRAMMAR [-f N] [-r N] [-i]
//
// Examples:
//   tb2fst '\tx' '\ge' texts/ -o tx2ge.fst -f 2
//   tb2fst '\mb' '\ge' -a 'mb:tx' -a 'ge:mb' -r 1 -o mb2ge.fst < corpus.txt

use clap::Parser;
use tracing::info;

use tbfst_cli::{Cli, fatal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = tbfst_cli::init_logging(cli.verbose, cli.quiet) {
        fatal(&e.to_string());
    }
    if let Some(jobs) = cli.jobs {
        tbfst_cli::init_threads(jobs).unwrap_or_else(|e| fatal(&e.to_string()));
    }

    let settings = tbfst_cli::settings(&cli).unwrap_or_else(|e| fatal(&e.to_string()));
    let output = settings.output.clone();
    let summary = tbfst_cli::run(settings).unwrap_or_else(|e| fatal(&e.to_string()));

    info!(
        path = %output.display(),
        rules = summary.rules,
        pairs = summary.counts.len(),
        records = summary.stats.records,
        "done"
    );
}
