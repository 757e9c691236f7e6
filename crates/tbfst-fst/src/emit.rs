// Grammar emitter: SFST source syntax
//
// Output layout:
//
//   % comment
//   #SALPH# = <source characters>
//   #TALPH# = <target characters>
//   ALPHABET = [#SALPH#] [#TALPH#]
//
//   % {src}:{tgt} freq N
//   $NAME$ = {src}:{tgt} \
//   	| {src}:{tgt}
//
//   .+ || [#SALPH#]+ || $NAME$ || [#TALPH#]+
//
// Rules are listed one per line in (source, target) order, so identical input
// always renders byte-identical grammars. Frequencies go on comment lines of
// their own above the rules: a `%` comment runs to the end of the line and
// would swallow the continuation backslash.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use tbfst_core::case::{case_pairs, eq_folded, fold, simple_lower};

use crate::EmitError;
use crate::rule::TransductionRule;

/// Characters with a special meaning in SFST source files.
const SFST_SPECIAL: &[char] = &[
    '\\', '=', '-', '|', '{', '}', ':', '%', '$', '#', '[', ']', '(', ')', '<', '>', '^', '*',
    '+', '?', '!', '&', '~', ',', '.', '"', ' ', '\t',
];

/// How rules apply to an input word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleMode {
    /// Each rule maps a whole word (no reduction window).
    #[default]
    FullForm,
    /// Rules rewrite substrings; other characters are copied.
    Rewrite,
}

/// Grammar rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarOptions {
    /// Transducer variable name, without the `$` delimiters.
    pub name: String,
    /// Fold the analysis side to lower case; targets keep their case.
    pub case_insensitive: bool,
    pub mode: RuleMode,
    /// Comment written at the top of the grammar.
    pub comment: Option<String>,
    /// Source characters accepted besides those in the rules, usually every
    /// character of the training words. In rewrite mode these are the
    /// characters copied through unchanged.
    pub alphabet: BTreeSet<char>,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            name: "RULES".to_string(),
            case_insensitive: false,
            mode: RuleMode::FullForm,
            comment: None,
            alphabet: BTreeSet::new(),
        }
    }
}

/// A deduplicated, ordered rule set ready to be written.
///
/// Each rule carries the number of pair occurrences supporting it; 0 means
/// unknown and is not rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    options: GrammarOptions,
    rules: BTreeMap<TransductionRule, u64>,
}

impl Grammar {
    /// Normalize and deduplicate `rules`.
    ///
    /// Identity rules are dropped. With `case_insensitive`, source patterns
    /// are lower-cased first and rules whose two sides only differ in case
    /// are dropped as identities too.
    pub fn new<I>(rules: I, options: GrammarOptions) -> Self
    where
        I: IntoIterator<Item = TransductionRule>,
    {
        Self::with_counts(rules.into_iter().map(|rule| (rule, 0)), options)
    }

    /// Like [`Grammar::new`], with a supporting count per rule. Counts of
    /// rules that collapse into one are summed.
    pub fn with_counts<I>(rules: I, mut options: GrammarOptions) -> Self
    where
        I: IntoIterator<Item = (TransductionRule, u64)>,
    {
        let case_insensitive = options.case_insensitive;
        if case_insensitive {
            options.alphabet = options.alphabet.iter().map(|&c| simple_lower(c)).collect();
        }

        let mut table = BTreeMap::new();
        for (rule, count) in rules {
            let rule = if case_insensitive {
                if eq_folded(&rule.source, &rule.target) {
                    continue;
                }
                TransductionRule::new(fold(&rule.source), rule.target)
            } else if rule.is_identity() {
                continue;
            } else {
                rule
            };
            *table.entry(rule).or_insert(0) += count;
        }
        Self {
            options,
            rules: table,
        }
    }

    /// Rules in emission order.
    pub fn rules(&self) -> impl Iterator<Item = &TransductionRule> {
        self.rules.keys()
    }

    pub fn contains(&self, rule: &TransductionRule) -> bool {
        self.rules.contains_key(rule)
    }

    /// Supporting count of `rule`, if it is part of the grammar.
    pub fn count(&self, rule: &TransductionRule) -> Option<u64> {
        self.rules.get(rule).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn options(&self) -> &GrammarOptions {
        &self.options
    }

    /// Render the grammar as SFST source text.
    pub fn render(&self) -> Result<String, EmitError> {
        if self.rules.is_empty() {
            return Err(EmitError::EmptyGrammar);
        }
        let mut out = String::new();
        self.write_sfst(&mut out)?;
        Ok(out)
    }

    fn write_sfst(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let name = format!("${}$", self.options.name);
        let salph: BTreeSet<char> = self
            .rules
            .keys()
            .flat_map(|r| r.source.chars())
            .chain(self.options.alphabet.iter().copied())
            .collect();
        let talph: BTreeSet<char> = self.rules.keys().flat_map(|r| r.target.chars()).collect();
        let folds = if self.options.case_insensitive {
            case_pairs(&salph)
        } else {
            Vec::new()
        };

        if let Some(comment) = &self.options.comment {
            for line in comment.lines() {
                writeln!(out, "% {line}")?;
            }
        }
        writeln!(out, "#SALPH# = {}", escape_chars(salph.iter().copied()))?;
        writeln!(out, "#TALPH# = {}", escape_chars(talph.iter().copied()))?;

        let fold_pair = (!folds.is_empty()).then(|| {
            format!(
                "[{}]:[{}]",
                escape_chars(folds.iter().map(|&(upper, _)| upper)),
                escape_chars(folds.iter().map(|&(_, lower)| lower)),
            )
        });
        match &fold_pair {
            Some(pair) => writeln!(out, "ALPHABET = [#SALPH#] [#TALPH#] {pair}")?,
            None => writeln!(out, "ALPHABET = [#SALPH#] [#TALPH#]")?,
        }
        writeln!(out)?;

        let input = if self.options.case_insensitive {
            match &fold_pair {
                Some(pair) => writeln!(out, "$FOLD$ = ({pair} | [#SALPH#])+")?,
                None => writeln!(out, "$FOLD$ = [#SALPH#]+")?,
            }
            writeln!(out)?;
            "$FOLD$"
        } else {
            "[#SALPH#]+"
        };

        for (rule, count) in self.rules.iter().filter(|&(_, &count)| count > 0) {
            writeln!(
                out,
                "% {}:{} freq {count}",
                pattern(&rule.source),
                pattern(&rule.target)
            )?;
        }
        write!(out, "{name} = ")?;
        for (i, rule) in self.rules.keys().enumerate() {
            if i > 0 {
                write!(out, " \\\n\t| ")?;
            }
            write!(out, "{}:{}", pattern(&rule.source), pattern(&rule.target))?;
        }
        writeln!(out)?;
        writeln!(out)?;

        match self.options.mode {
            RuleMode::FullForm => writeln!(out, ".+ || {input} || {name} || [#TALPH#]+"),
            RuleMode::Rewrite => writeln!(out, ".+ || {input} || ({name} | [#SALPH#])+"),
        }
    }

    /// Render the grammar and write it to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), EmitError> {
        let text = self.render()?;
        std::fs::write(path, text).map_err(|source| EmitError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Render `rules` as a grammar with default options.
pub fn emit<I>(rules: I, case_insensitive: bool) -> Result<String, EmitError>
where
    I: IntoIterator<Item = TransductionRule>,
{
    let options = GrammarOptions {
        case_insensitive,
        ..GrammarOptions::default()
    };
    Grammar::new(rules, options).render()
}

/// Escape SFST special characters.
pub fn escape(s: &str) -> String {
    escape_chars(s.chars())
}

fn escape_chars(chars: impl Iterator<Item = char>) -> String {
    let mut out = String::new();
    for c in chars {
        if SFST_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A rule side: a `{...}` string, or `<>` (epsilon) when empty.
fn pattern(s: &str) -> String {
    if s.is_empty() {
        "<>".to_string()
    } else {
        format!("{{{}}}", escape(s))
    }
}
