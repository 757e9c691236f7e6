// Case folding for case-insensitive grammars
//
// Folding is character-by-character simple lowercasing: every character
// maps to exactly one character, so a folded pattern has the same length and
// column structure as the original. Characters whose lowercase form expands
// to several characters keep only the first one.

use std::collections::BTreeSet;

/// Convert a character to its simple lowercase equivalent.
pub fn simple_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Convert a character to its simple uppercase equivalent.
pub fn simple_upper(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

/// Whether a character is a letter with a distinct lowercase form.
pub fn is_upper(c: char) -> bool {
    c != simple_lower(c)
}

/// Fold a pattern for case-insensitive matching.
pub fn fold(s: &str) -> String {
    s.chars().map(simple_lower).collect()
}

/// Whether two strings are equal once case is folded.
pub fn eq_folded(a: &str, b: &str) -> bool {
    a.chars().map(simple_lower).eq(b.chars().map(simple_lower))
}

/// Upper-case letters that fold onto the given (folded) alphabet, each with
/// its lowercase counterpart.
///
/// Sorted by the lowercase letter so that the result is deterministic.
/// Letters without a distinct uppercase form are skipped.
pub fn case_pairs(alphabet: &BTreeSet<char>) -> Vec<(char, char)> {
    alphabet
        .iter()
        .filter_map(|&lower| {
            let upper = simple_upper(lower);
            (upper != lower && simple_lower(upper) == lower).then_some((upper, lower))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_basic() {
        assert_eq!(fold("Pedro"), "pedro");
        assert_eq!(fold("PST.IND.3SG"), "pst.ind.3sg");
        assert_eq!(fold("\u{00C4}iti"), "\u{00E4}iti"); // Äiti -> äiti
    }

    #[test]
    fn fold_keeps_length() {
        // U+0130 LATIN CAPITAL LETTER I WITH DOT ABOVE lowercases to two chars
        let s = "\u{0130}stanbul";
        assert_eq!(fold(s).chars().count(), s.chars().count());
    }

    #[test]
    fn eq_folded_ignores_case() {
        assert!(eq_folded("Pedro", "pedro"));
        assert!(eq_folded("BOLA", "bola"));
        assert!(!eq_folded("bola", "bolas"));
    }

    #[test]
    fn upper_detection() {
        assert!(is_upper('A'));
        assert!(is_upper('\u{00C4}'));
        assert!(!is_upper('a'));
        assert!(!is_upper('1'));
        assert!(!is_upper('-'));
    }

    #[test]
    fn case_pairs_skip_caseless() {
        let alphabet: BTreeSet<char> = "ab1-\u{00E4}".chars().collect();
        assert_eq!(
            case_pairs(&alphabet),
            vec![('A', 'a'), ('B', 'b'), ('\u{00C4}', '\u{00E4}')]
        );
    }
}
