// Diff rule extractor
//
// A rule is the part of a (source, target) pair that actually changes. The
// common prefix and suffix are stripped; what remains in the middle is the
// mismatch. Inside the middle, a shared substring long enough to separate
// two independent context windows splits the mismatch into separate rules.
// Each rule may then be widened with up to `window` characters of the
// unchanged context around it, which is identical on both sides.

use std::ops::Range;

use crate::rule::TransductionRule;

/// Shortest shared run inside a mismatch that splits it in two.
const MIN_ANCHOR: usize = 2;

/// A mismatch region, as character ranges into source and target.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Region {
    source: Range<usize>,
    target: Range<usize>,
}

/// Extract the transduction rules of one (source, target) pair.
///
/// - `window == None`: the whole pair is the rule (full-form lookup).
/// - `window == Some(0)`: only the mismatch core, without context.
/// - `window == Some(k)`: each mismatch core widened by up to `k` characters
///   of unchanged context on either side, clipped at the string boundaries.
///
/// Identical strings yield no rule.
///
/// A mismatch is split into independent regions when source and target
/// share an inner substring of at least `max(2, 2k + 1)` characters, so
/// that widened regions never overlap. The longest such substring is used
/// first (leftmost in the source, then leftmost in the target, on ties) and
/// both sides are split again recursively. Rules are returned left to right.
pub fn extract(source: &str, target: &str, window: Option<usize>) -> Vec<TransductionRule> {
    if source == target {
        return Vec::new();
    }
    let Some(k) = window else {
        return vec![TransductionRule::new(source, target)];
    };

    let s: Vec<char> = source.chars().collect();
    let t: Vec<char> = target.chars().collect();

    let prefix = common_prefix(&s, &t);
    let suffix = common_suffix(&s[prefix..], &t[prefix..]);
    let core = Region {
        source: prefix..s.len() - suffix,
        target: prefix..t.len() - suffix,
    };

    let mut regions = Vec::new();
    split(&s, &t, core, anchor_threshold(k), &mut regions);

    regions
        .into_iter()
        .map(|region| widen(&s, &t, region, k))
        .collect()
}

fn anchor_threshold(window: usize) -> usize {
    (2 * window + 1).max(MIN_ANCHOR)
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

fn split(s: &[char], t: &[char], region: Region, threshold: usize, out: &mut Vec<Region>) {
    if region.source.is_empty() && region.target.is_empty() {
        return;
    }
    let (i, j, len) = longest_common_substring(&s[region.source.clone()], &t[region.target.clone()]);
    if len < threshold {
        out.push(region);
        return;
    }

    let (s0, t0) = (region.source.start, region.target.start);
    split(
        s,
        t,
        Region {
            source: s0..s0 + i,
            target: t0..t0 + j,
        },
        threshold,
        out,
    );
    split(
        s,
        t,
        Region {
            source: s0 + i + len..region.source.end,
            target: t0 + j + len..region.target.end,
        },
        threshold,
        out,
    );
}

/// Start in `a`, start in `b` and length of the longest common substring.
fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // prev[j] = length of the common run ending at a[i - 1], b[j - 1]
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            cur[j] = if a[i - 1] == b[j - 1] { prev[j - 1] + 1 } else { 0 };
            if cur[j] > best.2 {
                best = (i - cur[j], j - cur[j], cur[j]);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

fn widen(s: &[char], t: &[char], region: Region, window: usize) -> TransductionRule {
    let Region { source, target } = region;

    let mut left = 0;
    while left < window
        && left < source.start
        && left < target.start
        && s[source.start - left - 1] == t[target.start - left - 1]
    {
        left += 1;
    }

    let mut right = 0;
    while right < window
        && source.end + right < s.len()
        && target.end + right < t.len()
        && s[source.end + right] == t[target.end + right]
    {
        right += 1;
    }

    TransductionRule::new(
        s[source.start - left..source.end + right].iter().collect::<String>(),
        t[target.start - left..target.end + right].iter().collect::<String>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(source: &str, target: &str, window: Option<usize>) -> Vec<(String, String)> {
        extract(source, target, window)
            .into_iter()
            .map(|r| (r.source, r.target))
            .collect()
    }

    fn rule(s: &str, t: &str) -> (String, String) {
        (s.to_string(), t.to_string())
    }

    #[test]
    fn identity_yields_nothing() {
        assert!(extract("bola", "bola", None).is_empty());
        assert!(extract("bola", "bola", Some(0)).is_empty());
        assert!(extract("", "", Some(3)).is_empty());
    }

    #[test]
    fn no_window_keeps_full_pair() {
        assert_eq!(
            rules("bai-xou", "lower-PST.IND.3SG", None),
            vec![rule("bai-xou", "lower-PST.IND.3SG")]
        );
    }

    #[test]
    fn nothing_in_common() {
        assert_eq!(
            rules("baixou", "lowerPST", Some(0)),
            vec![rule("baixou", "lowerPST")]
        );
    }

    #[test]
    fn one_char_of_left_context() {
        assert_eq!(rules("abc", "abd", Some(0)), vec![rule("c", "d")]);
        assert_eq!(rules("abc", "abd", Some(1)), vec![rule("bc", "bd")]);
        assert_eq!(rules("abc", "abd", Some(5)), vec![rule("abc", "abd")]);
    }

    #[test]
    fn context_on_both_sides() {
        assert_eq!(rules("casa", "cosa", Some(1)), vec![rule("cas", "cos")]);
        assert_eq!(rules("casas", "cosas", Some(2)), vec![rule("casa", "cosa")]);
    }

    #[test]
    fn insertion_and_deletion() {
        assert_eq!(rules("gato", "gatos", Some(0)), vec![rule("", "s")]);
        assert_eq!(rules("gato", "gatos", Some(1)), vec![rule("o", "os")]);
        assert_eq!(rules("gatos", "gato", Some(2)), vec![rule("tos", "to")]);
    }

    #[test]
    fn repeated_characters_do_not_overlap() {
        // Prefix "aa" and suffix may not overlap on "aaa" -> "aaaa"
        assert_eq!(rules("aaa", "aaaa", Some(0)), vec![rule("", "a")]);
    }

    #[test]
    fn two_separate_mismatches() {
        // "kitab" -> "kutub": the shared "t" is too short to split at window 0
        assert_eq!(rules("kitab", "kutub", Some(0)), vec![rule("ita", "utu")]);

        // A long shared middle splits the mismatch in two
        assert_eq!(
            rules("xmiddley", "amiddleb", Some(0)),
            vec![rule("x", "a"), rule("y", "b")]
        );
        assert_eq!(
            rules("pxmiddleyq", "pamiddlebq", Some(1)),
            vec![rule("pxm", "pam"), rule("eyq", "ebq")]
        );
    }

    #[test]
    fn short_shared_middle_merges_windows() {
        // "middle" (6 chars) is shorter than 2 * 3 + 1, so the windows would
        // overlap: one rule covers both mismatches.
        assert_eq!(
            rules("xmiddley", "amiddleb", Some(3)),
            vec![rule("xmiddley", "amiddleb")]
        );
    }

    #[test]
    fn multibyte_characters() {
        assert_eq!(
            rules("t\u{00E4}yt\u{00E4}", "t\u{00E4}ytt\u{00E4}", Some(1)),
            vec![rule("t\u{00E4}", "tt\u{00E4}")]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn identity_pairs_vanish(x in "[a-d]{0,8}", k in prop::option::of(0usize..4)) {
                prop_assert!(extract(&x, &x, k).is_empty());
            }

            /// Widening only ever adds context: every pattern at a smaller
            /// window is a substring of some pattern at a larger one.
            #[test]
            fn window_widening_is_conservative(
                s in "[a-c]{0,8}",
                t in "[a-c]{0,8}",
                k1 in 0usize..3,
                extra in 0usize..3,
            ) {
                let k2 = k1 + extra;
                let narrow = extract(&s, &t, Some(k1));
                let wide = extract(&s, &t, Some(k2));
                for r in &narrow {
                    prop_assert!(
                        wide.iter().any(|w| w.source.contains(&r.source) && w.target.contains(&r.target)),
                        "{:?} not covered by {:?}", r, wide
                    );
                }
            }

            /// Rules are never empty on both sides and never identities.
            #[test]
            fn rules_carry_a_change(s in "[a-c]{0,8}", t in "[a-c]{0,8}", k in 0usize..3) {
                for r in extract(&s, &t, Some(k)) {
                    prop_assert!(!r.is_identity());
                    prop_assert!(s.contains(&r.source));
                    prop_assert!(t.contains(&r.target));
                }
            }
        }
    }
}
