// Frequency pruner
//
// Pruning looks at raw pairs, before any rule extraction. Two rare pairs
// that happen to widen into the same rule do not add up: each has to reach
// the threshold on its own.

use crate::rule::RulePair;

/// Keep the pairs observed at least `threshold` times.
///
/// Thresholds 0 and 1 keep every observed pair. Order is preserved.
pub fn prune<I>(pairs: I, threshold: u64) -> Vec<RulePair>
where
    I: IntoIterator<Item = RulePair>,
{
    let threshold = threshold.max(1);
    pairs.into_iter().filter(|p| p.count >= threshold).collect()
}
