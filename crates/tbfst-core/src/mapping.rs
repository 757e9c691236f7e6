// Tier alignment map
//
// Each dependent tier names the tier its columns are aligned against
// (`\mb` against `\tx`, `\ge` against `\mb`, ...). Following those links
// must always end at a root tier that is aligned against nothing. The map is
// validated once with a topological sort; later stages can then walk it
// without cycle checks.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{ConfigError, Tag};

/// Validated `child -> parent` mapping between tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignmentMap {
    parents: BTreeMap<Tag, Tag>,
    /// All declared tiers, parents before children.
    order: Vec<Tag>,
}

impl AlignmentMap {
    /// Build and validate a map from `(child, parent)` pairs.
    ///
    /// Fails with [`ConfigError::MappingCycle`] if following parents can
    /// loop, and with [`ConfigError::InvalidConfiguration`] if one tier is
    /// aligned against two different tiers.
    pub fn new<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Tag, Tag)>,
    {
        let mut parents: BTreeMap<Tag, Tag> = BTreeMap::new();
        for (child, parent) in pairs {
            if let Some(existing) = parents.get(&child) {
                if *existing != parent {
                    return Err(ConfigError::InvalidConfiguration(format!(
                        "tier {child} is aligned against both {existing} and {parent}"
                    )));
                }
                continue;
            }
            parents.insert(child, parent);
        }

        let order = topological_order(&parents)?;
        Ok(Self { parents, order })
    }

    /// The tier `tag` is aligned against, if any.
    pub fn parent(&self, tag: &Tag) -> Option<&Tag> {
        self.parents.get(tag)
    }

    /// Whether `tag` appears in the map, as a child or as a parent.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.order.contains(tag)
    }

    /// Declared tiers, every parent listed before its children.
    pub fn tiers(&self) -> &[Tag] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// `tag` followed by its parent, grandparent and so on up to the root.
    pub fn ancestors(&self, tag: &Tag) -> Vec<Tag> {
        let mut chain = vec![tag.clone()];
        let mut current = tag;
        while let Some(parent) = self.parents.get(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// The root tier `tag` is ultimately aligned against.
    pub fn root(&self, tag: &Tag) -> Tag {
        self.ancestors(tag)
            .pop()
            .unwrap_or_else(|| tag.clone())
    }

    /// Whether `ancestor` is `tag` itself or reachable by following parents.
    pub fn is_ancestor(&self, ancestor: &Tag, tag: &Tag) -> bool {
        self.ancestors(tag).iter().any(|t| t == ancestor)
    }

    /// The nearest tier both `a` and `b` are (transitively) aligned against.
    pub fn common_anchor(&self, a: &Tag, b: &Tag) -> Option<Tag> {
        let of_b = self.ancestors(b);
        self.ancestors(a).into_iter().find(|t| of_b.contains(t))
    }

    /// Check that `tag` is declared in the map.
    pub fn require(&self, tag: &Tag) -> Result<(), ConfigError> {
        if self.contains(tag) {
            Ok(())
        } else {
            Err(ConfigError::UnresolvedMapping {
                tag: tag.clone(),
                reason: "the tier does not appear in the alignment map".to_string(),
            })
        }
    }
}

/// Kahn's algorithm over `parent -> child` edges.
///
/// Every child has exactly one parent, so any tier left unvisited after the
/// sort lies on (or hangs below) a cycle.
fn topological_order(parents: &BTreeMap<Tag, Tag>) -> Result<Vec<Tag>, ConfigError> {
    let mut children: BTreeMap<&Tag, Vec<&Tag>> = BTreeMap::new();
    let mut nodes: BTreeSet<&Tag> = BTreeSet::new();
    for (child, parent) in parents {
        children.entry(parent).or_default().push(child);
        nodes.insert(child);
        nodes.insert(parent);
    }

    let mut queue: VecDeque<&Tag> = nodes
        .iter()
        .copied()
        .filter(|t| !parents.contains_key(*t))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(tag) = queue.pop_front() {
        order.push(tag.clone());
        if let Some(kids) = children.get(tag) {
            queue.extend(kids.iter().copied());
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    // Walk parents from the smallest unvisited tier until a tier repeats.
    let start = nodes
        .iter()
        .find(|t| !order.contains(*t))
        .copied()
        .ok_or_else(|| ConfigError::InvalidConfiguration("inconsistent alignment map".into()))?;
    let mut path: Vec<Tag> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|t| t == current) {
            let mut cycle = path.split_off(pos);
            cycle.push(current.clone());
            return Err(ConfigError::MappingCycle(cycle));
        }
        path.push(current.clone());
        match parents.get(current) {
            Some(parent) => current = parent,
            None => {
                return Err(ConfigError::InvalidConfiguration(
                    "inconsistent alignment map".into(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn map(pairs: &[(&str, &str)]) -> Result<AlignmentMap, ConfigError> {
        AlignmentMap::new(pairs.iter().map(|(c, p)| (tag(c), tag(p))))
    }

    #[test]
    fn chain_is_ordered_parents_first() {
        let m = map(&[("ge", "mb"), ("mb", "tx")]).unwrap();
        assert_eq!(m.tiers(), &[tag("tx"), tag("mb"), tag("ge")]);
        assert_eq!(m.parent(&tag("ge")), Some(&tag("mb")));
        assert_eq!(m.parent(&tag("tx")), None);
        assert_eq!(m.root(&tag("ge")), tag("tx"));
    }

    #[test]
    fn ancestors_start_with_self() {
        let m = map(&[("ge", "mb"), ("mb", "tx")]).unwrap();
        assert_eq!(m.ancestors(&tag("ge")), vec![tag("ge"), tag("mb"), tag("tx")]);
        assert_eq!(m.ancestors(&tag("tx")), vec![tag("tx")]);
    }

    #[test]
    fn common_anchor_of_siblings() {
        let m = map(&[("mb", "tx"), ("ge", "mb"), ("ps", "mb"), ("ft", "tx")]).unwrap();
        assert_eq!(m.common_anchor(&tag("ge"), &tag("ps")), Some(tag("mb")));
        assert_eq!(m.common_anchor(&tag("ge"), &tag("ft")), Some(tag("tx")));
        assert_eq!(m.common_anchor(&tag("tx"), &tag("ge")), Some(tag("tx")));
        assert!(m.is_ancestor(&tag("tx"), &tag("ge")));
        assert!(!m.is_ancestor(&tag("ge"), &tag("tx")));
    }

    #[test]
    fn disconnected_tiers_have_no_anchor() {
        let m = map(&[("mb", "tx"), ("lx", "id")]).unwrap();
        assert_eq!(m.common_anchor(&tag("mb"), &tag("lx")), None);
    }

    #[test]
    fn reject_cycle() {
        let err = map(&[("a", "b"), ("b", "c"), ("c", "a")]).unwrap_err();
        match err {
            ConfigError::MappingCycle(cycle) => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn reject_self_mapping() {
        assert!(matches!(
            map(&[("tx", "tx")]),
            Err(ConfigError::MappingCycle(_))
        ));
    }

    #[test]
    fn reject_conflicting_parents() {
        assert!(matches!(
            map(&[("ge", "mb"), ("ge", "tx")]),
            Err(ConfigError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn repeated_identical_pair_is_fine() {
        let m = map(&[("ge", "tx"), ("ge", "tx")]).unwrap();
        assert_eq!(m.tiers().len(), 2);
    }

    #[test]
    fn require_undeclared_tier() {
        let m = map(&[("ge", "tx")]).unwrap();
        assert!(m.require(&tag("ge")).is_ok());
        assert!(matches!(
            m.require(&tag("lx")),
            Err(ConfigError::UnresolvedMapping { .. })
        ));
    }

    #[test]
    fn empty_map() {
        let m = map(&[]).unwrap();
        assert!(m.is_empty());
        assert!(m.tiers().is_empty());
    }
}
