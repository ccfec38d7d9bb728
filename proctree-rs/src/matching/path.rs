//! Path-based matching.
//!
//! Leaves are matched first. For every matched leaf pair the label paths
//! from each leaf's parent up to the root are aligned with an LCS, and the
//! aligned ancestors become candidate pairs. When a new node collects
//! several candidates, the one that already contains most of its subtree
//! wins.

use tracing::debug;

use super::bucket::match_leaves;
use super::properties::propagate;
use super::{match_roots, Matcher, Matching};
use crate::comparator::Comparator;
use crate::config::Thresholds;
use crate::lcs::lcs_pairs;
use crate::node::{NodeId, Tree};

/// Matches ancestors along aligned label paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathMatcher;

impl Matcher for PathMatcher {
    fn build_matching(
        &self,
        old: &Tree,
        new: &Tree,
        seed: Matching,
        comparator: &dyn Comparator,
        thresholds: &Thresholds,
    ) -> Matching {
        let mut matching = seed;
        match_roots(old, new, &mut matching);
        let leaves = match_leaves(old, new, &mut matching, comparator, thresholds.leaf(), false);

        let leaf_pairs: Vec<_> = matching
            .pairs()
            .into_iter()
            .filter(|&(n, o)| n != new.root() && new.is_leaf(n) && old.is_leaf(o))
            .collect();
        for (n, o) in leaf_pairs {
            let new_path = new.ancestors(n);
            let old_path = old.ancestors(o);
            let aligned = lcs_pairs(&new_path, &old_path, |&a, &b| new.label(a) == old.label(b));
            for (i, j) in aligned {
                let (na, oa) = (new_path[i], old_path[j]);
                if matching.has_new(na) || matching.has_old(oa) {
                    continue;
                }
                // Keep ancestor order: a node already aligned elsewhere on
                // this old path must not be re-aligned to a different node.
                if matching
                    .candidates(na)
                    .iter()
                    .any(|&c| c != oa && old_path.contains(&c))
                {
                    continue;
                }
                if comparator.compare(old.get(oa), new.get(na)) < thresholds.inner() {
                    matching.propose(na, oa);
                }
            }
        }

        matching.reduce_new(|m, n, olds| best_container(old, new, m, n, olds));
        propagate(old, new, &mut matching);
        debug!(leaves, total = matching.len(), "path matching");
        matching
    }
}

/// The candidate whose subtree already holds the largest share of `n`'s
/// matched descendants. Earlier candidates win ties.
fn best_container(
    old: &Tree,
    new: &Tree,
    matching: &Matching,
    n: NodeId,
    olds: &[NodeId],
) -> Option<NodeId> {
    let size = new.subtree_size(n).saturating_sub(1).max(1);
    let mut best: Option<(f64, NodeId)> = None;
    for &o in olds {
        let covered = new
            .preorder(n)
            .skip(1)
            .filter(|&d| {
                matching
                    .get_old(d)
                    .is_some_and(|od| od != o && old.is_ancestor_or_self(o, od))
            })
            .count();
        let share = covered as f64 / size as f64;
        if best.map_or(true, |(b, _)| share > b) {
            best = Some((share, o));
        }
    }
    best.map(|(_, o)| o)
}
