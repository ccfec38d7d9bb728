//! Bucketed leaf and inner-node matching.
//!
//! Leaves are bucketed by label and every new leaf picks the closest old
//! leaf of its bucket. Inner nodes are then matched smallest subtree first,
//! scored by their own similarity and by how many of their control-flow
//! descendants already correspond.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::properties::propagate;
use super::{match_roots, Matcher, Matching};
use crate::comparator::Comparator;
use crate::config::Thresholds;
use crate::constants::{INNER_COMPARE_WEIGHT, INNER_OVERLAP_WEIGHT};
use crate::node::{NodeId, Tree};

/// The default matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketMatcher;

impl Matcher for BucketMatcher {
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
        let leaves = match_leaves(old, new, &mut matching, comparator, thresholds.leaf(), true);
        let inner = match_inner(old, new, &mut matching, comparator, thresholds.inner());
        propagate(old, new, &mut matching);
        debug!(leaves, inner, total = matching.len(), "bucket matching");
        matching
    }
}

/// Picks the candidate with the lowest cost, breaking ties by the lowest
/// distance.
pub(crate) fn best_candidate(
    candidates: &[NodeId],
    mut cost: impl FnMut(NodeId) -> f64,
    mut distance: impl FnMut(NodeId) -> usize,
) -> Option<(f64, NodeId)> {
    let mut best: Option<(f64, usize, NodeId)> = None;
    for &c in candidates {
        let (cc, cd) = (cost(c), distance(c));
        let better = match best {
            None => true,
            Some((bc, bd, _)) => cc < bc || (cc == bc && cd < bd),
        };
        if better {
            best = Some((cc, cd, c));
        }
    }
    best.map(|(c, _, id)| (c, id))
}

/// Matches every unmatched new leaf to its most similar old leaf.
///
/// Old leaves matched before the pass are not candidates. Within the pass a
/// later new leaf may take an old leaf from an earlier one. With `bucketed`
/// set, only leaves of the same label are compared.
pub(crate) fn match_leaves(
    old: &Tree,
    new: &Tree,
    matching: &mut Matching,
    comparator: &dyn Comparator,
    threshold: f64,
    bucketed: bool,
) -> usize {
    let mut buckets: FxHashMap<&str, Vec<NodeId>> = FxHashMap::default();
    for o in old.leaves() {
        if matching.has_old(o) {
            continue;
        }
        let key = if bucketed { old.label(o) } else { "" };
        buckets.entry(key).or_default().push(o);
    }
    let old_pos = old.preorder_index();
    let new_pos = new.preorder_index();

    let mut accepted = 0;
    for n in new.leaves() {
        if matching.has_new(n) {
            continue;
        }
        let key = if bucketed { new.label(n) } else { "" };
        let Some(bucket) = buckets.get(key) else {
            continue;
        };
        let best = best_candidate(
            bucket,
            |o| comparator.compare(old.get(o), new.get(n)),
            |o| old_pos[&o].abs_diff(new_pos[&n]),
        );
        if let Some((cost, o)) = best {
            if cost < threshold {
                matching.match_new(n, o);
                accepted += 1;
            }
        }
    }
    accepted
}

/// Matches unmatched inner nodes, smallest new subtrees first.
pub(crate) fn match_inner(
    old: &Tree,
    new: &Tree,
    matching: &mut Matching,
    comparator: &dyn Comparator,
    threshold: f64,
) -> usize {
    let old_inner: Vec<NodeId> = old
        .inner_nodes()
        .into_iter()
        .filter(|&o| !matching.has_old(o))
        .collect();
    let old_desc: FxHashMap<NodeId, FxHashSet<NodeId>> = old_inner
        .iter()
        .map(|&o| (o, old.control_flow_descendants(o).into_iter().collect()))
        .collect();
    let mut new_inner = new.inner_nodes();
    new_inner.sort_by_key(|&n| new.subtree_size(n));
    let old_pos = old.preorder_index();
    let new_pos = new.preorder_index();

    let mut accepted = 0;
    for n in new_inner {
        if matching.has_new(n) {
            continue;
        }
        let new_desc = new.control_flow_descendants(n);
        let best = best_candidate(
            &old_inner,
            |o| {
                let desc_o = &old_desc[&o];
                let common = new_desc
                    .iter()
                    .filter(|&&d| matching.get_old(d).is_some_and(|od| desc_o.contains(&od)))
                    .count();
                let total = desc_o.len() + new_desc.len();
                let dice = if total == 0 {
                    0.0
                } else {
                    2.0 * common as f64 / total as f64
                };
                INNER_COMPARE_WEIGHT * comparator.compare(old.get(o), new.get(n))
                    + INNER_OVERLAP_WEIGHT * (1.0 - dice)
            },
            |o| old_pos[&o].abs_diff(new_pos[&n]),
        );
        if let Some((cost, o)) = best {
            if cost < threshold {
                matching.match_new(n, o);
                accepted += 1;
            }
        }
    }
    accepted
}
