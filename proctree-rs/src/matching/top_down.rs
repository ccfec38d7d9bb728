//! Top-down matching.
//!
//! Starting from the matched pairs (at least the roots), children whose
//! label occurs exactly once under both parents are matched, and the walk
//! continues into every newly matched pair.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::properties::propagate;
use super::{match_roots, Matcher, Matching};
use crate::comparator::Comparator;
use crate::config::Thresholds;
use crate::node::{NodeId, Tree};

/// Descends from matched pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopDownMatcher;

impl Matcher for TopDownMatcher {
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

        let mut queue: VecDeque<(NodeId, NodeId)> = matching.pairs().into_iter().collect();
        let mut added = 0;
        while let Some((n, o)) = queue.pop_front() {
            let new_unique = unique_children(new, n);
            let old_unique = unique_children(old, o);
            for &nc in new.children(n) {
                if !new.is_control_flow(nc) {
                    continue;
                }
                let Some(&oc) = new_unique
                    .get(new.label(nc))
                    .filter(|&&u| u == nc)
                    .and_then(|_| old_unique.get(new.label(nc)))
                else {
                    continue;
                };
                if matching.has_new(nc) || matching.has_old(oc) {
                    continue;
                }
                if comparator.compare(old.get(oc), new.get(nc)) < thresholds.leaf() {
                    matching.match_new(nc, oc);
                    queue.push_back((nc, oc));
                    added += 1;
                }
            }
        }

        propagate(old, new, &mut matching);
        debug!(added, total = matching.len(), "top-down matching");
        matching
    }
}

/// Control-flow children whose label occurs exactly once, by label.
fn unique_children(tree: &Tree, parent: NodeId) -> FxHashMap<&str, NodeId> {
    let mut seen: FxHashMap<&str, Option<NodeId>> = FxHashMap::default();
    for &c in tree.children(parent) {
        if !tree.is_control_flow(c) {
            continue;
        }
        seen.entry(tree.label(c))
            .and_modify(|slot| *slot = None)
            .or_insert(Some(c));
    }
    seen.into_iter()
        .filter_map(|(label, id)| id.map(|id| (label, id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ProcessComparator;
    use crate::matching::test_support::{block, call, process};

    fn run(old: &Tree, new: &Tree) -> Matching {
        TopDownMatcher.build_matching(
            old,
            new,
            Matching::new(),
            &ProcessComparator,
            &Thresholds::default(),
        )
    }

    #[test]
    fn test_descends_unique_labels() {
        let mut old = process();
        let r = old.root();
        let ol = block(&mut old, r, "loop");
        let oc = call(&mut old, ol, "http://example.org/a");

        let mut new = process();
        let r = new.root();
        let nl = block(&mut new, r, "loop");
        let nc = call(&mut new, nl, "http://example.org/a");

        let m = run(&old, &new);
        assert!(m.are_matched(ol, nl));
        assert!(m.are_matched(oc, nc));
    }

    #[test]
    fn test_ambiguous_labels_skipped() {
        let mut old = process();
        let r = old.root();
        let o1 = call(&mut old, r, "http://example.org/a");
        let o2 = call(&mut old, r, "http://example.org/b");

        let new = old.clone();
        let m = run(&old, &new);
        assert!(!m.has_old(o1));
        assert!(!m.has_old(o2));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_unmatched_parent_stops_descent() {
        let mut old = process();
        let r = old.root();
        let ol = block(&mut old, r, "loop");
        let oc = call(&mut old, ol, "http://example.org/a");

        let mut new = process();
        let r = new.root();
        let nl = block(&mut new, r, "choose");
        call(&mut new, nl, "http://example.org/a");

        let m = run(&old, &new);
        assert!(!m.has_old(ol));
        assert!(!m.has_old(oc));
    }
}
