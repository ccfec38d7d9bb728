//! Bottom-up matching.
//!
//! Starting from a seed (leaf matches when the seed is empty), the parents
//! of matched pairs are matched whenever they are similar enough and at
//! least half of the old parent's control-flow descendants are already
//! matched into the new parent's subtree. Promotion repeats until nothing
//! changes.

use tracing::debug;

use super::bucket::match_leaves;
use super::properties::propagate;
use super::{match_roots, Matcher, Matching};
use crate::comparator::Comparator;
use crate::config::Thresholds;
use crate::node::{NodeId, Tree};

/// Promotes matches to parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct BottomUpMatcher;

impl Matcher for BottomUpMatcher {
    fn build_matching(
        &self,
        old: &Tree,
        new: &Tree,
        seed: Matching,
        comparator: &dyn Comparator,
        thresholds: &Thresholds,
    ) -> Matching {
        let mut matching = seed;
        if matching.is_empty() {
            match_leaves(old, new, &mut matching, comparator, thresholds.leaf(), true);
        }

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = false;
            for (n, o) in matching.pairs() {
                let (Some(pn), Some(po)) = (new.parent(n), old.parent(o)) else {
                    continue;
                };
                if matching.has_new(pn) || matching.has_old(po) {
                    continue;
                }
                if comparator.compare(old.get(po), new.get(pn)) >= thresholds.inner() {
                    continue;
                }
                if covers_half(old, new, &matching, po, pn) {
                    matching.match_new(pn, po);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        match_roots(old, new, &mut matching);
        propagate(old, new, &mut matching);
        debug!(rounds, total = matching.len(), "bottom-up matching");
        matching
    }
}

/// True if at least half of `po`'s control-flow descendants are matched
/// into the subtree below `pn`.
fn covers_half(old: &Tree, new: &Tree, matching: &Matching, po: NodeId, pn: NodeId) -> bool {
    let desc = old.control_flow_descendants(po);
    let inside = desc
        .iter()
        .filter(|&&d| {
            matching
                .get_new(d)
                .is_some_and(|nd| nd != pn && new.is_ancestor_or_self(pn, nd))
        })
        .count();
    2 * inside >= desc.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ProcessComparator;
    use crate::matching::test_support::{block, call, process};

    fn run(old: &Tree, new: &Tree, seed: Matching) -> Matching {
        BottomUpMatcher.build_matching(old, new, seed, &ProcessComparator, &Thresholds::default())
    }

    #[test]
    fn test_promotes_to_fixpoint() {
        let mut old = process();
        let r = old.root();
        let ol = block(&mut old, r, "loop");
        let oc = block(&mut old, ol, "critical");
        call(&mut old, oc, "http://example.org/a");
        call(&mut old, oc, "http://example.org/b");

        let new = old.clone();
        let m = run(&old, &new, Matching::new());
        assert!(m.are_matched(oc, oc));
        assert!(m.are_matched(ol, ol));
        assert_eq!(m.len(), old.len());
    }

    #[test]
    fn test_half_rule() {
        let mut old = process();
        let r = old.root();
        let ol = block(&mut old, r, "loop");
        let a = call(&mut old, ol, "http://example.org/a");
        let b = call(&mut old, ol, "http://example.org/b");
        let c = call(&mut old, ol, "http://example.org/c");

        let mut new = process();
        let r = new.root();
        let nl = block(&mut new, r, "loop");
        let na = call(&mut new, nl, "http://example.org/a");
        call(&mut new, r, "http://example.org/b");
        call(&mut new, r, "http://example.org/c");

        // Only one of three old children ends up under the new loop.
        let mut seed = Matching::new();
        seed.match_new(na, a);
        let m = run(&old, &new, seed);
        assert!(!m.has_old(ol));

        let mut seed = Matching::new();
        seed.match_new(na, a);
        let nb = call(&mut new, nl, "http://example.org/b");
        seed.match_new(nb, b);
        let m = run(&old, &new, seed);
        assert!(m.are_matched(ol, nl));
        assert!(!m.has_old(c));
    }
}
