//! Optimal matching through recursive assignment problems.
//!
//! All control-flow nodes of both trees are padded to a square cost matrix
//! and assigned with the Hungarian algorithm. Pairing with a padding slot
//! costs 1. A pair of leaves costs `compare()`; a pair of inner nodes costs
//!
//! ```text
//! (0.7 * children + 0.3 * compare)²
//! ```
//!
//! where `children` is the normalized optimal assignment cost of their
//! control-flow children. Superlinear; meant for small trees and as a
//! reference for the heuristic matchers.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::hungarian::{assign, assignment_cost};
use super::properties::propagate;
use super::{match_roots, Matcher, Matching};
use crate::comparator::Comparator;
use crate::config::Thresholds;
use crate::constants::{EXACT_CHILDREN_WEIGHT, EXACT_COMPARE_WEIGHT};
use crate::node::{NodeId, Tree};

/// Globally optimal one-to-one matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
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

        let olds: Vec<NodeId> = old
            .nodes()
            .filter(|&o| o != old.root() && old.is_control_flow(o) && !matching.has_old(o))
            .collect();
        let news: Vec<NodeId> = new
            .nodes()
            .filter(|&n| n != new.root() && new.is_control_flow(n) && !matching.has_new(n))
            .collect();

        let mut scorer = PairScorer::new(old, new, comparator);
        let matrix = scorer.matrix(&olds, &news);
        let assignment = assign(&matrix);

        let mut accepted = 0;
        for (i, &j) in assignment.iter().enumerate() {
            if let (Some(&o), Some(&n)) = (olds.get(i), news.get(j)) {
                if matrix[i][j] < thresholds.leaf() {
                    matching.match_new(n, o);
                    accepted += 1;
                }
            }
        }

        propagate(old, new, &mut matching);
        debug!(
            size = matrix.len(),
            scored = scorer.memo.len(),
            accepted,
            "exact matching"
        );
        matching
    }
}

/// Memoized pair costs.
struct PairScorer<'a> {
    old: &'a Tree,
    new: &'a Tree,
    comparator: &'a dyn Comparator,
    memo: FxHashMap<(NodeId, NodeId), f64>,
}

impl<'a> PairScorer<'a> {
    fn new(old: &'a Tree, new: &'a Tree, comparator: &'a dyn Comparator) -> Self {
        PairScorer {
            old,
            new,
            comparator,
            memo: FxHashMap::default(),
        }
    }

    /// Square matrix over both lists, padded with cost 1.
    fn matrix(&mut self, olds: &[NodeId], news: &[NodeId]) -> Vec<Vec<f64>> {
        let k = olds.len().max(news.len());
        let mut matrix = vec![vec![0.0; k]; k];
        for (i, row) in matrix.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = match (olds.get(i), news.get(j)) {
                    (Some(&o), Some(&n)) => self.cost(o, n),
                    (None, None) => 0.0,
                    _ => 1.0,
                };
            }
        }
        matrix
    }

    fn cost(&mut self, o: NodeId, n: NodeId) -> f64 {
        if let Some(&c) = self.memo.get(&(o, n)) {
            return c;
        }
        let compare = self
            .comparator
            .compare(self.old.get(o), self.new.get(n));
        let old_children = control_flow_children(self.old, o);
        let new_children = control_flow_children(self.new, n);

        let cost = if old_children.is_empty() && new_children.is_empty() {
            compare
        } else {
            let sub_matrix = self.matrix(&old_children, &new_children);
            let k = sub_matrix.len() as f64;
            let sub = (assignment_cost(&sub_matrix, &assign(&sub_matrix)) / k).min(1.0);
            let blended = EXACT_CHILDREN_WEIGHT * sub + EXACT_COMPARE_WEIGHT * compare;
            blended * blended
        };
        self.memo.insert((o, n), cost);
        cost
    }
}

fn control_flow_children(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .filter(|&c| tree.is_control_flow(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ProcessComparator;
    use crate::matching::test_support::{block, call, process};
    use crate::node::NodeContent;

    fn run(old: &Tree, new: &Tree) -> Matching {
        ExactMatcher.build_matching(
            old,
            new,
            Matching::new(),
            &ProcessComparator,
            &Thresholds::default(),
        )
    }

    #[test]
    fn test_identity() {
        let mut t = process();
        let r = t.root();
        let l = block(&mut t, r, "loop");
        call(&mut t, l, "http://example.org/a");
        let c = call(&mut t, l, "http://example.org/b");
        t.add_child(c, NodeContent::new("parameters"));
        call(&mut t, r, "http://example.org/a");

        let m = run(&t, &t);
        for id in t.nodes() {
            assert!(m.are_matched(id, id), "{} not matched to itself", id);
        }
    }

    #[test]
    fn test_inner_cost_squared() {
        let mut old = process();
        let r = old.root();
        let ol = block(&mut old, r, "loop");
        call(&mut old, ol, "http://example.org/a");
        call(&mut old, ol, "http://example.org/b");

        let mut new = process();
        let r = new.root();
        let nl = block(&mut new, r, "loop");
        call(&mut new, nl, "http://example.org/a");
        call(&mut new, nl, "urn:unrelated");

        let mut scorer = PairScorer::new(&old, &new, &ProcessComparator);
        let cost = scorer.cost(ol, nl);
        // one child pair is free, the other only partly similar
        assert!(cost > 0.0 && cost < 0.25, "cost {}", cost);
    }

    #[test]
    fn test_globally_optimal() {
        // Crossed order; the assignment still pairs equal endpoints.
        let mut old = process();
        let r = old.root();
        let o1 = call(&mut old, r, "http://example.org/ab");
        let o2 = call(&mut old, r, "http://example.org/abc");

        let mut new = process();
        let r = new.root();
        let n1 = call(&mut new, r, "http://example.org/abc");
        let n2 = call(&mut new, r, "http://example.org/ab");

        let m = run(&old, &new);
        assert!(m.are_matched(o1, n2));
        assert!(m.are_matched(o2, n1));
    }
}
