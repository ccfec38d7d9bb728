//! Tree matching algorithms.
//!
//! A [`Matching`] is a partial one-to-one correspondence between the nodes
//! of an "old" and a "new" tree. Matchers implement the [`Matcher`] trait and
//! are interchangeable; [`MatchingAlgorithm`] selects one per diff call.
//!
//! Every matcher matches the two roots and finally propagates matches into
//! the property subtrees of matched control-flow nodes.

mod bottom_up;
mod bucket;
mod exact;
mod hungarian;
mod path;
mod properties;
mod top_down;

pub use bottom_up::BottomUpMatcher;
pub use bucket::BucketMatcher;
pub use exact::ExactMatcher;
pub use hungarian::assign;
pub use path::PathMatcher;
pub use top_down::TopDownMatcher;

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::comparator::{Comparator, ProcessComparator};
use crate::config::{DiffConfig, Thresholds};
use crate::error::{Error, Result};
use crate::node::{NodeId, Tree};

/// Which tree a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The old (base) tree.
    Old,
    /// The new (changed) tree.
    New,
}

/// A partial injective correspondence between old and new nodes.
///
/// Both directions are maintained eagerly. Matching a node that is already
/// matched on the other side evicts the previous pair, so the most recent
/// insertion wins.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    /// Primary map from new to old nodes.
    new_to_old: FxHashMap<NodeId, NodeId>,
    /// Inverse map.
    old_to_new: FxHashMap<NodeId, NodeId>,
    /// One-to-many proposals waiting for [`Matching::reduce_new`].
    candidates: FxHashMap<NodeId, Vec<NodeId>>,
}

impl Matching {
    /// Creates an empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches `new` to `old`, evicting any pair either node was part of.
    pub fn match_new(&mut self, new: NodeId, old: NodeId) {
        if let Some(prev_old) = self.new_to_old.insert(new, old) {
            if prev_old != old {
                self.old_to_new.remove(&prev_old);
            }
        }
        if let Some(prev_new) = self.old_to_new.insert(old, new) {
            if prev_new != new {
                trace!(old = %old, evicted = %prev_new, by = %new, "evicting match");
                self.new_to_old.remove(&prev_new);
            }
        }
    }

    /// Removes the match of a new node, returning its old counterpart.
    pub fn unmatch_new(&mut self, new: NodeId) -> Option<NodeId> {
        let old = self.new_to_old.remove(&new)?;
        self.old_to_new.remove(&old);
        Some(old)
    }

    /// Removes the match of an old node, returning its new counterpart.
    pub fn unmatch_old(&mut self, old: NodeId) -> Option<NodeId> {
        let new = self.old_to_new.remove(&old)?;
        self.new_to_old.remove(&new);
        Some(new)
    }

    /// True if the new node is matched.
    pub fn has_new(&self, new: NodeId) -> bool {
        self.new_to_old.contains_key(&new)
    }

    /// True if the old node is matched.
    pub fn has_old(&self, old: NodeId) -> bool {
        self.old_to_new.contains_key(&old)
    }

    /// Old counterpart of a new node.
    pub fn get_old(&self, new: NodeId) -> Option<NodeId> {
        self.new_to_old.get(&new).copied()
    }

    /// New counterpart of an old node.
    pub fn get_new(&self, old: NodeId) -> Option<NodeId> {
        self.old_to_new.get(&old).copied()
    }

    /// Counterpart of a node on the given side.
    pub fn get_other(&self, side: Side, node: NodeId) -> Option<NodeId> {
        match side {
            Side::Old => self.get_new(node),
            Side::New => self.get_old(node),
        }
    }

    /// True if `old` and `new` are matched to each other.
    pub fn are_matched(&self, old: NodeId, new: NodeId) -> bool {
        self.get_old(new) == Some(old)
    }

    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    /// True if nothing is matched.
    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// Matched `(new, old)` pairs sorted by new node.
    pub fn pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut pairs: Vec<_> = self.new_to_old.iter().map(|(&n, &o)| (n, o)).collect();
        pairs.sort_unstable();
        pairs
    }

    /// Keeps only the pairs for which `keep(new, old)` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, NodeId) -> bool) {
        let old_to_new = &mut self.old_to_new;
        self.new_to_old.retain(|&n, &mut o| {
            let kept = keep(n, o);
            if !kept {
                old_to_new.remove(&o);
            }
            kept
        });
    }

    /// Records `old` as a candidate for `new` without matching it yet.
    pub fn propose(&mut self, new: NodeId, old: NodeId) {
        let list = self.candidates.entry(new).or_default();
        if !list.contains(&old) {
            list.push(old);
        }
    }

    /// Candidates proposed for a new node.
    pub fn candidates(&self, new: NodeId) -> &[NodeId] {
        self.candidates.get(&new).map_or(&[], Vec::as_slice)
    }

    /// Collapses all proposals into one-to-one matches.
    ///
    /// New nodes are processed in descending id order, so descendants are
    /// decided before their ancestors. `resolver` picks one of the proposed
    /// old nodes, or `None` to leave the new node unmatched.
    pub fn reduce_new<F>(&mut self, mut resolver: F)
    where
        F: FnMut(&Matching, NodeId, &[NodeId]) -> Option<NodeId>,
    {
        let staged = std::mem::take(&mut self.candidates);
        let mut keys: Vec<_> = staged.keys().copied().collect();
        keys.sort_unstable_by(|a, b| b.cmp(a));
        for new in keys {
            let olds = &staged[&new];
            if let Some(old) = resolver(self, new, olds) {
                self.match_new(new, old);
            }
        }
    }
}

/// Trait for tree matching algorithms.
pub trait Matcher {
    /// Builds a matching between `old` and `new`, starting from `seed`.
    ///
    /// Pairs already in `seed` are kept; only unmatched nodes are matched.
    fn build_matching(
        &self,
        old: &Tree,
        new: &Tree,
        seed: Matching,
        comparator: &dyn Comparator,
        thresholds: &Thresholds,
    ) -> Matching;
}

/// Selects a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchingAlgorithm {
    /// Bucketed leaf matching followed by inner nodes by subtree size.
    #[default]
    Bucket,
    /// Leaf matching followed by LCS alignment of ancestor paths.
    Path,
    /// Descends from matched pairs, matching uniquely labelled children.
    TopDown,
    /// Promotes matched children to their parents.
    BottomUp,
    /// Optimal assignment with the Hungarian algorithm.
    Exact,
}

impl MatchingAlgorithm {
    /// All algorithms.
    pub const ALL: [MatchingAlgorithm; 5] = [
        MatchingAlgorithm::Bucket,
        MatchingAlgorithm::Path,
        MatchingAlgorithm::TopDown,
        MatchingAlgorithm::BottomUp,
        MatchingAlgorithm::Exact,
    ];

    /// Returns the matcher implementing this algorithm.
    pub fn matcher(self) -> Box<dyn Matcher> {
        match self {
            MatchingAlgorithm::Bucket => Box::new(BucketMatcher),
            MatchingAlgorithm::Path => Box::new(PathMatcher),
            MatchingAlgorithm::TopDown => Box::new(TopDownMatcher),
            MatchingAlgorithm::BottomUp => Box::new(BottomUpMatcher),
            MatchingAlgorithm::Exact => Box::new(ExactMatcher),
        }
    }

    /// Kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            MatchingAlgorithm::Bucket => "bucket",
            MatchingAlgorithm::Path => "path",
            MatchingAlgorithm::TopDown => "top-down",
            MatchingAlgorithm::BottomUp => "bottom-up",
            MatchingAlgorithm::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchingAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MatchingAlgorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm(s.to_string()))
    }
}

/// Matches two trees with the configured algorithm and the process
/// comparator.
pub fn match_trees(old: &Tree, new: &Tree, config: &DiffConfig) -> Matching {
    config.algorithm.matcher().build_matching(
        old,
        new,
        Matching::new(),
        &ProcessComparator,
        &config.thresholds,
    )
}

/// Matches the roots of both trees.
pub(crate) fn match_roots(old: &Tree, new: &Tree, matching: &mut Matching) {
    matching.match_new(new.root(), old.root());
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::node::{NodeContent, NodeId, Tree};

    /// `description` root.
    pub fn process() -> Tree {
        Tree::new(NodeContent::new("description"))
    }

    /// Appends a call with the given endpoint.
    pub fn call(t: &mut Tree, parent: NodeId, endpoint: &str) -> NodeId {
        t.add_child(
            parent,
            NodeContent::new("call").with_attr("endpoint", endpoint),
        )
    }

    /// Appends a control-flow node without attributes.
    pub fn block(t: &mut Tree, parent: NodeId, label: &str) -> NodeId {
        t.add_child(parent, NodeContent::new(label))
    }

    /// Number of pairs whose new node is a leaf.
    pub fn leaf_matches(new: &Tree, matching: &super::Matching) -> usize {
        new.leaves()
            .into_iter()
            .filter(|&n| matching.has_new(n))
            .count()
    }
}
