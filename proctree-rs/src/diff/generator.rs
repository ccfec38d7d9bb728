//! Edit script derivation.
//!
//! Walks the new tree in pre-order emitting insertions, moves and updates,
//! then the old tree in pre-order emitting deletions. Paths on the old side
//! are pre-change paths, paths on the new side post-change paths.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::change::{Change, EditScript};
use crate::lcs::lcs_pairs;
use crate::matching::Matching;
use crate::node::{NodeId, Tree};

/// Edit script generator for a matched pair of trees.
pub struct Diff<'a> {
    old: &'a Tree,
    new: &'a Tree,
    /// The matching with the roots forced onto each other.
    matching: Matching,
}

impl<'a> Diff<'a> {
    /// Creates a generator.
    ///
    /// The two roots always correspond, whatever `matching` says about
    /// them; pairs that tie a root to a non-root are ignored.
    pub fn new(old: &'a Tree, new: &'a Tree, matching: &Matching) -> Self {
        let (old_root, new_root) = (old.root(), new.root());
        let mut matching = matching.clone();
        matching.retain(|n, o| {
            (n == new_root) == (o == old_root) && new.is_attached(n) && old.is_attached(o)
        });
        matching.match_new(new_root, old_root);
        Diff {
            old,
            new,
            matching,
        }
    }

    /// The matching the script is derived from.
    pub fn matching(&self) -> &Matching {
        &self.matching
    }

    /// Derives the edit script.
    pub fn generate(&self) -> EditScript {
        let mut script = EditScript::new();
        self.new_side(&mut script);
        let additions = script.len();
        self.old_side(&mut script);
        debug!(
            additions,
            deletions = script.len() - additions,
            "derived edit script"
        );
        script
    }

    fn new_side(&self, script: &mut EditScript) {
        let mut kept: FxHashMap<NodeId, FxHashSet<NodeId>> = FxHashMap::default();
        let mut stack = vec![self.new.root()];
        while let Some(n) = stack.pop() {
            match self.matching.get_old(n) {
                None if self.has_matched_descendant(n) => {
                    script.push(Change::insertion(self.new.path(n), self.new.node_copy(n)));
                }
                None => {
                    script.push(Change::subtree_insertion(
                        self.new.path(n),
                        self.new.subtree_copy(n),
                    ));
                    continue;
                }
                Some(o) => {
                    if n != self.new.root() && self.is_moved(n, o, &mut kept) {
                        script.push(Change::moved(self.old.path(o), self.new.path(n)));
                    }
                    let updates = self.old.content(o).diff_fields(self.new.content(n));
                    if !updates.is_empty() {
                        script.push(Change::update(
                            self.old.path(o),
                            self.new.node_copy(n),
                            updates,
                        ));
                    }
                }
            }
            stack.extend(self.new.children(n).iter().rev().copied());
        }
    }

    fn old_side(&self, script: &mut EditScript) {
        let mut stack = vec![self.old.root()];
        while let Some(o) = stack.pop() {
            if !self.matching.has_old(o) {
                let path = self.old.path(o);
                let partial = self
                    .old
                    .preorder(o)
                    .skip(1)
                    .any(|d| self.matching.has_old(d));
                if !partial {
                    script.push(Change::subtree_deletion(path));
                    continue;
                }
                script.push(Change::deletion(path));
            }
            stack.extend(self.old.children(o).iter().rev().copied());
        }
    }

    fn has_matched_descendant(&self, n: NodeId) -> bool {
        self.new
            .preorder(n)
            .skip(1)
            .any(|d| self.matching.has_new(d))
    }

    /// A matched node moved if its counterpart hangs below a node that is
    /// not its parent's counterpart, or if it fell out of the longest
    /// order-preserving run of siblings that stayed together.
    fn is_moved(
        &self,
        n: NodeId,
        o: NodeId,
        kept: &mut FxHashMap<NodeId, FxHashSet<NodeId>>,
    ) -> bool {
        let Some(pn) = self.new.parent(n) else {
            return false;
        };
        let po = self.old.parent(o);
        let parent_match = self.matching.get_old(pn);
        if po.is_none() || parent_match != po {
            return true;
        }
        let in_order = kept
            .entry(pn)
            .or_insert_with(|| self.ordered_children(pn));
        !in_order.contains(&n)
    }

    /// Children of `pn` that stay under the counterpart of `pn` and keep
    /// their relative order.
    fn ordered_children(&self, pn: NodeId) -> FxHashSet<NodeId> {
        let Some(po) = self.matching.get_old(pn) else {
            return FxHashSet::default();
        };
        let staying: Vec<(NodeId, NodeId)> = self
            .new
            .children(pn)
            .iter()
            .filter_map(|&c| {
                self.matching
                    .get_old(c)
                    .filter(|&oc| self.old.parent(oc) == Some(po))
                    .map(|oc| (c, oc))
            })
            .collect();
        let staying_olds: FxHashSet<NodeId> = staying.iter().map(|&(_, oc)| oc).collect();
        let old_order: Vec<NodeId> = self
            .old
            .children(po)
            .iter()
            .copied()
            .filter(|oc| staying_olds.contains(oc))
            .collect();
        lcs_pairs(&staying, &old_order, |&(_, a), &b| a == b)
            .into_iter()
            .map(|(i, _)| staying[i].0)
            .collect()
    }
}

/// Derives the edit script turning `old` into `new` under `matching`.
pub fn generate(old: &Tree, new: &Tree, matching: &Matching) -> EditScript {
    Diff::new(old, new, matching).generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;
    use crate::matching::test_support::{block, call, process};
    use crate::node::NodePath;

    fn identity(t: &Tree) -> Matching {
        let mut m = Matching::new();
        for id in t.nodes() {
            m.match_new(id, id);
        }
        m
    }

    #[test]
    fn test_identical_trees_give_empty_script() {
        let mut t = process();
        let r = t.root();
        let l = block(&mut t, r, "loop");
        call(&mut t, l, "http://example.org/a");
        let script = generate(&t, &t, &identity(&t));
        assert!(script.is_empty());
    }

    #[test]
    fn test_update() {
        let mut old = process();
        let r = old.root();
        call(&mut old, r, "X");
        let mut new = process();
        let r = new.root();
        call(&mut new, r, "Y");

        let script = generate(&old, &new, &identity(&old));
        assert_eq!(script.len(), 1);
        let change = &script.changes()[0];
        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(change.old_path, Some(NodePath::new(vec![0])));
        let update = &change.updates["endpoint"];
        assert_eq!(update.old.as_deref(), Some("X"));
        assert_eq!(update.new.as_deref(), Some("Y"));
    }

    #[test]
    fn test_deletion() {
        let mut old = process();
        let r = old.root();
        let a = call(&mut old, r, "http://example.org/a");
        call(&mut old, r, "http://example.org/b");
        let mut new = process();
        let r = new.root();
        let na = call(&mut new, r, "http://example.org/a");

        let mut m = Matching::new();
        m.match_new(na, a);
        let script = generate(&old, &new, &m);
        assert_eq!(script.to_string(), "SUBTREE_DELETION 1\n");
    }

    #[test]
    fn test_move_out_of_loop() {
        let mut old = process();
        let r = old.root();
        let l = block(&mut old, r, "loop");
        let a = call(&mut old, l, "http://example.org/a");
        let mut new = process();
        let r = new.root();
        let na = call(&mut new, r, "http://example.org/a");

        let mut m = Matching::new();
        m.match_new(na, a);
        let script = generate(&old, &new, &m);
        assert_eq!(script.to_string(), "MOVE 0/0 -> 0\nDELETION 0\n");
    }

    #[test]
    fn test_insertion_around_matched_node() {
        let mut old = process();
        let r = old.root();
        let a = call(&mut old, r, "http://example.org/a");
        let mut new = process();
        let r = new.root();
        let l = block(&mut new, r, "loop");
        let na = call(&mut new, l, "http://example.org/a");
        call(&mut new, l, "http://example.org/b");

        let mut m = Matching::new();
        m.match_new(na, a);
        let script = generate(&old, &new, &m);
        let kinds: Vec<_> = script.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Insertion,
                ChangeKind::Move,
                ChangeKind::SubtreeInsertion
            ]
        );
        assert_eq!(script.changes()[0].payload.as_ref().map(Tree::len), Some(1));
    }

    #[test]
    fn test_reorder_moves_only_displaced_sibling() {
        let mut old = process();
        let r = old.root();
        call(&mut old, r, "http://example.org/a");
        call(&mut old, r, "http://example.org/b");
        call(&mut old, r, "http://example.org/c");

        let mut new = process();
        let r = new.root();
        let nc = call(&mut new, r, "http://example.org/c");
        let na = call(&mut new, r, "http://example.org/a");
        let nb = call(&mut new, r, "http://example.org/b");

        let o = old.children(old.root()).to_vec();
        let mut m = Matching::new();
        m.match_new(na, o[0]);
        m.match_new(nb, o[1]);
        m.match_new(nc, o[2]);
        let script = generate(&old, &new, &m);
        assert_eq!(script.to_string(), "MOVE 2 -> 0\n");
    }

    #[test]
    fn test_root_pair_forced() {
        let mut old = process();
        let r = old.root();
        let a = call(&mut old, r, "http://example.org/a");
        let new = old.clone();

        // A bogus pair tying the new root to a leaf is ignored.
        let mut m = Matching::new();
        m.match_new(new.root(), a);
        let diff = Diff::new(&old, &new, &m);
        assert!(diff.matching().are_matched(old.root(), new.root()));
        assert_eq!(diff.generate().count(ChangeKind::SubtreeInsertion), 1);
    }
}
