//! Delta tree construction.
//!
//! An edit script is applied to a delta copy of the base tree in phases:
//!
//! 1. every old path is resolved on the pristine copy,
//! 2. field updates are applied,
//! 3. moved nodes are detached, leaving `MOVE_FROM` placeholders,
//! 4. deleted nodes are marked, detached and kept as placeholders,
//! 5. insertions and move targets are attached in script order.
//!
//! The result is the *standard* delta tree. [`resolve_placeholders`] turns
//! it into the *extended* form with placeholders shown in place.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::change::{Change, ChangeKind, EditScript};
use crate::error::{Error, Result};
use crate::node::{DeltaInfo, DeltaType, NodeId, NodeKind, NodePath, Tree, Update};

/// Applies an edit script to a copy of `tree`, returning the standard
/// delta tree.
///
/// Fails with [`Error::NotApplicable`] when a path does not exist; `tree`
/// is never modified.
pub fn patch(tree: &Tree, script: &EditScript) -> Result<Tree> {
    Patcher::new(tree).apply(script)
}

/// Working state of one patch run.
struct Patcher {
    delta: Tree,
    next_move_id: u32,
}

impl Patcher {
    fn new(tree: &Tree) -> Self {
        let mut delta = tree.to_delta();
        let ids: Vec<NodeId> = delta.nodes().skip(1).collect();
        for id in ids {
            let pos = delta.node(id).child_pos();
            if let Some(d) = delta.delta_mut(id) {
                d.set_origin_index(Some(pos));
            }
        }
        Patcher {
            delta,
            next_move_id: 0,
        }
    }

    fn apply(mut self, script: &EditScript) -> Result<Tree> {
        let targets = self.resolve_targets(script)?;

        for (change, target) in script.iter().zip(&targets) {
            if let (ChangeKind::Update, Some(node)) = (change.kind, *target) {
                self.update(node, change);
            }
        }

        let mut moved: FxHashMap<usize, NodeId> = FxHashMap::default();
        for (i, (change, target)) in script.iter().zip(&targets).enumerate() {
            if let (ChangeKind::Move, Some(node)) = (change.kind, *target) {
                self.detach_moved(node, change)?;
                moved.insert(i, node);
            }
        }

        let mut deleted = 0;
        for (change, target) in script.iter().zip(&targets) {
            if let (ChangeKind::Deletion | ChangeKind::SubtreeDeletion, Some(node)) =
                (change.kind, *target)
            {
                self.delete(node, change)?;
                deleted += 1;
            }
        }

        let mut attached = 0;
        for (i, change) in script.iter().enumerate() {
            let node = match change.kind {
                ChangeKind::Insertion | ChangeKind::SubtreeInsertion => {
                    let payload = change.payload.as_ref().ok_or_else(|| {
                        Error::NotApplicable(format!("{} without payload", change.kind))
                    })?;
                    let top = self.delta.import_subtree(payload, payload.root());
                    self.delta.mark_subtree(top, DeltaType::Insertion);
                    top
                }
                ChangeKind::Move => match moved.get(&i) {
                    Some(&node) => node,
                    None => continue,
                },
                _ => continue,
            };
            self.attach(node, change)?;
            attached += 1;
        }

        debug!(
            updates = script.count(ChangeKind::Update),
            moves = moved.len(),
            deleted,
            attached,
            "patched delta tree"
        );
        Ok(self.delta)
    }

    /// Resolves every old path before anything changes.
    fn resolve_targets(&self, script: &EditScript) -> Result<Vec<Option<NodeId>>> {
        script
            .iter()
            .map(|change| match change.kind {
                ChangeKind::Insertion | ChangeKind::SubtreeInsertion => Ok(None),
                _ => {
                    let path = required(&change.old_path, change, "old")?;
                    self.delta.resolve(path).map(Some)
                }
            })
            .collect()
    }

    fn update(&mut self, node: NodeId, change: &Change) {
        for (key, update) in &change.updates {
            let before = self.delta.content(node).field(key).map(str::to_string);
            self.delta
                .content_mut(node)
                .set_field(key, update.new.as_deref());
            if let Some(d) = self.delta.delta_mut(node) {
                d.record_update(
                    key.clone(),
                    Update {
                        old: before,
                        new: update.new.clone(),
                    },
                );
            }
        }
    }

    fn detach_moved(&mut self, node: NodeId, change: &Change) -> Result<()> {
        let Some(parent) = self.delta.parent(node) else {
            return Err(Error::NotApplicable(format!(
                "{} moves a node that is not attached",
                change
            )));
        };
        self.next_move_id += 1;
        let move_id = self.next_move_id;

        // The placeholder shows the node as it was before any update.
        let mut content = self.delta.content(node).clone();
        let mut info = DeltaInfo::new(DeltaType::MoveFrom);
        if let Some(d) = self.delta.delta(node) {
            for (key, update) in d.updates() {
                content.set_field(key, update.old.as_deref());
            }
            info.set_origin_index(d.origin_index());
        }
        info.set_move_id(Some(move_id));
        let placeholder = self.delta.alloc(content, NodeKind::Delta(info));

        if let Some(d) = self.delta.delta_mut(parent) {
            d.push_placeholder(placeholder);
        }
        self.delta.detach(node);
        if let Some(d) = self.delta.delta_mut(node) {
            d.set_change(DeltaType::MoveTo);
            d.set_move_id(Some(move_id));
        }
        trace!(%node, move_id, "detached moved node");
        Ok(())
    }

    fn delete(&mut self, node: NodeId, change: &Change) -> Result<()> {
        let Some(parent) = self.delta.parent(node) else {
            return Err(Error::NotApplicable(format!(
                "{} deletes a node that is not attached",
                change
            )));
        };
        self.delta.mark_subtree(node, DeltaType::Deletion);
        if let Some(d) = self.delta.delta_mut(parent) {
            d.push_placeholder(node);
        }
        self.delta.detach(node);
        Ok(())
    }

    /// Places `node` at the change's new path, counting live children only.
    fn attach(&mut self, node: NodeId, change: &Change) -> Result<()> {
        let path = required(&change.new_path, change, "new")?;
        let (Some(parent_path), Some(index)) = (path.parent(), path.last()) else {
            return Err(Error::NotApplicable(format!(
                "{} targets the root",
                change
            )));
        };
        let parent = self.delta.resolve(&parent_path)?;
        let count = self.delta.children(parent).len();
        if index > count {
            return Err(Error::NotApplicable(format!(
                "{} indexes position {} of a node with {} children",
                change, index, count
            )));
        }
        self.delta.insert_child(parent, index, node);
        Ok(())
    }
}

fn required<'c>(
    path: &'c Option<NodePath>,
    change: &Change,
    side: &str,
) -> Result<&'c NodePath> {
    path.as_ref().ok_or_else(|| {
        Error::NotApplicable(format!("{} without {} path", change.kind, side))
    })
}

/// Builds the extended delta tree: every placeholder is reinserted next to
/// the live children of the node that recorded it, at its original index.
///
/// `MOVE_FROM` placeholders recorded anywhere inside a `MOVE_TO` subtree are
/// dropped, since the moved content is already shown at its target.
pub fn resolve_placeholders(delta: &Tree) -> Tree {
    let mut out = delta.clone();
    let mut stack = vec![out.root()];
    while let Some(node) = stack.pop() {
        let mut placeholders = out
            .delta_mut(node)
            .map(DeltaInfo::take_placeholders)
            .unwrap_or_default();
        placeholders.sort_by_key(|&p| out.delta(p).and_then(DeltaInfo::origin_index));

        let inside_move = std::iter::once(node)
            .chain(out.ancestors(node))
            .any(|a| out.change(a) == DeltaType::MoveTo);
        for placeholder in placeholders {
            if inside_move && out.change(placeholder) == DeltaType::MoveFrom {
                continue;
            }
            let count = out.children(node).len();
            let index = out
                .delta(placeholder)
                .and_then(DeltaInfo::origin_index)
                .map_or(count, |i| i.min(count));
            out.insert_child(node, index, placeholder);
        }
        stack.extend(out.children(node).iter().rev().copied());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::generate;
    use crate::matching::test_support::{block, call, process};
    use crate::matching::Matching;
    use crate::node::NodeContent;

    fn identity(t: &Tree) -> Matching {
        let mut m = Matching::new();
        for id in t.nodes() {
            m.match_new(id, id);
        }
        m
    }

    #[test]
    fn test_update_recorded() {
        let mut old = process();
        let r = old.root();
        call(&mut old, r, "X");
        let mut new = process();
        let r = new.root();
        call(&mut new, r, "Y");

        let delta = patch(&old, &generate(&old, &new, &identity(&old))).unwrap();
        let c = delta.children(delta.root())[0];
        assert_eq!(delta.change(c), DeltaType::Update);
        assert_eq!(delta.content(c).attr("endpoint"), Some("Y"));
        let update = &delta.delta(c).unwrap().updates()["endpoint"];
        assert_eq!(update.old.as_deref(), Some("X"));
        assert!(delta.same_content(&new));
    }

    #[test]
    fn test_deletion_leaves_placeholder() {
        let mut old = process();
        let r = old.root();
        let a = call(&mut old, r, "http://example.org/a");
        call(&mut old, r, "http://example.org/b");
        let mut new = process();
        let r = new.root();
        let na = call(&mut new, r, "http://example.org/a");
        let mut m = Matching::new();
        m.match_new(na, a);

        let delta = patch(&old, &generate(&old, &new, &m)).unwrap();
        assert_eq!(delta.children(delta.root()).len(), 1);
        let placeholders = delta.delta(delta.root()).unwrap().placeholders();
        assert_eq!(placeholders.len(), 1);
        assert_eq!(delta.change(placeholders[0]), DeltaType::Deletion);

        let extended = resolve_placeholders(&delta);
        let kids = extended.children(extended.root());
        assert_eq!(kids.len(), 2);
        assert_eq!(extended.change(kids[1]), DeltaType::Deletion);
    }

    #[test]
    fn test_move_correlates_placeholder() {
        let mut old = process();
        let r = old.root();
        let l = block(&mut old, r, "loop");
        let a = call(&mut old, l, "http://example.org/a");
        let mut new = process();
        let r = new.root();
        let na = call(&mut new, r, "http://example.org/a");
        let mut m = Matching::new();
        m.match_new(na, a);

        let delta = patch(&old, &generate(&old, &new, &m)).unwrap();
        let moved = delta.resolve(&NodePath::new(vec![0])).unwrap();
        assert_eq!(delta.change(moved), DeltaType::MoveTo);
        assert!(delta.same_content(&new));

        let extended = resolve_placeholders(&delta);
        let from = extended.resolve(&NodePath::new(vec![0, 0])).unwrap();
        assert_eq!(extended.change(from), DeltaType::MoveFrom);
        assert_eq!(
            extended.delta(from).and_then(DeltaInfo::move_id),
            delta.delta(moved).and_then(DeltaInfo::move_id)
        );
    }

    #[test]
    fn test_move_from_inside_moved_subtree_dropped() {
        // The loop moves into the choose; its second call moves to the root.
        let mut old = process();
        let r = old.root();
        let ch = block(&mut old, r, "choose");
        let l = block(&mut old, r, "loop");
        let a = call(&mut old, l, "http://example.org/a");
        let b = call(&mut old, l, "http://example.org/b");

        let mut new = process();
        let r = new.root();
        let nch = block(&mut new, r, "choose");
        let nl = block(&mut new, nch, "loop");
        let na = call(&mut new, nl, "http://example.org/a");
        let nb = call(&mut new, r, "http://example.org/b");

        let mut m = Matching::new();
        m.match_new(nch, ch);
        m.match_new(nl, l);
        m.match_new(na, a);
        m.match_new(nb, b);

        let delta = patch(&old, &generate(&old, &new, &m)).unwrap();
        assert!(delta.same_content(&new));
        let extended = resolve_placeholders(&delta);
        let from: Vec<_> = extended
            .nodes()
            .filter(|&id| extended.change(id) == DeltaType::MoveFrom)
            .collect();
        // Only the loop's own origin under the root is shown.
        assert_eq!(from.len(), 1);
        assert_eq!(extended.label(from[0]), "loop");
    }

    #[test]
    fn test_out_of_range_path_rejected() {
        let old = process();
        let mut script = EditScript::new();
        script.push(Change::subtree_insertion(
            NodePath::new(vec![3]),
            Tree::new(NodeContent::new("call")),
        ));
        assert!(matches!(patch(&old, &script), Err(Error::NotApplicable(_))));

        let mut script = EditScript::new();
        script.push(Change::deletion(NodePath::new(vec![0])));
        let err = patch(&old, &script).unwrap_err();
        assert!(err.to_string().starts_with("edit script not applicable to tree"));
    }

    #[test]
    fn test_caller_tree_untouched() {
        let mut old = process();
        let r = old.root();
        call(&mut old, r, "http://example.org/a");
        let before = old.clone();
        let mut script = EditScript::new();
        script.push(Change::subtree_deletion(NodePath::new(vec![0])));
        patch(&old, &script).unwrap();
        assert!(old.same_content(&before));
    }
}
