//! Three-way merge of two delta trees sharing a base.
//!
//! Branch B's delta tree is the merge target. Branch A's delta tree is
//! aligned with it, by base id first and then by bucketed matching for
//! content both branches inserted independently, and A's changes are
//! replayed onto the target in three phases:
//!
//! 1. placement: A's moves and insertions, pre-order,
//! 2. content: A's field updates,
//! 3. removal: nodes A deleted.
//!
//! Conflicts are queued as they are found and resolved by a fixed policy.
//! Branch A's value wins update conflicts and A's placement wins move
//! conflicts. Deletion wins delete-vs-change conflicts. A move that would
//! nest a node under itself keeps B's placement.

mod conflict_log;
mod edit_log;
mod state;

pub use conflict_log::{Conflict, ConflictLog, ConflictType, Resolution};
pub use edit_log::{EditEntry, EditLog, EditType};
pub use state::MergeState;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::comparator::ProcessComparator;
use crate::config::DiffConfig;
use crate::diff::delta_tree;
use crate::error::Result;
use crate::matching::{BucketMatcher, Matcher, Matching};
use crate::node::{
    ChangeOrigin, Confidence, DeltaInfo, DeltaType, NodeId, NodePath, Tree, Update,
};

/// Outcome of a merge.
#[derive(Debug)]
pub struct MergeResult {
    /// The merged tree, annotated with change kinds and provenance.
    pub tree: Tree,
    /// Conflicts found and how they were resolved.
    pub conflicts: ConflictLog,
    /// Changes replayed from branch A.
    pub edits: EditLog,
    /// Final state of every merged node, including removed ones.
    pub states: FxHashMap<NodeId, MergeState>,
}

impl MergeResult {
    /// The state of a merged node.
    pub fn state(&self, id: NodeId) -> MergeState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    /// The merged tree without annotations or placeholders.
    pub fn merged(&self) -> Tree {
        self.tree.to_plain()
    }
}

/// Diffs both branches against `base` and merges the results.
pub fn merge_trees(base: &Tree, a: &Tree, b: &Tree, config: &DiffConfig) -> Result<MergeResult> {
    let delta_a = delta_tree(base, a, config)?;
    let delta_b = delta_tree(base, b, config)?;
    Ok(Merge::new(base, &delta_a, &delta_b, config).run())
}

/// The merge engine.
pub struct Merge {
    /// Branch A, replayed onto the target.
    source: Tree,
    /// Branch B; becomes the merged tree.
    target: Tree,
    /// Source nodes (new side) against target nodes (old side).
    matching: Matching,
    /// Base-tree paths by pre-order index.
    base_paths: Vec<NodePath>,
    /// Source nodes that have no place in the merged tree.
    dropped: FxHashSet<NodeId>,
    /// Target nodes branch B deleted, by base id.
    deleted_in_target: FxHashMap<usize, NodeId>,
    conflicts: ConflictLog,
    edits: EditLog,
    states: FxHashMap<NodeId, MergeState>,
}

impl Merge {
    /// Prepares a merge of two delta trees produced against `base`.
    pub fn new(base: &Tree, branch_a: &Tree, branch_b: &Tree, config: &DiffConfig) -> Self {
        let source = tagged(branch_a, ChangeOrigin::BranchA);
        let target = tagged(branch_b, ChangeOrigin::BranchB);
        let matching = align(&source, &target, config);

        let deleted_in_target = (0..target.arena_len())
            .map(NodeId::from_index)
            .filter(|&t| !target.is_attached(t) && target.change(t) == DeltaType::Deletion)
            .filter_map(|t| base_id(&target, t).map(|b| (b, t)))
            .collect();

        Merge {
            source,
            target,
            matching,
            base_paths: base.nodes().map(|id| base.path(id)).collect(),
            dropped: FxHashSet::default(),
            deleted_in_target,
            conflicts: ConflictLog::new(),
            edits: EditLog::new(),
            states: FxHashMap::default(),
        }
    }

    /// Runs all phases and resolves the queued conflicts.
    pub fn run(mut self) -> MergeResult {
        debug!(matched = self.matching.len(), "aligned branches");
        self.merge_placement();
        self.merge_content();
        self.merge_deletions();
        self.finish()
    }

    // -- phase 1 -----------------------------------------------------------

    fn merge_placement(&mut self) {
        let order: Vec<NodeId> = self.source.nodes().skip(1).collect();
        for s in order {
            match self.matching.get_old(s) {
                Some(t) => self.place_matched(s, t),
                None => self.carry_unmatched(s),
            }
        }
    }

    /// Applies A's move of `s` to its counterpart `t`.
    fn place_matched(&mut self, s: NodeId, t: NodeId) {
        if self.source.change(s) != DeltaType::MoveTo {
            return;
        }
        let Some(ps) = self.source.parent(s) else {
            return;
        };
        let b_moved = self.target.change(t) == DeltaType::MoveTo;

        let Some(tp) = self.matching.get_old(ps) else {
            self.move_conflict(
                t,
                "branch A moved the node under a parent branch B removed",
                Resolution::BranchB,
            );
            return;
        };
        if b_moved && self.target.parent(t) == Some(tp) {
            self.set_state(t, MergeState::Moved);
            return;
        }
        if self.target.is_ancestor_or_self(t, tp) {
            self.move_conflict(
                t,
                "branch A's move would nest the node under itself",
                Resolution::BranchB,
            );
            return;
        }

        self.target.detach(t);
        let index = self.target_index(s, tp);
        self.target.insert_child(tp, index, t);
        if let Some(d) = self.target.delta_mut(t) {
            d.set_change(DeltaType::MoveTo);
        }
        self.set_origin(t, ChangeOrigin::BranchA);
        self.log_edit(EditType::Move, t);
        trace!(node = %t, parent = %tp, index, "applied move from branch A");

        if b_moved {
            self.move_conflict(t, "both branches moved the node", Resolution::BranchA);
        } else {
            self.set_state(t, MergeState::Moved);
        }
    }

    /// Handles a source node with no counterpart: an insertion of A, or a
    /// node B deleted.
    fn carry_unmatched(&mut self, s: NodeId) {
        let Some(ps) = self.source.parent(s) else {
            return;
        };
        if self.dropped.contains(&ps) {
            self.dropped.insert(s);
            return;
        }

        if self.source.change(s).is_insertion() {
            let Some(tp) = self.matching.get_old(ps) else {
                self.dropped.insert(s);
                return;
            };
            let t = self.target.import_node(&self.source, s);
            if let Some(d) = self.target.delta_mut(t) {
                d.set_change(DeltaType::Insertion);
            }
            self.set_origin(t, ChangeOrigin::BranchA);
            let index = self.target_index(s, tp);
            self.target.insert_child(tp, index, t);
            self.matching.match_new(s, t);
            self.set_state(t, MergeState::Inserted);
            self.log_edit(EditType::Insert, t);
            return;
        }

        // Branch B deleted a node branch A kept.
        self.dropped.insert(s);
        let changed = self
            .source
            .preorder(s)
            .filter(|&d| d == s || !self.matching.has_new(d))
            .any(|d| !self.source.delta(d).is_some_and(DeltaInfo::is_nil));
        let removed = base_id(&self.source, s).and_then(|b| self.deleted_in_target.get(&b).copied());
        if changed {
            let conflict = Conflict::new(
                ConflictType::DeleteChange,
                "deleted in branch B, changed in branch A",
                self.source.path(s),
                Resolution::Deleted,
            )
            .with_base_path(self.base_path(&self.source, s));
            self.conflicts.queue(conflict);
            if let Some(t) = removed {
                self.set_state(t, MergeState::DeleteConflict);
                self.lose_confidence(t, Confidence::CONTENT);
            }
        } else if let Some(t) = removed {
            self.set_state(t, MergeState::Deleted);
        }
    }

    /// Position under `tp` right after the counterpart of the nearest
    /// preceding sibling of `s` that already sits under `tp`.
    fn target_index(&self, s: NodeId, tp: NodeId) -> usize {
        let Some(ps) = self.source.parent(s) else {
            return 0;
        };
        let pos = self.source.node(s).child_pos();
        self.source.children(ps)[..pos]
            .iter()
            .rev()
            .filter_map(|&prev| self.matching.get_old(prev))
            .find(|&t| self.target.parent(t) == Some(tp))
            .map_or(0, |t| self.target.node(t).child_pos() + 1)
    }

    // -- phase 2 -----------------------------------------------------------

    fn merge_content(&mut self) {
        let pairs: Vec<(NodeId, NodeId)> = self
            .source
            .nodes()
            .filter_map(|s| self.matching.get_old(s).map(|t| (s, t)))
            .collect();
        for (s, t) in pairs {
            let both_inserted =
                self.source.change(s).is_insertion() && self.target.change(t).is_insertion();
            let a_updates = if both_inserted {
                self.target.content(t).diff_fields(self.source.content(s))
            } else {
                self.source
                    .delta(s)
                    .map(|d| d.updates().clone())
                    .unwrap_or_default()
            };
            let b_keys: FxHashSet<String> = self
                .target
                .delta(t)
                .map(|d| d.updates().keys().cloned().collect())
                .unwrap_or_default();

            for (key, update) in a_updates {
                let current = self.target.content(t).field(&key).map(str::to_string);
                if current == update.new {
                    continue;
                }
                self.target
                    .content_mut(t)
                    .set_field(&key, update.new.as_deref());
                if let Some(d) = self.target.delta_mut(t) {
                    d.record_update(
                        key.clone(),
                        Update {
                            old: current,
                            new: update.new.clone(),
                        },
                    );
                }
                self.set_origin(t, ChangeOrigin::BranchA);
                self.log_edit(EditType::Update, t);

                if both_inserted || b_keys.contains(&key) {
                    let conflict = Conflict::new(
                        ConflictType::Update,
                        format!("both branches set {}", key),
                        self.target.path(t),
                        Resolution::BranchA,
                    )
                    .with_field(key)
                    .with_base_path(self.base_path(&self.target, t));
                    self.conflicts.queue(conflict);
                    self.set_state(t, MergeState::UpdateConflict);
                    self.lose_confidence(t, Confidence::CONTENT);
                } else {
                    self.set_state(t, MergeState::Updated);
                }
            }
        }
    }

    // -- phase 3 -----------------------------------------------------------

    fn merge_deletions(&mut self) {
        let kept: FxHashSet<usize> = self
            .source
            .nodes()
            .filter_map(|s| base_id(&self.source, s))
            .collect();
        let doomed: Vec<NodeId> = self
            .target
            .nodes()
            .skip(1)
            .filter(|&t| base_id(&self.target, t).is_some_and(|b| !kept.contains(&b)))
            .collect();

        for t in doomed {
            if !self.target.is_attached(t) {
                continue;
            }
            let Some(parent) = self.target.parent(t) else {
                continue;
            };
            let changed = self
                .target
                .preorder(t)
                .any(|d| !self.target.delta(d).is_some_and(DeltaInfo::is_nil));
            self.log_edit(EditType::Delete, t);
            if changed {
                let conflict = Conflict::new(
                    ConflictType::DeleteChange,
                    "deleted in branch A, changed in branch B",
                    self.target.path(t),
                    Resolution::Deleted,
                )
                .with_base_path(self.base_path(&self.target, t));
                self.conflicts.queue(conflict);
                self.set_state(t, MergeState::DeleteConflict);
            } else {
                self.set_state(t, MergeState::Deleted);
            }

            self.target.mark_subtree(t, DeltaType::Deletion);
            let subtree: Vec<NodeId> = self.target.preorder(t).collect();
            for d in subtree {
                self.set_origin(d, ChangeOrigin::BranchA);
            }
            if let Some(d) = self.target.delta_mut(parent) {
                d.push_placeholder(t);
            }
            self.target.detach(t);
        }
    }

    // -- bookkeeping -------------------------------------------------------

    fn finish(mut self) -> MergeResult {
        let attached: Vec<NodeId> = self.target.nodes().collect();
        for t in attached {
            let derived = match self.target.change(t) {
                DeltaType::Insertion | DeltaType::SubtreeInsertion => MergeState::Inserted,
                DeltaType::MoveTo => MergeState::Moved,
                _ if self.target.delta(t).is_some_and(DeltaInfo::is_update) => MergeState::Updated,
                _ => MergeState::NoChange,
            };
            self.set_state(t, derived);
        }

        for index in 0..self.target.arena_len() {
            let t = NodeId::from_index(index);
            let nil = self.target.delta(t).is_some_and(DeltaInfo::is_nil);
            if let Some(info) = self.target.merge_info_mut(t) {
                if nil && info.change_origin == ChangeOrigin::BranchB {
                    info.change_origin = ChangeOrigin::Unchanged;
                }
            }
        }

        let resolved = self.conflicts.resolve_all();
        for state in self.states.values_mut() {
            *state = state.resolved();
        }
        debug!(
            conflicts = resolved,
            edits = self.edits.edit_count(),
            "merged branches"
        );
        MergeResult {
            tree: self.target,
            conflicts: self.conflicts,
            edits: self.edits,
            states: self.states,
        }
    }

    fn move_conflict(&mut self, t: NodeId, text: &str, resolution: Resolution) {
        let conflict = Conflict::new(ConflictType::Move, text, self.target.path(t), resolution)
            .with_base_path(self.base_path(&self.target, t));
        self.conflicts.queue(conflict);
        self.set_state(t, MergeState::MoveConflict);
        self.lose_confidence(t, Confidence::PARENT | Confidence::POSITION);
    }

    fn set_state(&mut self, t: NodeId, state: MergeState) {
        let slot = self.states.entry(t).or_default();
        if state.rank() > slot.rank() {
            *slot = state;
        }
    }

    fn set_origin(&mut self, t: NodeId, origin: ChangeOrigin) {
        if let Some(info) = self.target.merge_info_mut(t) {
            info.change_origin = origin;
        }
    }

    fn lose_confidence(&mut self, t: NodeId, flags: Confidence) {
        if let Some(info) = self.target.merge_info_mut(t) {
            info.confidence.remove(flags);
        }
    }

    fn log_edit(&mut self, edit_type: EditType, t: NodeId) {
        let base_path = self.base_path(&self.target, t);
        self.edits.record(
            edit_type,
            self.target.path(t),
            base_path,
            ChangeOrigin::BranchA,
        );
    }

    fn base_path(&self, tree: &Tree, id: NodeId) -> Option<NodePath> {
        base_id(tree, id).and_then(|b| self.base_paths.get(b).cloned())
    }
}

fn base_id(tree: &Tree, id: NodeId) -> Option<usize> {
    tree.delta(id).and_then(DeltaInfo::base_node)
}

/// A merge copy of a delta tree with every node tagged with `origin`.
fn tagged(delta: &Tree, origin: ChangeOrigin) -> Tree {
    let mut tree = delta.to_merge();
    for index in 0..tree.arena_len() {
        if let Some(info) = tree.merge_info_mut(NodeId::from_index(index)) {
            info.change_origin = origin;
        }
    }
    tree
}

/// Pairs nodes sharing a base id, then lets bucketed matching pair up
/// content both branches inserted. Pairs that tie an inserted node to a
/// base node are discarded.
fn align(source: &Tree, target: &Tree, config: &DiffConfig) -> Matching {
    let by_base: FxHashMap<usize, NodeId> = target
        .nodes()
        .filter_map(|t| base_id(target, t).map(|b| (b, t)))
        .collect();
    let mut seed = Matching::new();
    for s in source.nodes() {
        if let Some(&t) = base_id(source, s).and_then(|b| by_base.get(&b)) {
            seed.match_new(s, t);
        }
    }

    let mut matching = BucketMatcher.build_matching(
        target,
        source,
        seed.clone(),
        &ProcessComparator,
        &config.thresholds,
    );
    matching.retain(|s, t| {
        seed.are_matched(t, s) || (base_id(source, s).is_none() && base_id(target, t).is_none())
    });
    for (s, t) in seed.pairs() {
        if !matching.has_new(s) && !matching.has_old(t) {
            matching.match_new(s, t);
        }
    }
    matching
}
