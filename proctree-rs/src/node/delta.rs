//! Change annotations carried by delta-tree nodes.

use std::collections::BTreeMap;
use std::fmt;

use super::NodeId;

/// The kind of change recorded on a delta node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeltaType {
    /// Unchanged.
    #[default]
    Nil,
    /// Inserted node whose descendants may be matched elsewhere.
    Insertion,
    /// Root of an entirely new subtree.
    SubtreeInsertion,
    /// Deleted node.
    Deletion,
    /// Root of an entirely deleted subtree.
    SubtreeDeletion,
    /// Moved node at its new position.
    MoveTo,
    /// Placeholder left at a moved node's old position.
    MoveFrom,
    /// Node whose fields changed in place.
    Update,
}

impl DeltaType {
    /// Upper-case name used in scripts and renderings.
    pub fn name(self) -> &'static str {
        match self {
            DeltaType::Nil => "NIL",
            DeltaType::Insertion => "INSERTION",
            DeltaType::SubtreeInsertion => "SUBTREE_INSERTION",
            DeltaType::Deletion => "DELETION",
            DeltaType::SubtreeDeletion => "SUBTREE_DELETION",
            DeltaType::MoveTo => "MOVE_TO",
            DeltaType::MoveFrom => "MOVE_FROM",
            DeltaType::Update => "UPDATE",
        }
    }

    /// Returns true for both insertion kinds.
    pub fn is_insertion(self) -> bool {
        matches!(self, DeltaType::Insertion | DeltaType::SubtreeInsertion)
    }

    /// Returns true for both deletion kinds.
    pub fn is_deletion(self) -> bool {
        matches!(self, DeltaType::Deletion | DeltaType::SubtreeDeletion)
    }

    /// Returns true for both move kinds.
    pub fn is_move(self) -> bool {
        matches!(self, DeltaType::MoveTo | DeltaType::MoveFrom)
    }
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single field change. `None` means the field was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Value before the change.
    pub old: Option<String>,
    /// Value after the change.
    pub new: Option<String>,
}

impl Update {
    /// Creates an update from borrowed values.
    pub fn new(old: Option<&str>, new: Option<&str>) -> Self {
        Update {
            old: old.map(str::to_string),
            new: new.map(str::to_string),
        }
    }
}

/// Per-node delta annotation.
#[derive(Debug, Clone, Default)]
pub struct DeltaInfo {
    /// Structural change kind.
    change: DeltaType,
    /// Field updates keyed by attribute name, `"text"` or `"#label"`.
    updates: BTreeMap<String, Update>,
    /// Detached nodes shown at this node for visualization.
    placeholders: Vec<NodeId>,
    /// Pre-order index of the originating base-tree node.
    base_node: Option<usize>,
    /// Correlates a MOVE_TO node with its MOVE_FROM placeholder.
    move_id: Option<u32>,
    /// Child index this node had in its parent before any change.
    origin_index: Option<usize>,
}

impl DeltaInfo {
    /// Creates an annotation with the given change kind.
    pub fn new(change: DeltaType) -> Self {
        DeltaInfo {
            change,
            ..DeltaInfo::default()
        }
    }

    /// Creates an unchanged annotation linked to a base node.
    pub fn from_base(base_node: usize) -> Self {
        DeltaInfo {
            base_node: Some(base_node),
            ..DeltaInfo::default()
        }
    }

    /// The structural change kind.
    pub fn change(&self) -> DeltaType {
        self.change
    }

    /// Sets the structural change kind.
    pub fn set_change(&mut self, change: DeltaType) {
        self.change = change;
    }

    /// True when any field was updated.
    pub fn is_update(&self) -> bool {
        !self.updates.is_empty()
    }

    /// True when the node carries no change at all.
    pub fn is_nil(&self) -> bool {
        self.change == DeltaType::Nil && !self.is_update()
    }

    /// Field updates.
    pub fn updates(&self) -> &BTreeMap<String, Update> {
        &self.updates
    }

    /// Records a field change.
    ///
    /// Repeated updates to one field keep the first old value; an entry
    /// that ends up unchanged is dropped. An unchanged node becomes
    /// [`DeltaType::Update`].
    pub fn record_update(&mut self, key: impl Into<String>, update: Update) {
        let key = key.into();
        let merged = match self.updates.remove(&key) {
            Some(prev) => Update {
                old: prev.old,
                new: update.new,
            },
            None => update,
        };
        if merged.old != merged.new {
            self.updates.insert(key, merged);
        }
        if self.change == DeltaType::Nil && self.is_update() {
            self.change = DeltaType::Update;
        } else if self.change == DeltaType::Update && !self.is_update() {
            self.change = DeltaType::Nil;
        }
    }

    /// Placeholder nodes, in the order they were recorded.
    pub fn placeholders(&self) -> &[NodeId] {
        &self.placeholders
    }

    /// Adds a placeholder.
    pub fn push_placeholder(&mut self, node: NodeId) {
        self.placeholders.push(node);
    }

    /// Removes and returns all placeholders.
    pub fn take_placeholders(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.placeholders)
    }

    /// The originating base-tree node, if traceable.
    pub fn base_node(&self) -> Option<usize> {
        self.base_node
    }

    /// Links this node to a base-tree node.
    pub fn set_base_node(&mut self, base_node: Option<usize>) {
        self.base_node = base_node;
    }

    /// The move-correlation id.
    pub fn move_id(&self) -> Option<u32> {
        self.move_id
    }

    /// Sets the move-correlation id.
    pub fn set_move_id(&mut self, move_id: Option<u32>) {
        self.move_id = move_id;
    }

    /// Child index before any change was applied.
    pub fn origin_index(&self) -> Option<usize> {
        self.origin_index
    }

    /// Sets the original child index.
    pub fn set_origin_index(&mut self, index: Option<usize>) {
        self.origin_index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_flags() {
        let mut d = DeltaInfo::default();
        assert!(d.is_nil());
        assert!(!d.is_update());

        d.record_update("endpoint", Update::new(Some("X"), Some("Y")));
        assert!(d.is_update());
        assert!(!d.is_nil());
        assert_eq!(d.change(), DeltaType::Update);
    }

    #[test]
    fn test_repeated_update_keeps_first_old() {
        let mut d = DeltaInfo::default();
        d.record_update("a", Update::new(Some("1"), Some("2")));
        d.record_update("a", Update::new(Some("2"), Some("3")));
        assert_eq!(d.updates()["a"], Update::new(Some("1"), Some("3")));

        // Reverting drops the entry and the node is unchanged again.
        d.record_update("a", Update::new(Some("3"), Some("1")));
        assert!(d.updates().is_empty());
        assert!(d.is_nil());
    }

    #[test]
    fn test_structural_kind_survives_update() {
        let mut d = DeltaInfo::new(DeltaType::MoveTo);
        d.record_update("a", Update::new(None, Some("x")));
        assert_eq!(d.change(), DeltaType::MoveTo);
        assert!(d.is_update());
    }

    #[test]
    fn test_kind_predicates() {
        assert!(DeltaType::SubtreeInsertion.is_insertion());
        assert!(DeltaType::Deletion.is_deletion());
        assert!(DeltaType::MoveFrom.is_move());
        assert!(!DeltaType::Update.is_move());
        assert_eq!(DeltaType::SubtreeDeletion.to_string(), "SUBTREE_DELETION");
    }
}
