//! Edit script types.
//!
//! A [`Change`] addresses nodes by child-index path: `old_path` into the
//! tree before the change, `new_path` into the tree after it.

use std::collections::BTreeMap;
use std::fmt;

use crate::node::{NodePath, Tree, Update};

/// Kinds of changes in an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A single node whose descendants are placed by later changes.
    Insertion,
    /// A whole new subtree.
    SubtreeInsertion,
    /// A single node whose descendants were moved away or deleted.
    Deletion,
    /// A whole unmatched subtree.
    SubtreeDeletion,
    /// A node placed under a different parent or at a different position.
    Move,
    /// A node whose attributes, text or label changed.
    Update,
}

impl ChangeKind {
    /// Upper-case name used in the text form.
    pub fn name(self) -> &'static str {
        match self {
            ChangeKind::Insertion => "INSERTION",
            ChangeKind::SubtreeInsertion => "SUBTREE_INSERTION",
            ChangeKind::Deletion => "DELETION",
            ChangeKind::SubtreeDeletion => "SUBTREE_DELETION",
            ChangeKind::Move => "MOVE",
            ChangeKind::Update => "UPDATE",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One edit operation.
#[derive(Debug, Clone)]
pub struct Change {
    /// The kind of change.
    pub kind: ChangeKind,
    /// Path in the old tree (deletions, moves, updates).
    pub old_path: Option<NodePath>,
    /// Path in the new tree (insertions, moves).
    pub new_path: Option<NodePath>,
    /// Inserted content, or the new content of an updated node.
    pub payload: Option<Tree>,
    /// Field changes of an update, keyed like [`crate::node::DeltaInfo::updates`].
    pub updates: BTreeMap<String, Update>,
}

impl Change {
    fn new(kind: ChangeKind, old_path: Option<NodePath>, new_path: Option<NodePath>) -> Self {
        Change {
            kind,
            old_path,
            new_path,
            payload: None,
            updates: BTreeMap::new(),
        }
    }

    /// Inserts the single-node `payload` at `new_path`.
    pub fn insertion(new_path: NodePath, payload: Tree) -> Self {
        Change {
            payload: Some(payload),
            ..Change::new(ChangeKind::Insertion, None, Some(new_path))
        }
    }

    /// Inserts the subtree `payload` at `new_path`.
    pub fn subtree_insertion(new_path: NodePath, payload: Tree) -> Self {
        Change {
            payload: Some(payload),
            ..Change::new(ChangeKind::SubtreeInsertion, None, Some(new_path))
        }
    }

    /// Deletes the node at `old_path`.
    pub fn deletion(old_path: NodePath) -> Self {
        Change::new(ChangeKind::Deletion, Some(old_path), None)
    }

    /// Deletes the subtree at `old_path`.
    pub fn subtree_deletion(old_path: NodePath) -> Self {
        Change::new(ChangeKind::SubtreeDeletion, Some(old_path), None)
    }

    /// Moves the node at `old_path` to `new_path`.
    pub fn moved(old_path: NodePath, new_path: NodePath) -> Self {
        Change::new(ChangeKind::Move, Some(old_path), Some(new_path))
    }

    /// Updates the node at `old_path`.
    pub fn update(old_path: NodePath, payload: Tree, updates: BTreeMap<String, Update>) -> Self {
        Change {
            payload: Some(payload),
            updates,
            ..Change::new(ChangeKind::Update, Some(old_path), None)
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = |p: &Option<NodePath>| p.as_ref().map(ToString::to_string).unwrap_or_default();
        write!(f, "{}", self.kind)?;
        match self.kind {
            ChangeKind::Insertion | ChangeKind::SubtreeInsertion => {
                write!(f, " {}", path(&self.new_path))?;
                if let Some(payload) = &self.payload {
                    write!(f, " <{}>", payload.label(payload.root()))?;
                    if self.kind == ChangeKind::SubtreeInsertion {
                        write!(f, " ({} nodes)", payload.len())?;
                    }
                }
            }
            ChangeKind::Deletion | ChangeKind::SubtreeDeletion => {
                write!(f, " {}", path(&self.old_path))?;
            }
            ChangeKind::Move => {
                write!(f, " {} -> {}", path(&self.old_path), path(&self.new_path))?;
            }
            ChangeKind::Update => {
                write!(f, " {}", path(&self.old_path))?;
                for (key, update) in &self.updates {
                    write!(
                        f,
                        " {}: {} -> {}",
                        key,
                        quoted(update.old.as_deref()),
                        quoted(update.new.as_deref())
                    )?;
                }
            }
        }
        Ok(())
    }
}

fn quoted(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => "-".to_string(),
    }
}

/// An ordered list of changes.
#[derive(Debug, Clone, Default)]
pub struct EditScript {
    changes: Vec<Change>,
}

impl EditScript {
    /// Creates an empty script.
    pub fn new() -> Self {
        EditScript::default()
    }

    /// Appends a change.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// True if the script changes nothing.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The changes in application order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Iterates over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Number of changes of one kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            writeln!(f, "{}", change)?;
        }
        Ok(())
    }
}
