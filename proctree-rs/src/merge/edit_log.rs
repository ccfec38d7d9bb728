//! Record of the changes replayed onto the merge target.
//!
//! Entries are appended in the order the merge applies them, each with the
//! branch it came from.

use std::io::Write;

use super::conflict_log::escape_xml;
use crate::node::{ChangeOrigin, NodePath};

/// What a replayed change did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditType {
    /// A node carried over from branch A.
    Insert,
    /// A field of a matched node overwritten.
    Update,
    /// A matched node re-parented or reordered.
    Move,
    /// A node removed from the target.
    Delete,
}

impl EditType {
    /// Element name used by [`EditLog::write_xml`].
    pub fn tag_name(self) -> &'static str {
        match self {
            EditType::Insert => "insert",
            EditType::Update => "update",
            EditType::Move => "move",
            EditType::Delete => "delete",
        }
    }
}

/// One replayed change.
#[derive(Debug, Clone)]
pub struct EditEntry {
    /// Kind of change.
    pub edit_type: EditType,
    /// Path in the merged tree right after the edit (before it, for deletes).
    pub path: NodePath,
    /// Path of the originating base node, if it has one.
    pub base_path: Option<NodePath>,
    /// The branch the edit came from.
    pub origin: ChangeOrigin,
}

/// Changes applied to the merge target, in application order.
#[derive(Debug, Default)]
pub struct EditLog {
    edits: Vec<EditEntry>,
}

impl EditLog {
    /// An empty log.
    pub fn new() -> Self {
        EditLog::default()
    }

    /// Appends an entry.
    pub fn record(
        &mut self,
        edit_type: EditType,
        path: NodePath,
        base_path: Option<NodePath>,
        origin: ChangeOrigin,
    ) {
        self.edits.push(EditEntry {
            edit_type,
            path,
            base_path,
            origin,
        });
    }

    /// Number of recorded changes.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// All entries, oldest first.
    pub fn edits(&self) -> &[EditEntry] {
        &self.edits
    }

    /// Number of entries of one kind.
    pub fn count_by_type(&self, edit_type: EditType) -> usize {
        self.edits
            .iter()
            .filter(|e| e.edit_type == edit_type)
            .count()
    }

    /// Writes the log as an `<edits>` document; paths are prefixed with `/`.
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(writer, "<edits>")?;

        for entry in &self.edits {
            write!(
                writer,
                "  <{} path=\"/{}\"",
                entry.edit_type.tag_name(),
                escape_xml(&entry.path.to_string())
            )?;
            if let Some(base) = &entry.base_path {
                write!(writer, " src=\"/{}\"", base)?;
            }
            writeln!(writer, " origin=\"{}\" />", entry.origin.code())?;
        }

        writeln!(writer, "</edits>")?;
        Ok(())
    }
}
