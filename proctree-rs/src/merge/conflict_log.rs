//! Conflict logging for the merge algorithm.
//!
//! Conflicts are queued as they are detected and moved to the resolved
//! list once the fixed resolution policy has been applied. A finished
//! merge never leaves anything pending.

use std::fmt;
use std::io::Write;

use crate::node::NodePath;

/// Categories of conflicts between the two branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    /// Both branches set one field to different values.
    Update,
    /// Both branches placed one node differently.
    Move,
    /// One branch deleted a node the other changed.
    DeleteChange,
}

impl ConflictType {
    /// Returns the XML tag name for this conflict type.
    pub fn tag_name(&self) -> &'static str {
        match self {
            ConflictType::Update => "update",
            ConflictType::Move => "move",
            ConflictType::DeleteChange => "delete",
        }
    }
}

/// Which outcome a resolved conflict took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Branch A's change was kept.
    BranchA,
    /// Branch B's change was kept.
    BranchB,
    /// The node was removed.
    Deleted,
}

impl Resolution {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Resolution::BranchA => "branch-a",
            Resolution::BranchB => "branch-b",
            Resolution::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single conflict.
#[derive(Debug, Clone)]
pub struct Conflict {
    /// The type of conflict.
    pub conflict_type: ConflictType,
    /// Description of the conflict.
    pub text: String,
    /// Path of the node in the merged tree when the conflict was found, or
    /// in branch A for nodes the merged tree does not keep.
    pub merge_path: NodePath,
    /// Path of the originating node in the base tree, if it has one.
    pub base_path: Option<NodePath>,
    /// The contested field of an update conflict.
    pub field: Option<String>,
    /// Outcome chosen by the resolution policy.
    pub resolution: Resolution,
}

impl Conflict {
    /// Creates a conflict with the outcome the policy will apply.
    pub fn new(
        conflict_type: ConflictType,
        text: impl Into<String>,
        merge_path: NodePath,
        resolution: Resolution,
    ) -> Self {
        Conflict {
            conflict_type,
            text: text.into(),
            merge_path,
            base_path: None,
            field: None,
            resolution,
        }
    }

    /// Attaches the base-tree path.
    pub fn with_base_path(mut self, base_path: Option<NodePath>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Attaches the contested field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflict at /{}: {} (kept {})",
            self.conflict_type.tag_name(),
            self.merge_path,
            self.text,
            self.resolution
        )
    }
}

/// Log of conflicts encountered during merge.
#[derive(Debug, Default)]
pub struct ConflictLog {
    /// Conflicts detected but not yet resolved.
    pending: Vec<Conflict>,
    /// Conflicts resolved by policy.
    resolved: Vec<Conflict>,
}

impl ConflictLog {
    /// Creates a new empty conflict log.
    pub fn new() -> Self {
        ConflictLog::default()
    }

    /// Queues a detected conflict.
    pub fn queue(&mut self, conflict: Conflict) {
        self.pending.push(conflict);
    }

    /// Marks every pending conflict as resolved and returns how many were.
    pub fn resolve_all(&mut self) -> usize {
        let count = self.pending.len();
        self.resolved.append(&mut self.pending);
        count
    }

    /// Returns true if there are unresolved conflicts.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Conflicts awaiting resolution.
    pub fn pending(&self) -> &[Conflict] {
        &self.pending
    }

    /// Conflicts resolved by policy.
    pub fn resolved(&self) -> &[Conflict] {
        &self.resolved
    }

    /// Returns the number of resolved conflicts.
    pub fn conflict_count(&self) -> usize {
        self.resolved.len()
    }

    /// Counts resolved conflicts by type.
    pub fn count_by_type(&self, conflict_type: ConflictType) -> usize {
        self.resolved
            .iter()
            .filter(|c| c.conflict_type == conflict_type)
            .count()
    }

    /// Writes the conflict log as XML.
    pub fn write_xml<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writeln!(writer, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(writer, "<conflictlist>")?;

        if !self.pending.is_empty() {
            writeln!(writer, "  <pending>")?;
            for entry in &self.pending {
                write_entry(writer, entry, "    ")?;
            }
            writeln!(writer, "  </pending>")?;
        }

        if !self.resolved.is_empty() {
            writeln!(writer, "  <resolved>")?;
            for entry in &self.resolved {
                write_entry(writer, entry, "    ")?;
            }
            writeln!(writer, "  </resolved>")?;
        }

        writeln!(writer, "</conflictlist>")?;
        Ok(())
    }
}

/// Writes a single conflict entry as XML.
fn write_entry<W: Write>(writer: &mut W, entry: &Conflict, indent: &str) -> std::io::Result<()> {
    let tag = entry.conflict_type.tag_name();

    write!(writer, "{}<{} resolution=\"{}\"", indent, tag, entry.resolution)?;
    if let Some(field) = &entry.field {
        write!(writer, " field=\"{}\"", escape_xml(field))?;
    }
    writeln!(writer, ">")?;
    writeln!(writer, "{}  {}", indent, escape_xml(&entry.text))?;
    writeln!(
        writer,
        "{}  <node tree=\"merged\" path=\"/{}\" />",
        indent, entry.merge_path
    )?;
    if let Some(base) = &entry.base_path {
        writeln!(writer, "{}  <node tree=\"base\" path=\"/{}\" />", indent, base)?;
    }
    writeln!(writer, "{}</{}>", indent, tag)?;
    Ok(())
}

/// Escapes special characters in XML content.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
