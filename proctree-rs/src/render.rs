//! ASCII rendering of delta and merge trees.
//!
//! One line per node with box-drawing branches:
//!
//! ```text
//! description
//! ├── call endpoint="Y" [UPDATE endpoint: "X" -> "Y"]
//! └── call endpoint="b" [MOVE_TO #0]
//! ```

use std::fmt::{self, Write};

use crate::node::{ChangeOrigin, NodeId, Tree};

/// Longest text payload shown before it is cut off.
const MAX_TEXT: usize = 40;

/// Renders a tree to a string.
///
/// Only attached children are drawn, so pass a tree with resolved
/// placeholders to see deletions and move origins.
pub fn render_tree(tree: &Tree) -> String {
    let mut out = String::new();
    let _ = write_tree(&mut out, tree);
    out
}

/// Renders a tree into any formatter sink.
pub fn write_tree<W: Write>(out: &mut W, tree: &Tree) -> fmt::Result {
    let root = tree.root();
    write_line(out, tree, root)?;
    write_children(out, tree, root, "")
}

fn write_children<W: Write>(out: &mut W, tree: &Tree, id: NodeId, prefix: &str) -> fmt::Result {
    let children = tree.children(id);
    for (i, &child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write!(out, "{}{}", prefix, branch)?;
        write_line(out, tree, child)?;
        write_children(out, tree, child, &format!("{}{}", prefix, indent))?;
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, tree: &Tree, id: NodeId) -> fmt::Result {
    let content = tree.content(id);
    write!(out, "{}", content.label())?;
    for (name, value) in content.attributes().iter() {
        write!(out, " {}={:?}", name, value)?;
    }
    if let Some(text) = content.text() {
        write!(out, " {:?}", shorten(text))?;
    }

    if let Some(delta) = tree.delta(id) {
        if !delta.is_nil() {
            write!(out, " [{}", delta.change())?;
            for (key, update) in delta.updates() {
                write!(
                    out,
                    " {}: {} -> {}",
                    key,
                    shown(update.old.as_deref()),
                    shown(update.new.as_deref())
                )?;
            }
            if delta.change().is_move() {
                if let Some(move_id) = delta.move_id() {
                    write!(out, " #{}", move_id)?;
                }
            }
            write!(out, "]")?;
        }
    }

    if let Some(info) = tree.merge_info(id) {
        match info.change_origin {
            ChangeOrigin::Unchanged => {}
            ChangeOrigin::BranchA => write!(out, " (a)")?,
            ChangeOrigin::BranchB => write!(out, " (b)")?,
        }
        if !info.content_confident() {
            write!(out, " (?)")?;
        }
    }
    writeln!(out)
}

fn shown(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{:?}", shorten(v)),
        None => "-".to_string(),
    }
}

fn shorten(text: &str) -> String {
    let single: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single.chars().count() <= MAX_TEXT {
        single
    } else {
        let cut: String = single.chars().take(MAX_TEXT).collect();
        format!("{}...", cut)
    }
}
