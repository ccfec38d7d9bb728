//! Edit scripts and delta trees.
//!
//! [`diff_trees`] matches two trees and derives the [`EditScript`] that
//! turns the old one into the new one. [`patch`] applies a script to a
//! copy of the old tree and yields the delta tree, annotated with what
//! changed where.

mod change;
mod generator;
mod patch;

pub use change::{Change, ChangeKind, EditScript};
pub use generator::{generate, Diff};
pub use patch::{patch, resolve_placeholders};

use tracing::debug;

use crate::config::DiffConfig;
use crate::error::Result;
use crate::matching::{match_trees, Matching};
use crate::node::Tree;

/// Result of diffing two trees.
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Node correspondence the script was derived from.
    pub matching: Matching,
    /// Changes turning the old tree into the new one.
    pub script: EditScript,
}

/// Matches `old` against `new` and derives the edit script.
pub fn diff_trees(old: &Tree, new: &Tree, config: &DiffConfig) -> DiffResult {
    let matching = match_trees(old, new, config);
    let diff = Diff::new(old, new, &matching);
    let script = diff.generate();
    debug!(
        algorithm = %config.algorithm,
        matched = diff.matching().len(),
        changes = script.len(),
        "diffed trees"
    );
    DiffResult {
        matching: diff.matching().clone(),
        script,
    }
}

/// Diffs `old` against `new` and returns the standard delta tree.
pub fn delta_tree(old: &Tree, new: &Tree, config: &DiffConfig) -> Result<Tree> {
    let DiffResult { script, .. } = diff_trees(old, new, config);
    patch(old, &script)
}
