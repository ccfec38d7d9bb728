//! proctree-merge - Structural diff and three-way merge for process trees
//!
//! This library compares versions of a process model (a labeled, ordered
//! tree of control-flow and property nodes), describes their differences
//! as an edit script, renders them as an annotated delta tree and merges
//! two independently edited copies of one base model.
//!
//! # Overview
//!
//! 1. A [`Comparator`] scores how dissimilar two nodes are.
//! 2. A [`Matcher`] correlates the nodes of an old and a new tree under
//!    similarity [`Thresholds`]. Five strategies are available through
//!    [`MatchingAlgorithm`], one of them an optimal assignment.
//! 3. [`diff_trees`] turns a matching into an [`EditScript`] of insertions,
//!    deletions, moves and updates addressed by child-index paths.
//! 4. [`patch`] applies a script to a copy of the old tree and returns a
//!    delta tree where every node carries its change kind, field updates
//!    and move correlation ids.
//! 5. [`merge_trees`] aligns the delta trees of two branches through their
//!    base-node ids, detects update, move and delete-vs-change conflicts and
//!    resolves them by a fixed policy.
//!
//! # Example
//!
//! ```
//! use proctree_merge::{diff_trees, parse_str, DiffConfig, MatchingAlgorithm, Thresholds};
//!
//! let old = parse_str(r#"<description><call endpoint="X" /></description>"#).unwrap();
//! let new = parse_str(r#"<description><call endpoint="Y" /></description>"#).unwrap();
//! let thresholds = Thresholds::new(0.95, 0.95).unwrap();
//! let config = DiffConfig::new(thresholds, MatchingAlgorithm::Bucket);
//! let result = diff_trees(&old, &new, &config);
//! assert_eq!(result.script.to_string(), "UPDATE 0 endpoint: \"X\" -> \"Y\"\n");
//! ```

pub mod comparator;
pub mod config;
pub mod constants;
pub mod diff;
pub mod error;
pub mod lcs;
pub mod matching;
pub mod merge;
pub mod node;
pub mod render;
pub mod xml;

// Re-export commonly used types
pub use comparator::{Comparator, ProcessComparator};
pub use config::{DiffConfig, Thresholds};
pub use error::{Error, Result};
pub use matching::{match_trees, Matcher, Matching, MatchingAlgorithm};
pub use node::{
    ChangeOrigin, Confidence, DeltaInfo, DeltaType, MergeInfo, NodeContent, NodeId, NodeKind,
    NodePath, NodeRef, Tree, Update,
};
pub use render::render_tree;
pub use xml::{parse_file, parse_str, print_to_string, print_to_string_pretty, XmlParser, XmlPrinter};

// Re-export diff types
pub use diff::{
    delta_tree, diff_trees, generate, patch, resolve_placeholders, Change, ChangeKind, Diff,
    DiffResult, EditScript,
};

// Re-export merge types
pub use merge::{
    merge_trees, Conflict, ConflictLog, ConflictType, EditLog, EditType, Merge, MergeResult,
    MergeState, Resolution,
};
