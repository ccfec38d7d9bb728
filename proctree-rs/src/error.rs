//! Error types for proctree-merge.

use thiserror::Error;

/// Result type alias for proctree-merge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while diffing, patching or reading trees.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// An edit script addressed a node that does not exist in the tree.
    #[error("edit script not applicable to tree: {0}")]
    NotApplicable(String),

    /// A node path string could not be parsed.
    #[error("invalid node path: {0}")]
    InvalidPath(String),

    /// A matching algorithm name that is not recognized.
    #[error("unknown matching algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A similarity threshold outside `[0, 1]`.
    #[error("invalid {name} threshold {value}: expected a value in [0, 1]")]
    InvalidThreshold {
        /// Which threshold was rejected.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
