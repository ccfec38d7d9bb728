//! Child-index paths addressing nodes from the root.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A sequence of child indices from the root, rendered as `"0/2/1"`.
///
/// The root itself has the empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The root path.
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    /// Creates a path from child indices.
    pub fn new(segments: Vec<usize>) -> Self {
        NodePath(segments)
    }

    /// The child indices.
    pub fn segments(&self) -> &[usize] {
        &self.0
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Depth below the root.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The path of the parent, or `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        let (_, rest) = self.0.split_last()?;
        Some(NodePath(rest.to_vec()))
    }

    /// The last child index, or `None` for the root.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The path of this node's `index`-th child.
    pub fn child(&self, index: usize) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(index);
        NodePath(segments)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(segments: Vec<usize>) -> Self {
        NodePath(segments)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(NodePath::root());
        }
        s.split('/')
            .map(|seg| {
                seg.parse::<usize>()
                    .map_err(|_| Error::InvalidPath(s.to_string()))
            })
            .collect::<Result<Vec<_>>>()
            .map(NodePath)
    }
}
