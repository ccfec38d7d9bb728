//! Provenance and confidence carried by merged nodes.

use bitflags::bitflags;

/// Which branch produced a node's change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ChangeOrigin {
    /// Present in the base and unchanged by both branches.
    #[default]
    Unchanged = 0,
    /// Changed by branch A.
    BranchA = 1,
    /// Changed by branch B.
    BranchB = 2,
}

impl ChangeOrigin {
    /// Numeric tag used in serialized output.
    pub fn code(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Aspects of a merged node the merge is certain about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Confidence: u8 {
        /// Content was not subject to a conflict.
        const CONTENT = 1;
        /// Parent was not subject to a conflict.
        const PARENT = 2;
        /// Position among siblings was not subject to a conflict.
        const POSITION = 4;
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::all()
    }
}

/// Merge annotation of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeInfo {
    /// Provenance tag.
    pub change_origin: ChangeOrigin,
    /// Confidence flags.
    pub confidence: Confidence,
}

impl MergeInfo {
    /// Creates an annotation with full confidence.
    pub fn new(change_origin: ChangeOrigin) -> Self {
        MergeInfo {
            change_origin,
            confidence: Confidence::all(),
        }
    }

    /// True if content is certain.
    pub fn content_confident(&self) -> bool {
        self.confidence.contains(Confidence::CONTENT)
    }

    /// True if the parent is certain.
    pub fn parent_confident(&self) -> bool {
        self.confidence.contains(Confidence::PARENT)
    }

    /// True if the sibling position is certain.
    pub fn position_confident(&self) -> bool {
        self.confidence.contains(Confidence::POSITION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_confident() {
        let info = MergeInfo::default();
        assert_eq!(info.change_origin, ChangeOrigin::Unchanged);
        assert!(info.content_confident());
        assert!(info.parent_confident());
        assert!(info.position_confident());
    }

    #[test]
    fn test_clear_flags() {
        let mut info = MergeInfo::new(ChangeOrigin::BranchA);
        info.confidence.remove(Confidence::PARENT | Confidence::POSITION);
        assert!(info.content_confident());
        assert!(!info.parent_confident());
        assert!(!info.position_confident());
        assert_eq!(info.change_origin.code(), 1);
    }
}
