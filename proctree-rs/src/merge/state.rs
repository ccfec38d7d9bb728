//! Per-node merge states.

use std::fmt;

/// Where a node stands in the merge.
///
/// Every node starts `Unseen`. Detection moves it to one of the other
/// states; resolving conflicts maps each `*Conflict` state onto the
/// outcome the policy applied, so a finished merge holds no conflict
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeState {
    /// Not visited yet.
    #[default]
    Unseen,
    /// Matched across branches, neither branch changed it.
    NoChange,
    /// Matched, moved by one branch or by both to the same parent.
    Moved,
    /// Matched, fields updated by one branch or merged field by field.
    Updated,
    /// Matched, placed differently by both branches.
    MoveConflict,
    /// Matched, one field set to different values by both branches.
    UpdateConflict,
    /// Present in one branch only as an insertion.
    Inserted,
    /// Deleted by one branch, unchanged by the other.
    Deleted,
    /// Deleted by one branch, changed by the other.
    DeleteConflict,
}

impl MergeState {
    /// True for states awaiting resolution.
    pub fn is_conflict(self) -> bool {
        matches!(
            self,
            MergeState::MoveConflict | MergeState::UpdateConflict | MergeState::DeleteConflict
        )
    }

    /// The state after the resolution policy has run.
    pub fn resolved(self) -> MergeState {
        match self {
            MergeState::MoveConflict => MergeState::Moved,
            MergeState::UpdateConflict => MergeState::Updated,
            MergeState::DeleteConflict => MergeState::Deleted,
            other => other,
        }
    }

    /// Ordering used when several transitions hit one node: conflicts
    /// outrank changes, changes outrank no-ops.
    pub(crate) fn rank(self) -> u8 {
        match self {
            MergeState::Unseen => 0,
            MergeState::NoChange => 1,
            MergeState::Moved
            | MergeState::Updated
            | MergeState::Inserted
            | MergeState::Deleted => 2,
            MergeState::MoveConflict
            | MergeState::UpdateConflict
            | MergeState::DeleteConflict => 3,
        }
    }

    /// Upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            MergeState::Unseen => "UNSEEN",
            MergeState::NoChange => "MATCHED_NO_CHANGE",
            MergeState::Moved => "MATCHED_MOVED",
            MergeState::Updated => "MATCHED_UPDATED",
            MergeState::MoveConflict => "MATCHED_MOVE_CONFLICT",
            MergeState::UpdateConflict => "MATCHED_UPDATE_CONFLICT",
            MergeState::Inserted => "UNMATCHED_INSERTED",
            MergeState::Deleted => "UNMATCHED_DELETED",
            MergeState::DeleteConflict => "UNMATCHED_DELETE_CONFLICT",
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
