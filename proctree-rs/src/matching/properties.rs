//! Propagation of matches into property subtrees.

use tracing::debug;

use super::Matching;
use crate::node::{NodeId, Tree};

/// Matches the property children of every matched control-flow pair by
/// label, recursively. Already matched nodes are left alone.
pub(crate) fn propagate(old: &Tree, new: &Tree, matching: &mut Matching) {
    let mut count = 0;
    for (n, o) in matching.pairs() {
        if new.is_control_flow(n) && old.is_control_flow(o) {
            count += match_children(old, new, o, n, matching);
        }
    }
    debug!(count, "propagated property matches");
}

fn match_children(old: &Tree, new: &Tree, o: NodeId, n: NodeId, matching: &mut Matching) -> usize {
    let mut count = 0;
    for &nc in new.children(n) {
        if new.is_control_flow(nc) || matching.has_new(nc) {
            continue;
        }
        let label = new.label(nc);
        let found = old
            .children(o)
            .iter()
            .copied()
            .find(|&oc| old.is_property(oc) && !matching.has_old(oc) && old.label(oc) == label);
        if let Some(oc) = found {
            matching.match_new(nc, oc);
            count += 1 + match_children(old, new, oc, nc, matching);
        }
    }
    count
}
