//! Node dissimilarity for process models.
//!
//! [`ProcessComparator`] scores a pair of nodes between 0.0 (identical) and
//! 1.0 (unrelated). The score blends a label-specific content term with a
//! structural term that only looks at the parents' labels:
//!
//! ```text
//! compare = 0.9 * content + 0.1 * structure
//! ```
//!
//! The content term for calls and manipulates is driven by which data
//! variables a node reads and writes, so a call that keeps its endpoint but
//! stores its result elsewhere still scores as a partial change.

use std::collections::BTreeSet;

use crate::constants::{
    CONTENT_WEIGHT, DATA_PREFIX, DISPLAY_LABEL, ENDPOINT_ATTR, METHOD_LABEL, STRUCTURE_WEIGHT,
    WAIT_ATTR,
};
use crate::lcs::lcs_len;
use crate::node::NodeRef;

/// A pairwise node dissimilarity function.
pub trait Comparator {
    /// Returns a value in `[0, 1]`: 0 for identical nodes, 1 for unrelated ones.
    fn compare(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> f64;
}

/// The label-aware comparator for process models.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessComparator;

impl Comparator for ProcessComparator {
    fn compare(&self, a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
        CONTENT_WEIGHT * content_similarity(a, b) + STRUCTURE_WEIGHT * structural_similarity(a, b)
    }
}

/// 1.0 if both nodes have parents with different labels, else 0.0.
pub fn structural_similarity(a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
    match (a.parent(), b.parent()) {
        (Some(pa), Some(pb)) if pa.label() != pb.label() => 1.0,
        _ => 0.0,
    }
}

/// Label-specific content dissimilarity.
pub fn content_similarity(a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
    if a.label() != b.label() {
        return 1.0;
    }
    if a.fingerprint() == b.fingerprint() {
        return 0.0;
    }
    match a.label() {
        "call" => call_similarity(a, b),
        "manipulate" => manipulate_similarity(a, b),
        "parallel" => {
            if a.attr(WAIT_ATTR) != b.attr(WAIT_ATTR) {
                0.2
            } else {
                0.0
            }
        }
        "loop" | "alternative" => {
            let (va, vb) = (variables(a), variables(b));
            diff_ratio(&va.read, &vb.read).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn call_similarity(a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
    let endpoint = endpoint_dissimilarity(a, b);
    let (va, vb) = (variables(a), variables(b));
    let modified = diff_ratio(&va.written, &vb.written).unwrap_or(endpoint);
    let read = diff_ratio(&va.read, &vb.read).unwrap_or(endpoint);
    0.4 * endpoint + 0.4 * modified + 0.2 * read
}

fn manipulate_similarity(a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
    let (va, vb) = (variables(a), variables(b));
    let modified = diff_ratio(&va.written, &vb.written).unwrap_or(1.0);
    let read = diff_ratio(&va.read, &vb.read).unwrap_or(modified);
    0.7 * modified + 0.3 * read
}

/// Normalized LCS distance of the endpoints, adjusted by HTTP method and
/// display label.
fn endpoint_dissimilarity(a: NodeRef<'_>, b: NodeRef<'_>) -> f64 {
    let ea: Vec<char> = a.attr(ENDPOINT_ATTR).unwrap_or_default().chars().collect();
    let eb: Vec<char> = b.attr(ENDPOINT_ATTR).unwrap_or_default().chars().collect();
    let longest = ea.len().max(eb.len());
    let mut dist = if longest == 0 {
        0.0
    } else {
        1.0 - lcs_len(&ea, &eb) as f64 / longest as f64
    };

    let method = |n: NodeRef<'_>| n.property(METHOD_LABEL).and_then(|p| p.text()).map(str::to_string);
    if method(a) != method(b) {
        dist += (1.0 - dist) * 0.5;
    }
    match (display_label(a), display_label(b)) {
        (Some(la), Some(lb)) if !la.is_empty() && la == lb => dist *= 0.5,
        _ => {}
    }
    dist
}

fn display_label<'a>(n: NodeRef<'a>) -> Option<&'a str> {
    n.property(DISPLAY_LABEL)
        .and_then(|p| p.text())
        .or_else(|| n.attr(DISPLAY_LABEL))
}

/// `(|a \ b| + |b \ a|) / max(|a|, |b|)`, clamped to 1. `None` when both
/// sets are empty.
pub fn diff_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Option<f64> {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return None;
    }
    let sym = a.symmetric_difference(b).count();
    Some((sym as f64 / longest as f64).min(1.0))
}

/// Data variables a node reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    /// Variables whose value is used.
    pub read: BTreeSet<String>,
    /// Variables that are assigned.
    pub written: BTreeSet<String>,
}

/// Collects `data.<ident>` references from a node's text, attribute values
/// and property subtree.
pub fn variables(node: NodeRef<'_>) -> Variables {
    let mut vars = Variables::default();
    scan_node(node, &mut vars);
    for prop in node.property_descendants() {
        scan_node(prop, &mut vars);
    }
    vars
}

fn scan_node(node: NodeRef<'_>, vars: &mut Variables) {
    if let Some(text) = node.text() {
        scan(text, vars);
    }
    for (_, value) in node.content().attributes().iter() {
        scan(value, vars);
    }
}

const COMPOUND_ASSIGNMENTS: &[&str] = &["+=", "-=", "*=", "/=", "||=", "&&=", "<<"];

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scans source text for variable references.
fn scan(src: &str, vars: &mut Variables) {
    let mut from = 0;
    while let Some(found) = src[from..].find(DATA_PREFIX) {
        let start = from + found;
        let ident_start = start + DATA_PREFIX.len();
        from = ident_start;

        if src[..start].chars().next_back().is_some_and(is_ident_char) {
            continue;
        }
        let ident_len: usize = src[ident_start..]
            .chars()
            .take_while(|&c| is_ident_char(c))
            .map(char::len_utf8)
            .sum();
        if ident_len == 0 {
            continue;
        }
        let ident = &src[ident_start..ident_start + ident_len];
        from = ident_start + ident_len;

        let rest = src[from..].trim_start();
        if COMPOUND_ASSIGNMENTS.iter().any(|op| rest.starts_with(op)) {
            vars.written.insert(ident.to_string());
            vars.read.insert(ident.to_string());
        } else if rest.starts_with('=') && !rest.starts_with("==") && !rest.starts_with("=>")
            && !rest.starts_with("=~")
        {
            vars.written.insert(ident.to_string());
        } else {
            vars.read.insert(ident.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeContent, NodeId, Tree};

    fn call(t: &mut Tree, parent: NodeId, endpoint: &str) -> NodeId {
        t.add_child(parent, NodeContent::new("call").with_attr("endpoint", endpoint))
    }

    fn with_code(t: &mut Tree, node: NodeId, code: &str) {
        t.add_child(node, NodeContent::new("code").with_text(code));
    }

    #[test]
    fn test_scan_reads_and_writes() {
        let mut v = Variables::default();
        scan("data.x = data.y + 1; data.count += 1; data.a == 3", &mut v);
        assert!(v.written.contains("x"));
        assert!(v.written.contains("count"));
        assert!(v.read.contains("count"));
        assert!(v.read.contains("y"));
        assert!(v.read.contains("a"));
        assert!(!v.written.contains("a"));
        assert!(!v.read.contains("x"));
    }

    #[test]
    fn test_scan_ignores_embedded_prefix() {
        let mut v = Variables::default();
        scan("mydata.x = 1; data. = 2", &mut v);
        assert!(v.read.is_empty());
        assert!(v.written.is_empty());
    }

    #[test]
    fn test_diff_ratio() {
        let a: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["y", "z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(diff_ratio(&a, &b), Some(1.0));
        assert_eq!(diff_ratio(&a, &a), Some(0.0));
        assert_eq!(diff_ratio(&BTreeSet::new(), &BTreeSet::new()), None);
        let c: BTreeSet<String> = ["x"].iter().map(|s| s.to_string()).collect();
        assert_eq!(diff_ratio(&a, &c), Some(0.5));
    }

    #[test]
    fn test_identical_nodes_score_zero() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = call(&mut t, root, "http://example.org/a");
        let b = call(&mut t, root, "http://example.org/a");
        assert_eq!(ProcessComparator.compare(t.get(a), t.get(b)), 0.0);
    }

    #[test]
    fn test_different_labels_score_high() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = call(&mut t, root, "x");
        let b = t.add_child(root, NodeContent::new("manipulate"));
        assert!((ProcessComparator.compare(t.get(a), t.get(b)) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_structural_term() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let lp = t.add_child(root, NodeContent::new("loop"));
        let a = call(&mut t, root, "x");
        let b = call(&mut t, lp, "x");
        assert!((ProcessComparator.compare(t.get(a), t.get(b)) - 0.1).abs() < 1e-9);
        assert_eq!(structural_similarity(t.get(root), t.get(a)), 0.0);
    }

    #[test]
    fn test_similar_endpoints_score_low() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = call(&mut t, root, "http://example.org/services/orders");
        let b = call(&mut t, root, "http://example.org/services/order");
        let score = ProcessComparator.compare(t.get(a), t.get(b));
        assert!(score > 0.0 && score < 0.1, "score {}", score);
    }

    #[test]
    fn test_method_mismatch_penalized() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = call(&mut t, root, "http://example.org/a");
        let b = call(&mut t, root, "http://example.org/a");
        let pa = t.add_child(a, NodeContent::new("parameters"));
        t.add_child(pa, NodeContent::new("method").with_text(":get"));
        let pb = t.add_child(b, NodeContent::new("parameters"));
        t.add_child(pb, NodeContent::new("method").with_text(":post"));
        // endpoint 0 -> 0.5 after the method penalty, no variables
        let score = ProcessComparator.compare(t.get(a), t.get(b));
        assert!((score - 0.45).abs() < 1e-9, "score {}", score);
    }

    #[test]
    fn test_manipulate_variables() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = t.add_child(root, NodeContent::new("manipulate"));
        with_code(&mut t, a, "data.x = data.y");
        let b = t.add_child(root, NodeContent::new("manipulate"));
        with_code(&mut t, b, "data.x = data.y * 2");
        // same variable sets, different code
        assert_eq!(content_similarity(t.get(a), t.get(b)), 0.0);

        let c = t.add_child(root, NodeContent::new("manipulate"));
        with_code(&mut t, c, "data.z = data.y");
        assert!((content_similarity(t.get(a), t.get(c)) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_wait() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = t.add_child(root, NodeContent::new("parallel").with_attr("wait", "-1"));
        let b = t.add_child(root, NodeContent::new("parallel").with_attr("wait", "1"));
        assert!((content_similarity(t.get(a), t.get(b)) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_loop_conditions() {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = t.add_child(root, NodeContent::new("loop").with_attr("condition", "data.i < 3"));
        let b = t.add_child(root, NodeContent::new("loop").with_attr("condition", "data.i < 5"));
        let c = t.add_child(root, NodeContent::new("loop").with_attr("condition", "data.j < 5"));
        assert_eq!(content_similarity(t.get(a), t.get(b)), 0.0);
        assert_eq!(content_similarity(t.get(a), t.get(c)), 1.0);
    }
}
