//! Arena-backed process trees.
//!
//! A [`Tree`] owns every node it ever allocated in a flat arena addressed by
//! [`NodeId`]. Parent links are ids rather than references, so detaching a
//! node only unlinks it: the node stays in the arena and can be re-attached
//! elsewhere or kept as a placeholder. Change annotations live in the
//! per-node [`NodeKind`], which distinguishes plain, delta and merge trees.

mod content;
mod delta;
mod merge_info;
mod path;

pub use content::{is_control_flow, Attributes, NodeContent};
pub use delta::{DeltaInfo, DeltaType, Update};
pub use merge_info::{ChangeOrigin, Confidence, MergeInfo};
pub use path::NodePath;

use std::fmt;

use md5::{Digest, Md5};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// Index of a node inside its tree's arena.
///
/// Ids are only meaningful for the tree that allocated them. Children are
/// always allocated after their parent, so a larger id never belongs to an
/// ancestor of a smaller one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind-specific data for nodes.
#[derive(Debug, Clone, Default)]
pub enum NodeKind {
    /// A node of a parsed or generated tree.
    #[default]
    Plain,
    /// A node of a delta tree.
    Delta(DeltaInfo),
    /// A node of a merged tree.
    Merge(DeltaInfo, MergeInfo),
}

impl NodeKind {
    /// Delta annotation, present for delta and merge nodes.
    pub fn delta(&self) -> Option<&DeltaInfo> {
        match self {
            NodeKind::Plain => None,
            NodeKind::Delta(d) | NodeKind::Merge(d, _) => Some(d),
        }
    }

    /// Mutable delta annotation.
    pub fn delta_mut(&mut self) -> Option<&mut DeltaInfo> {
        match self {
            NodeKind::Plain => None,
            NodeKind::Delta(d) | NodeKind::Merge(d, _) => Some(d),
        }
    }

    /// Merge annotation, present for merge nodes only.
    pub fn merge(&self) -> Option<&MergeInfo> {
        match self {
            NodeKind::Merge(_, m) => Some(m),
            _ => None,
        }
    }

    /// Mutable merge annotation.
    pub fn merge_mut(&mut self) -> Option<&mut MergeInfo> {
        match self {
            NodeKind::Merge(_, m) => Some(m),
            _ => None,
        }
    }

    /// An empty annotation of the same flavor.
    fn fresh(&self) -> NodeKind {
        match self {
            NodeKind::Plain => NodeKind::Plain,
            NodeKind::Delta(_) => NodeKind::Delta(DeltaInfo::default()),
            NodeKind::Merge(..) => NodeKind::Merge(DeltaInfo::default(), MergeInfo::default()),
        }
    }
}

/// The data of a node in the arena.
#[derive(Debug, Clone)]
pub struct NodeInner {
    /// Label, attributes and text.
    content: NodeContent,
    /// Attached children in order.
    children: Vec<NodeId>,
    /// Parent node, `None` for the root and for detached nodes.
    parent: Option<NodeId>,
    /// Zero-based position among siblings.
    child_pos: usize,
    /// Kind-specific annotation.
    kind: NodeKind,
}

impl NodeInner {
    fn new(content: NodeContent, kind: NodeKind) -> Self {
        NodeInner {
            content,
            children: Vec::new(),
            parent: None,
            child_pos: 0,
            kind,
        }
    }

    /// Returns the content of this node.
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// Returns a mutable reference to the content.
    pub fn content_mut(&mut self) -> &mut NodeContent {
        &mut self.content
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        self.content.label()
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the child at the given index.
    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    /// Returns the parent.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Returns the position among siblings.
    pub fn child_pos(&self) -> usize {
        self.child_pos
    }

    /// Returns the node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns a mutable reference to the node kind.
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }
}

/// An ordered, labeled tree stored in an arena.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeInner>,
    root: NodeId,
}

impl Tree {
    /// Creates a plain tree consisting of a single root.
    pub fn new(root: NodeContent) -> Self {
        Tree::with_kind(root, NodeKind::Plain)
    }

    /// Creates a tree whose root has the given kind. Nodes added later
    /// through [`Tree::add_child`] take the same flavor.
    pub fn with_kind(root: NodeContent, kind: NodeKind) -> Self {
        Tree {
            nodes: vec![NodeInner::new(root, kind)],
            root: NodeId(0),
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn node(&self, id: NodeId) -> &NodeInner {
        &self.nodes[id.index()]
    }

    /// Returns a node mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeInner {
        &mut self.nodes[id.index()]
    }

    /// Returns a borrowed view of a node.
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes reachable from the root.
    pub fn len(&self) -> usize {
        self.preorder(self.root).count()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Content shortcut.
    pub fn content(&self, id: NodeId) -> &NodeContent {
        &self.node(id).content
    }

    /// Mutable content shortcut.
    pub fn content_mut(&mut self, id: NodeId) -> &mut NodeContent {
        &mut self.node_mut(id).content
    }

    /// Label shortcut.
    pub fn label(&self, id: NodeId) -> &str {
        self.node(id).label()
    }

    /// Children shortcut.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Parent shortcut.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    // -- structure ---------------------------------------------------------

    /// Allocates a detached node.
    pub fn alloc(&mut self, content: NodeContent, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(NodeInner::new(content, kind));
        id
    }

    /// Allocates a node of the parent's flavor and appends it.
    pub fn add_child(&mut self, parent: NodeId, content: NodeContent) -> NodeId {
        let kind = self.node(parent).kind.fresh();
        let id = self.alloc(content, kind);
        self.append_child(parent, id);
        id
    }

    /// Attaches a detached node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.node(parent).children.len();
        self.insert_child(parent, index, child);
    }

    /// Attaches a detached node at `index` among `parent`'s children.
    ///
    /// # Panics
    ///
    /// Panics if `index` exceeds the child count.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        debug_assert!(self.node(child).parent.is_none(), "node is still attached");
        debug_assert!(child != self.root);
        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
        self.renumber(parent, index);
    }

    /// Unlinks a node from its parent. The subtree stays in the arena.
    /// Does nothing for the root or an already detached node.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let pos = self.node(id).child_pos;
        self.nodes[parent.index()].children.remove(pos);
        let node = self.node_mut(id);
        node.parent = None;
        node.child_pos = 0;
        self.renumber(parent, pos);
    }

    fn renumber(&mut self, parent: NodeId, from: usize) {
        let tail = self.nodes[parent.index()].children[from..].to_vec();
        for (offset, child) in tail.into_iter().enumerate() {
            self.nodes[child.index()].child_pos = from + offset;
        }
    }

    /// Parent chain of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(id).parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.node(p).parent;
        }
        out
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.node(n).parent;
        }
        false
    }

    /// True if the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_ancestor_or_self(self.root, id)
    }

    /// Number of edges between the node and the top of its subtree.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).len()
    }

    /// Pre-order traversal of the subtree rooted at `id`.
    pub fn preorder(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Pre-order traversal of the whole tree.
    pub fn nodes(&self) -> Preorder<'_> {
        self.preorder(self.root)
    }

    /// Pre-order position of every attached node.
    pub fn preorder_index(&self) -> FxHashMap<NodeId, usize> {
        self.nodes().enumerate().map(|(i, id)| (id, i)).collect()
    }

    /// Number of nodes in the subtree rooted at `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.preorder(id).count()
    }

    /// Child-index path of a node. Detached nodes get the path from the
    /// top of their detached subtree.
    pub fn path(&self, id: NodeId) -> NodePath {
        let mut segments = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.node(cur).parent {
            segments.push(self.node(cur).child_pos);
            cur = parent;
        }
        segments.reverse();
        NodePath::new(segments)
    }

    /// Walks a path from the root.
    pub fn resolve(&self, path: &NodePath) -> Result<NodeId> {
        let mut cur = self.root;
        for (depth, &seg) in path.segments().iter().enumerate() {
            cur = self.node(cur).child(seg).ok_or_else(|| {
                Error::NotApplicable(format!(
                    "path {} indexes child {} at depth {} of a node with {} children",
                    path,
                    seg,
                    depth,
                    self.node(cur).child_count()
                ))
            })?;
        }
        Ok(cur)
    }

    // -- classification ----------------------------------------------------

    /// True for control-flow nodes.
    pub fn is_control_flow(&self, id: NodeId) -> bool {
        self.content(id).is_control_flow()
    }

    /// True for property nodes.
    pub fn is_property(&self, id: NodeId) -> bool {
        !self.is_control_flow(id)
    }

    /// True if any child is a control-flow node.
    pub fn has_control_flow_children(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|&c| self.is_control_flow(c))
    }

    /// Control-flow node without control-flow children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.is_control_flow(id) && !self.has_control_flow_children(id)
    }

    /// Control-flow node with at least one control-flow child.
    pub fn is_inner(&self, id: NodeId) -> bool {
        self.is_control_flow(id) && self.has_control_flow_children(id)
    }

    /// Attached leaves in pre-order, excluding the root.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|&id| id != self.root && self.is_leaf(id))
            .collect()
    }

    /// Attached inner nodes in pre-order, excluding the root.
    pub fn inner_nodes(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|&id| id != self.root && self.is_inner(id))
            .collect()
    }

    /// Control-flow nodes strictly below `id`, in pre-order.
    pub fn control_flow_descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.preorder(id)
            .skip(1)
            .filter(|&n| self.is_control_flow(n))
            .collect()
    }

    /// Property nodes hanging off `id`, in pre-order. Does not descend into
    /// control-flow children.
    pub fn property_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            if self.is_control_flow(n) {
                continue;
            }
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// MD5 digest of a node together with its property subtree.
    pub fn property_fingerprint(&self, id: NodeId) -> [u8; 16] {
        let mut hasher = Md5::new();
        self.fingerprint_into(id, &mut hasher);
        hasher.finalize().into()
    }

    fn fingerprint_into(&self, id: NodeId, hasher: &mut Md5) {
        self.content(id).hash_into(hasher);
        for &child in self.children(id) {
            if self.is_property(child) {
                hasher.update([4u8]);
                self.fingerprint_into(child, hasher);
                hasher.update([5u8]);
            }
        }
    }

    // -- annotations -------------------------------------------------------

    /// Delta annotation of a node.
    pub fn delta(&self, id: NodeId) -> Option<&DeltaInfo> {
        self.node(id).kind.delta()
    }

    /// Mutable delta annotation of a node.
    pub fn delta_mut(&mut self, id: NodeId) -> Option<&mut DeltaInfo> {
        self.node_mut(id).kind.delta_mut()
    }

    /// Merge annotation of a node.
    pub fn merge_info(&self, id: NodeId) -> Option<&MergeInfo> {
        self.node(id).kind.merge()
    }

    /// Mutable merge annotation of a node.
    pub fn merge_info_mut(&mut self, id: NodeId) -> Option<&mut MergeInfo> {
        self.node_mut(id).kind.merge_mut()
    }

    /// Change kind of a node, `Nil` for plain nodes.
    pub fn change(&self, id: NodeId) -> DeltaType {
        self.delta(id).map_or(DeltaType::Nil, DeltaInfo::change)
    }

    /// Sets the change kind of every node in a subtree.
    pub fn mark_subtree(&mut self, id: NodeId, change: DeltaType) {
        let ids: Vec<_> = self.preorder(id).collect();
        for n in ids {
            if let Some(d) = self.delta_mut(n) {
                d.set_change(change);
            }
        }
    }

    // -- copies ------------------------------------------------------------

    /// Deep-copies a subtree of `src` into this arena as a detached subtree
    /// of this tree's flavor. Annotations of `src` are not copied.
    pub fn import_subtree(&mut self, src: &Tree, src_id: NodeId) -> NodeId {
        let top = self.import_node(src, src_id);
        let mut stack = vec![(src_id, top)];
        while let Some((from, to)) = stack.pop() {
            for &child in src.children(from) {
                let copy = self.import_node(src, child);
                self.append_child(to, copy);
                stack.push((child, copy));
            }
        }
        top
    }

    /// Copies a single node's content into this arena, detached.
    pub fn import_node(&mut self, src: &Tree, src_id: NodeId) -> NodeId {
        let kind = self.nodes[self.root.index()].kind.fresh();
        self.alloc(src.content(src_id).clone(), kind)
    }

    /// A plain tree holding a copy of the subtree rooted at `id`.
    pub fn subtree_copy(&self, id: NodeId) -> Tree {
        let mut out = Tree::new(self.content(id).clone());
        let root = out.root;
        let mut stack = vec![(id, root)];
        while let Some((from, to)) = stack.pop() {
            for &child in self.children(from) {
                let copy = out.add_child(to, self.content(child).clone());
                stack.push((child, copy));
            }
        }
        out
    }

    /// A plain tree holding a copy of a single node.
    pub fn node_copy(&self, id: NodeId) -> Tree {
        Tree::new(self.content(id).clone())
    }

    /// A compact delta copy of the attached tree. Every node starts
    /// unchanged and linked to its pre-order index as base id.
    pub fn to_delta(&self) -> Tree {
        self.rebuild(|index, _| NodeKind::Delta(DeltaInfo::from_base(index)))
    }

    /// A compact plain copy of the attached tree.
    pub fn to_plain(&self) -> Tree {
        self.rebuild(|_, _| NodeKind::Plain)
    }

    /// A merge copy of this tree.
    ///
    /// Delta annotations and placeholders carry over unchanged; plain nodes
    /// are linked to their pre-order index as base id.
    pub fn to_merge(&self) -> Tree {
        let order = self.preorder_index();
        let mut out = self.clone();
        for (index, node) in out.nodes.iter_mut().enumerate() {
            let kind = std::mem::take(&mut node.kind);
            node.kind = match kind {
                NodeKind::Plain => {
                    let base = order.get(&NodeId::from_index(index)).copied();
                    let mut d = DeltaInfo::default();
                    d.set_base_node(base);
                    NodeKind::Merge(d, MergeInfo::default())
                }
                NodeKind::Delta(d) => NodeKind::Merge(d, MergeInfo::default()),
                merge @ NodeKind::Merge(..) => merge,
            };
        }
        out
    }

    fn rebuild(&self, mut kind_of: impl FnMut(usize, &NodeInner) -> NodeKind) -> Tree {
        let mut map: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let root = self.node(self.root);
        let mut out = Tree::with_kind(root.content.clone(), kind_of(0, root));
        map[self.root.index()] = Some(out.root);
        for (index, id) in self.nodes().enumerate().skip(1) {
            let node = self.node(id);
            let kind = kind_of(index, node);
            let copy = out.alloc(node.content.clone(), kind);
            if let Some(parent) = node.parent.and_then(|p| map[p.index()]) {
                out.append_child(parent, copy);
            }
            map[id.index()] = Some(copy);
        }
        out
    }

    /// True if both subtrees have equal content and shape, ignoring
    /// annotations and placeholders.
    pub fn subtree_eq(&self, id: NodeId, other: &Tree, other_id: NodeId) -> bool {
        if self.content(id) != other.content(other_id) {
            return false;
        }
        let mine = self.children(id);
        let theirs = other.children(other_id);
        mine.len() == theirs.len()
            && mine
                .iter()
                .zip(theirs)
                .all(|(&a, &b)| self.subtree_eq(a, other, b))
    }

    /// True if both attached trees have equal content and shape.
    pub fn same_content(&self, other: &Tree) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

/// Pre-order iterator over a subtree.
pub struct Preorder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// A borrowed view of one node, used where a node must be passed around
/// together with its tree.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    /// The node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The owning tree.
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// The node content.
    pub fn content(&self) -> &'a NodeContent {
        self.tree.content(self.id)
    }

    /// The label.
    pub fn label(&self) -> &'a str {
        self.tree.label(self.id)
    }

    /// An attribute value.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.content().attr(name)
    }

    /// The text payload.
    pub fn text(&self) -> Option<&'a str> {
        self.content().text()
    }

    /// The parent node.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        let tree = self.tree;
        tree.parent(self.id).map(|id| NodeRef { tree, id })
    }

    /// The attached children.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id)
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// True for control-flow nodes.
    pub fn is_control_flow(&self) -> bool {
        self.tree.is_control_flow(self.id)
    }

    /// Property nodes hanging off this node.
    pub fn property_descendants(&self) -> Vec<NodeRef<'a>> {
        let tree = self.tree;
        tree.property_descendants(self.id)
            .into_iter()
            .map(|id| NodeRef { tree, id })
            .collect()
    }

    /// The first property descendant with the given label.
    pub fn property(&self, label: &str) -> Option<NodeRef<'a>> {
        self.property_descendants()
            .into_iter()
            .find(|n| n.label() == label)
    }

    /// Digest of this node and its property subtree.
    pub fn fingerprint(&self) -> [u8; 16] {
        self.tree.property_fingerprint(self.id)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("label", &self.label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut t = Tree::new(NodeContent::new("description"));
        let root = t.root();
        let a = t.add_child(root, NodeContent::new("call").with_attr("endpoint", "a"));
        let lp = t.add_child(root, NodeContent::new("loop"));
        let b = t.add_child(lp, NodeContent::new("call").with_attr("endpoint", "b"));
        t.add_child(b, NodeContent::new("parameters"));
        (t, a, lp, b)
    }

    #[test]
    fn test_add_child() {
        let (t, a, lp, b) = sample();
        assert_eq!(t.children(t.root()), &[a, lp]);
        assert_eq!(t.node(a).child_pos(), 0);
        assert_eq!(t.node(lp).child_pos(), 1);
        assert_eq!(t.parent(b), Some(lp));
        assert_eq!(t.len(), 5);
    }

    #[test]
    fn test_detach_and_insert() {
        let (mut t, a, lp, b) = sample();
        t.detach(a);
        assert_eq!(t.children(t.root()), &[lp]);
        assert_eq!(t.node(lp).child_pos(), 0);
        assert!(!t.is_attached(a));

        t.insert_child(lp, 0, a);
        assert_eq!(t.children(lp), &[a, b]);
        assert_eq!(t.node(b).child_pos(), 1);
        assert!(t.is_attached(a));
    }

    #[test]
    fn test_paths() {
        let (t, a, _, b) = sample();
        assert_eq!(t.path(a).to_string(), "0");
        assert_eq!(t.path(b).to_string(), "1/0");
        assert_eq!(t.path(t.root()), NodePath::root());
        assert_eq!(t.resolve(&NodePath::new(vec![1, 0])).unwrap(), b);
        assert!(matches!(
            t.resolve(&NodePath::new(vec![5])),
            Err(Error::NotApplicable(_))
        ));
    }

    #[test]
    fn test_classification() {
        let (t, a, lp, b) = sample();
        assert_eq!(t.leaves(), vec![a, b]);
        assert_eq!(t.inner_nodes(), vec![lp]);
        assert!(t.is_inner(t.root()));
        assert_eq!(t.property_descendants(b).len(), 1);
        assert!(t.property_descendants(lp).is_empty());
    }

    #[test]
    fn test_preorder() {
        let (t, a, lp, b) = sample();
        let order: Vec<_> = t.nodes().collect();
        assert_eq!(order[..4], [t.root(), a, lp, b]);
        assert_eq!(t.preorder_index()[&b], 3);
    }

    #[test]
    fn test_to_delta_sets_base_ids() {
        let (t, _, _, _) = sample();
        let d = t.to_delta();
        for (i, id) in d.nodes().enumerate() {
            assert_eq!(d.delta(id).and_then(DeltaInfo::base_node), Some(i));
            assert!(d.delta(id).is_some_and(DeltaInfo::is_nil));
        }
        assert!(d.same_content(&t));
    }

    #[test]
    fn test_to_merge_keeps_ids() {
        let (t, _, lp, _) = sample();
        let mut d = t.to_delta();
        let lp_d = d.resolve(&t.path(lp)).unwrap();
        d.delta_mut(lp_d).unwrap().set_change(DeltaType::MoveTo);
        let m = d.to_merge();
        assert_eq!(m.change(lp_d), DeltaType::MoveTo);
        assert_eq!(
            m.merge_info(lp_d).map(|i| i.change_origin),
            Some(ChangeOrigin::Unchanged)
        );
    }

    #[test]
    fn test_import_subtree() {
        let (src, _, lp, _) = sample();
        let mut t = Tree::new(NodeContent::new("description")).to_delta();
        let copy = t.import_subtree(&src, lp);
        assert!(!t.is_attached(copy));
        t.append_child(t.root(), copy);
        assert_eq!(t.subtree_size(copy), 3);
        assert!(t.subtree_eq(copy, &src, lp));
        assert!(t.delta(copy).is_some());
    }

    #[test]
    fn test_fingerprint_covers_properties() {
        let mut t1 = Tree::new(NodeContent::new("description"));
        let r1 = t1.root();
        let c1 = t1.add_child(r1, NodeContent::new("manipulate"));
        t1.add_child(c1, NodeContent::new("code").with_text("data.x = 1"));

        let mut t2 = t1.clone();
        let code = t2.children(c1)[0];
        t2.content_mut(code).set_text(Some("data.x = 2".into()));

        assert_eq!(t1.content(c1), t2.content(c1));
        assert_ne!(t1.property_fingerprint(c1), t2.property_fingerprint(c1));
    }
}
