//! End-to-end scenarios for diffing, patching and merging process trees.

use pretty_assertions::assert_eq;

use proctree_merge::{
    delta_tree, diff_trees, merge_trees, parse_str, patch, print_to_string, render_tree,
    resolve_placeholders, ChangeKind, ChangeOrigin, ConflictType, DeltaInfo, DeltaType,
    DiffConfig, MatchingAlgorithm, MergeState, NodeContent, NodeId, NodePath, Resolution, Tree,
    Thresholds,
};

fn process() -> Tree {
    Tree::new(NodeContent::new("description"))
}

fn call(t: &mut Tree, parent: NodeId, endpoint: &str) -> NodeId {
    t.add_child(
        parent,
        NodeContent::new("call").with_attr("endpoint", endpoint),
    )
}

fn path(s: &str) -> NodePath {
    s.parse().unwrap()
}

fn loose() -> DiffConfig {
    DiffConfig::new(
        Thresholds::new(0.95, 0.95).unwrap(),
        MatchingAlgorithm::Bucket,
    )
}

// -- diff ------------------------------------------------------------------

#[test]
fn test_identical_trees_match_identically() {
    let mut t = process();
    let r = t.root();
    call(&mut t, r, "http://example.org/a");
    let lp = t.add_child(r, NodeContent::new("loop"));
    call(&mut t, lp, "http://example.org/b");
    t.add_child(lp, NodeContent::new("manipulate").with_text("data.x += 1"));

    for algorithm in MatchingAlgorithm::ALL {
        let config = DiffConfig::default().with_algorithm(algorithm);
        let result = diff_trees(&t, &t, &config);
        assert!(result.script.is_empty(), "{} produced changes", algorithm);
        for id in t.nodes() {
            assert!(
                result.matching.are_matched(id, id),
                "{}: {} not matched to itself",
                algorithm,
                id
            );
        }
    }
}

#[test]
fn test_single_attribute_update() {
    let mut old = process();
    let r = old.root();
    call(&mut old, r, "X");
    let mut new = process();
    let r = new.root();
    call(&mut new, r, "Y");

    let result = diff_trees(&old, &new, &loose());
    assert_eq!(result.script.len(), 1);
    let change = &result.script.changes()[0];
    assert_eq!(change.kind, ChangeKind::Update);
    assert_eq!(change.old_path, Some(path("0")));
    let update = &change.updates["endpoint"];
    assert_eq!(update.old.as_deref(), Some("X"));
    assert_eq!(update.new.as_deref(), Some("Y"));
}

fn labelled_call(label: &str) -> Tree {
    let mut t = process();
    let r = t.root();
    t.add_child(
        r,
        NodeContent::new("call")
            .with_attr("endpoint", "http://example.org/orders")
            .with_attr("label", label),
    );
    t
}

#[test]
fn test_label_attribute_update_round_trips() {
    let old = labelled_call("Fetch order");
    let new = labelled_call("Fetch invoice");

    let result = diff_trees(&old, &new, &DiffConfig::default());
    assert_eq!(
        result.script.to_string(),
        "UPDATE 0 label: \"Fetch order\" -> \"Fetch invoice\"\n"
    );

    let delta = patch(&old, &result.script).unwrap();
    assert!(delta.same_content(&new));
    let c = delta.children(delta.root())[0];
    assert_eq!(delta.content(c).label(), "call");
    assert_eq!(delta.content(c).attr("label"), Some("Fetch invoice"));
}

#[test]
fn test_unrelated_endpoints_replace_under_default_thresholds() {
    let mut old = process();
    let r = old.root();
    call(&mut old, r, "X");
    let mut new = process();
    let r = new.root();
    call(&mut new, r, "Y");

    let result = diff_trees(&old, &new, &DiffConfig::default());
    assert_eq!(
        result.script.to_string(),
        "SUBTREE_INSERTION 0 <call> (1 nodes)\nSUBTREE_DELETION 0\n"
    );
}

#[test]
fn test_deleted_call_kept_as_placeholder() {
    let mut old = process();
    let r = old.root();
    call(&mut old, r, "http://example.org/a");
    call(&mut old, r, "http://example.org/b");
    let mut new = process();
    let r = new.root();
    call(&mut new, r, "http://example.org/a");

    let result = diff_trees(&old, &new, &DiffConfig::default());
    assert_eq!(result.script.len(), 1);
    let change = &result.script.changes()[0];
    assert!(matches!(
        change.kind,
        ChangeKind::Deletion | ChangeKind::SubtreeDeletion
    ));
    assert_eq!(change.old_path, Some(path("1")));

    let delta = delta_tree(&old, &new, &DiffConfig::default()).unwrap();
    let root = delta.root();
    assert_eq!(delta.children(root).len(), 1);
    let placeholders = delta.delta(root).unwrap().placeholders();
    assert_eq!(placeholders.len(), 1);
    assert!(delta.change(placeholders[0]).is_deletion());
    assert_eq!(
        delta.content(placeholders[0]).attr("endpoint"),
        Some("http://example.org/b")
    );
}

#[test]
fn test_call_moved_out_of_loop() {
    let mut old = process();
    let r = old.root();
    let lp = old.add_child(r, NodeContent::new("loop"));
    call(&mut old, lp, "http://example.org/a");
    let mut new = process();
    let r = new.root();
    call(&mut new, r, "http://example.org/a");

    let result = diff_trees(&old, &new, &DiffConfig::default());
    let moves: Vec<_> = result
        .script
        .iter()
        .filter(|c| c.kind == ChangeKind::Move)
        .collect();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].old_path, Some(path("0/0")));
    assert_eq!(moves[0].new_path, Some(path("0")));

    let delta = delta_tree(&old, &new, &DiffConfig::default()).unwrap();
    let moved = delta.resolve(&path("0")).unwrap();
    assert_eq!(delta.change(moved), DeltaType::MoveTo);
    assert!(delta.same_content(&new));

    let extended = resolve_placeholders(&delta);
    let from = extended.resolve(&path("0/0")).unwrap();
    assert_eq!(extended.change(from), DeltaType::MoveFrom);
    let move_id = delta.delta(moved).and_then(DeltaInfo::move_id);
    assert!(move_id.is_some());
    assert_eq!(extended.delta(from).and_then(DeltaInfo::move_id), move_id);
}

#[test]
fn test_delta_xml_output() {
    let old = parse_str(
        r#"<description xmlns="http://cpee.org/ns/description/1.0">
             <call id="a1" endpoint="http://example.org/a" />
             <call id="a2" endpoint="http://example.org/b" />
           </description>"#,
    )
    .unwrap();
    let new = parse_str(
        r#"<description xmlns="http://cpee.org/ns/description/1.0">
             <call id="a1" endpoint="http://example.org/a" />
           </description>"#,
    )
    .unwrap();

    let delta = delta_tree(&old, &new, &DiffConfig::default()).unwrap();
    let xml = print_to_string(&resolve_placeholders(&delta)).unwrap();
    assert!(xml.contains("xmlns:del="));
    assert!(xml.contains("<call endpoint=\"http://example.org/a\" />"));
    assert!(xml.contains("<del:call endpoint=\"http://example.org/b\" />"));
}

#[test]
fn test_rendered_delta_tree() {
    let mut old = process();
    let r = old.root();
    call(&mut old, r, "X");
    let mut new = process();
    let r = new.root();
    call(&mut new, r, "Y");

    let delta = delta_tree(&old, &new, &loose()).unwrap();
    assert_eq!(
        render_tree(&delta),
        "description\n└── call endpoint=\"Y\" [UPDATE endpoint: \"X\" -> \"Y\"]\n"
    );
}

// -- merge -----------------------------------------------------------------

fn merge_base() -> Tree {
    let mut t = process();
    let r = t.root();
    t.add_child(
        r,
        NodeContent::new("call")
            .with_attr("endpoint", "http://example.org/x")
            .with_attr("a", "1")
            .with_attr("b", "2"),
    );
    t
}

fn set_attr(tree: &Tree, name: &str, value: &str) -> Tree {
    let mut t = tree.clone();
    let c = t.children(t.root())[0];
    t.content_mut(c).attributes_mut().insert(name, value);
    t
}

#[test]
fn test_disjoint_attribute_updates() {
    let base = merge_base();
    let a = set_attr(&base, "a", "9");
    let b = set_attr(&base, "b", "8");

    let result = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    let merged = result.merged();
    let x = merged.children(merged.root())[0];
    assert_eq!(merged.content(x).attr("a"), Some("9"));
    assert_eq!(merged.content(x).attr("b"), Some("8"));
    assert_eq!(result.conflicts.conflict_count(), 0);
    assert!(!result.conflicts.has_pending());
}

#[test]
fn test_label_attribute_update_merged() {
    let base = labelled_call("Fetch order");
    let a = labelled_call("Fetch invoice");

    let result = merge_trees(&base, &a, &base, &DiffConfig::default()).unwrap();
    assert_eq!(result.conflicts.conflict_count(), 0);
    assert!(result.merged().same_content(&a));

    let mut out = Vec::new();
    result.edits.write_xml(&mut out).unwrap();
    let xml = String::from_utf8(out).unwrap();
    assert_eq!(result.edits.edit_count(), 1);
    assert!(xml.contains("<update path=\"/0\""));
    assert!(xml.contains("origin=\"1\" />"));
}

#[test]
fn test_conflicting_attribute_updates() {
    let base = merge_base();
    let a = set_attr(&base, "a", "9");
    let b = set_attr(&base, "a", "7");

    let first = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    let x = first.tree.children(first.tree.root())[0];
    assert_eq!(first.tree.content(x).attr("a"), Some("9"));
    assert_eq!(first.conflicts.count_by_type(ConflictType::Update), 1);
    let conflict = &first.conflicts.resolved()[0];
    assert_eq!(conflict.field.as_deref(), Some("a"));
    assert_eq!(conflict.resolution, Resolution::BranchA);
    assert!(!first.conflicts.has_pending());
    assert_eq!(first.state(x), MergeState::Updated);

    let second = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    assert_eq!(
        print_to_string(&first.tree).unwrap(),
        print_to_string(&second.tree).unwrap()
    );
}

/// `description[loop[a, b], critical[c]]`
fn move_base() -> Tree {
    let mut t = process();
    let r = t.root();
    let lp = t.add_child(r, NodeContent::new("loop"));
    call(&mut t, lp, "aaaa");
    call(&mut t, lp, "bbbb");
    let cr = t.add_child(r, NodeContent::new("critical"));
    call(&mut t, cr, "cccc");
    t
}

fn endpoints(t: &Tree, parent: NodeId) -> Vec<String> {
    t.children(parent)
        .iter()
        .filter_map(|&c| t.content(c).attr("endpoint").map(str::to_string))
        .collect()
}

#[test]
fn test_move_conflict_keeps_branch_a_placement() {
    let base = move_base();

    // A moves `a` into the critical section.
    let mut a = base.clone();
    let moved = a.resolve(&path("0/0")).unwrap();
    let cr = a.resolve(&path("1")).unwrap();
    a.detach(moved);
    a.append_child(cr, moved);
    let a = a.to_plain();

    // B moves `a` to the end of the process.
    let mut b = base.clone();
    let moved = b.resolve(&path("0/0")).unwrap();
    let r = b.root();
    b.detach(moved);
    b.append_child(r, moved);
    let b = b.to_plain();

    let result = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    assert_eq!(result.conflicts.count_by_type(ConflictType::Move), 1);
    assert_eq!(result.conflicts.resolved()[0].resolution, Resolution::BranchA);

    let merged = result.merged();
    let root = merged.root();
    assert_eq!(merged.children(root).len(), 2);
    let lp = merged.children(root)[0];
    let cr = merged.children(root)[1];
    assert_eq!(endpoints(&merged, lp), vec!["bbbb"]);
    assert_eq!(endpoints(&merged, cr), vec!["cccc", "aaaa"]);

    let node = result.tree.resolve(&path("1/1")).unwrap();
    assert_eq!(result.state(node), MergeState::Moved);
    assert_eq!(
        result.tree.merge_info(node).map(|i| i.change_origin),
        Some(ChangeOrigin::BranchA)
    );
}

#[test]
fn test_single_branch_move_applied() {
    let base = move_base();
    let mut a = base.clone();
    let moved = a.resolve(&path("0/0")).unwrap();
    let cr = a.resolve(&path("1")).unwrap();
    a.detach(moved);
    a.append_child(cr, moved);
    let a = a.to_plain();

    let result = merge_trees(&base, &a, &base, &DiffConfig::default()).unwrap();
    assert_eq!(result.conflicts.conflict_count(), 0);
    assert!(result.merged().same_content(&a));
}

#[test]
fn test_delete_against_update() {
    let base = merge_base();
    let a = set_attr(&base, "a", "9");
    let mut b = base.clone();
    let x = b.children(b.root())[0];
    b.detach(x);
    let b = b.to_plain();

    let result = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    assert!(result.merged().children(result.merged().root()).is_empty());
    assert_eq!(result.conflicts.count_by_type(ConflictType::DeleteChange), 1);
    assert_eq!(result.conflicts.resolved()[0].resolution, Resolution::Deleted);
    assert!(result
        .states
        .values()
        .all(|state| !state.is_conflict()));
}

#[test]
fn test_insertions_in_both_branches() {
    let base = merge_base();
    let mut a = base.clone();
    let r = a.root();
    call(&mut a, r, "http://example.org/from-a");
    let mut b = base.clone();
    let r = b.root();
    call(&mut b, r, "urn:other:from-b");

    let result = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    let merged = result.merged();
    assert_eq!(
        endpoints(&merged, merged.root()),
        vec![
            "http://example.org/x",
            "http://example.org/from-a",
            "urn:other:from-b"
        ]
    );
    assert_eq!(result.conflicts.conflict_count(), 0);
}

#[test]
fn test_merge_xml_documents() {
    let base = parse_str(
        r#"<description><call endpoint="http://example.org/x" a="1" b="2" /></description>"#,
    )
    .unwrap();
    let a = parse_str(
        r#"<description><call endpoint="http://example.org/x" a="9" b="2" /></description>"#,
    )
    .unwrap();
    let b = parse_str(
        r#"<description><call endpoint="http://example.org/x" a="1" b="8" /></description>"#,
    )
    .unwrap();

    let result = merge_trees(&base, &a, &b, &DiffConfig::default()).unwrap();
    let xml = print_to_string(&result.merged()).unwrap();
    assert!(xml.contains("<call endpoint=\"http://example.org/x\" a=\"9\" b=\"8\" />"));
}
