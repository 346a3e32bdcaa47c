//! Tests for tree construction and navigation.

use rstest::{fixture, rstest};

use super::*;
use crate::error::TreeError;

/// `fn f(a) { b }` with fields on the name, parameters and body.
#[fixture]
fn function_tree() -> SyntaxTree {
    let source = "fn f(a) { b }";
    let mut builder = TreeBuilder::new(source);
    builder.start_node("function", 0);
    builder.token(0..2).unwrap_or_else(|err| panic!("fn: {err}"));
    builder.field_leaf("name", "identifier", 3..4).unwrap_or_else(|err| panic!("name: {err}"));
    builder.start_field_node("parameters", "parameters", 4);
    builder.token(4..5).unwrap_or_else(|err| panic!("open paren: {err}"));
    builder.leaf("identifier", 5..6).unwrap_or_else(|err| panic!("a: {err}"));
    builder.token(6..7).unwrap_or_else(|err| panic!("close paren: {err}"));
    builder.finish_node(7).unwrap_or_else(|err| panic!("parameters: {err}"));
    builder.start_field_node("body", "block", 8);
    builder.token(8..9).unwrap_or_else(|err| panic!("open brace: {err}"));
    builder.leaf("identifier", 10..11).unwrap_or_else(|err| panic!("b: {err}"));
    builder.token(12..13).unwrap_or_else(|err| panic!("close brace: {err}"));
    builder.finish_node(13).unwrap_or_else(|err| panic!("block: {err}"));
    builder.finish_node(13).unwrap_or_else(|err| panic!("function: {err}"));
    builder.build().unwrap_or_else(|err| panic!("tree: {err}"))
}

#[rstest]
fn ids_are_assigned_in_pre_order(function_tree: SyntaxTree) {
    let kinds: Vec<&str> = function_tree.nodes().map(|node| node.kind()).collect();
    assert_eq!(
        kinds,
        [
            "function",
            "fn",
            "identifier",
            "parameters",
            "(",
            "identifier",
            ")",
            "block",
            "{",
            "identifier",
            "}"
        ]
    );
}

#[rstest]
fn navigation_follows_fields(function_tree: SyntaxTree) {
    let root = function_tree.root();
    let name = root.child_by_field_name("name").unwrap_or_else(|| panic!("name"));
    assert_eq!(name.text(), "f");
    assert_eq!(name.parent(), Some(root));
    let body = root.child_by_field_name("body").unwrap_or_else(|| panic!("body"));
    assert_eq!(body.named_children().count(), 1);
    assert!(root.child_by_field_name("return_type").is_none());
    assert!(!root.has_field("return_type"));
}

#[rstest]
fn descendants_cover_the_subtree(function_tree: SyntaxTree) {
    let params = function_tree
        .root()
        .child_by_field_name("parameters")
        .unwrap_or_else(|| panic!("parameters"));
    let texts: Vec<&str> = params.descendants().map(|node| node.text()).collect();
    assert_eq!(texts, ["(a)", "(", "a", ")"]);
    assert_eq!(params.depth(), 1);
    assert!(params.is_ancestor_of(params.child(1).unwrap_or_else(|| panic!("a")).id()));
}

#[rstest]
fn anonymous_tokens_are_keyed_by_text(function_tree: SyntaxTree) {
    let brace = function_tree
        .nodes()
        .find(|node| node.kind() == "{")
        .unwrap_or_else(|| panic!("brace"));
    assert!(!brace.is_named());
    assert_eq!(brace.start_position(), Point::new(0, 8));
}

#[rstest]
fn smallest_enclosing_descends_to_leaves(function_tree: SyntaxTree) {
    let node = function_tree.smallest_enclosing(10..11).unwrap_or_else(|| panic!("node"));
    assert_eq!(node.text(), "b");
    let block = function_tree.smallest_enclosing(9..12).unwrap_or_else(|| panic!("block"));
    assert_eq!(block.kind(), "block");
    assert!(function_tree.smallest_enclosing(0..40).is_none());
}

#[test]
fn positions_track_lines() {
    let mut builder = TreeBuilder::new("a\n  b");
    builder.start_node("list", 0);
    builder.leaf("item", 0..1).unwrap_or_else(|err| panic!("a: {err}"));
    let second = builder.leaf("item", 4..5).unwrap_or_else(|err| panic!("b: {err}"));
    builder.finish_node(5).unwrap_or_else(|err| panic!("list: {err}"));
    let tree = builder.build().unwrap_or_else(|err| panic!("tree: {err}"));
    let node = tree.node(second).unwrap_or_else(|| panic!("node"));
    assert_eq!(node.start_position(), Point::new(1, 2));
    assert_eq!(node.end_position(), Point::new(1, 3));
}

#[test]
fn strict_builder_rejects_overlapping_siblings() {
    let mut builder = TreeBuilder::new("abcdef");
    builder.start_node("root", 0);
    builder.leaf("x", 0..3).unwrap_or_else(|err| panic!("x: {err}"));
    builder.leaf("y", 2..4)
        .unwrap_or_else(|err| panic!("leaf closes before the parent checks it: {err}"));
    let err = builder.finish_node(6).expect_err("overlap");
    assert!(matches!(err, TreeError::InvalidSpan { ref kind, .. } if kind == "y"));
}

#[test]
fn strict_builder_rejects_children_outside_parent() {
    let mut builder = TreeBuilder::new("abcdef");
    builder.start_node("root", 0);
    builder.start_node("inner", 1);
    builder.leaf("x", 0..2).unwrap_or_else(|err| panic!("x: {err}"));
    let err = builder.finish_node(3).expect_err("outside");
    assert!(matches!(err, TreeError::InvalidSpan { ref kind, .. } if kind == "x"));
}

#[test]
fn lenient_builder_marks_malformed_nodes() {
    let mut builder = TreeBuilder::new("abcdef").validation(Validation::Lenient);
    builder.start_node("root", 0);
    builder.leaf("x", 0..3).unwrap_or_else(|err| panic!("x: {err}"));
    let overlapping = builder.leaf("y", 2..4).unwrap_or_else(|err| panic!("y: {err}"));
    builder.finish_node(6).unwrap_or_else(|err| panic!("root: {err}"));
    let tree = builder.build().unwrap_or_else(|err| panic!("tree: {err}"));
    let node = tree.node(overlapping).unwrap_or_else(|| panic!("node"));
    assert!(node.is_malformed());
    assert_eq!(node.anomaly(), Some(Anomaly::Malformed));
    assert_eq!(tree.anomalies().count(), 1);
}

#[test]
fn wrapper_nodes_may_share_a_span() {
    let mut builder = TreeBuilder::new("x");
    builder.start_node("expression_statement", 0);
    builder.leaf("identifier", 0..1).unwrap_or_else(|err| panic!("identifier: {err}"));
    builder.finish_node(1).unwrap_or_else(|err| panic!("statement: {err}"));
    assert!(builder.build().is_ok());
}

#[rstest]
#[case::empty(TreeBuilder::new(""), TreeError::EmptyTree)]
#[case::unclosed({
    let mut builder = TreeBuilder::new("ab");
    builder.start_node("root", 0);
    builder
}, TreeError::UnclosedNode { kind: String::from("root") })]
#[case::two_roots({
    let mut builder = TreeBuilder::new("ab");
    builder.leaf("a", 0..1).unwrap_or_else(|err| panic!("a: {err}"));
    builder.leaf("b", 1..2).unwrap_or_else(|err| panic!("b: {err}"));
    builder
}, TreeError::MultipleRoots)]
fn build_rejects_incomplete_trees(#[case] builder: TreeBuilder, #[case] expected: TreeError) {
    assert_eq!(builder.build().expect_err("invalid tree"), expected);
}

#[test]
fn finish_without_start_is_unbalanced() {
    let mut builder = TreeBuilder::new("a");
    assert_eq!(builder.finish_node(1), Err(TreeError::UnbalancedFinish));
}

#[test]
fn token_outside_source_is_rejected() {
    let mut builder = TreeBuilder::new("a");
    builder.start_node("root", 0);
    assert!(matches!(
        builder.token(0..4),
        Err(TreeError::InvalidSpan { .. })
    ));
}
