use serde_json::{json, Value};

use treeq::document::{Arena, Candidate, NodeId, PathSegment};
use treeq::error::{ErrorKind, TreeqError};
use treeq::format::Format;
use treeq::output::json::to_value;
use treeq::parser;
use treeq::query::{self, parse_path};

fn load(input: &str) -> (Arena, Vec<NodeId>) {
    let mut arena = Arena::new();
    let docs = parser::parse(input, Format::Yaml, &mut arena).unwrap();
    (arena, docs)
}

fn run(input: &str, expression: &str) -> Result<(Arena, Vec<NodeId>, Vec<Candidate>), TreeqError> {
    let (mut arena, docs) = load(input);
    let found = query::query(&mut arena, &docs, expression)?;
    Ok((arena, docs, found))
}

fn values(arena: &Arena, found: &[Candidate]) -> Vec<Value> {
    found.iter().map(|c| to_value(arena, c.node).unwrap()).collect()
}

fn key(k: &str) -> PathSegment {
    PathSegment::Key(k.to_string())
}

#[test]
fn scenario_simple_path() {
    let (arena, _, found) = run("{a: {b: apple}}", ".a.b").unwrap();
    assert_eq!(values(&arena, &found), vec![json!("apple")]);
    assert_eq!(found[0].path, vec![key("a"), key("b")]);
}

#[test]
fn scenario_update_assign() {
    let (arena, docs, _) = run("{a: {b: apple}}", r#".a.b |= "frog""#).unwrap();
    assert_eq!(to_value(&arena, docs[0]).unwrap(), json!({"a": {"b": "frog"}}));
}

#[test]
fn scenario_select_glob() {
    let (arena, _, found) = run("[cat, goat, dog]", r#".[] | select(. == "*at")"#).unwrap();
    assert_eq!(values(&arena, &found), vec![json!("cat"), json!("goat")]);
    assert_eq!(found[0].path, vec![PathSegment::Index(0)]);
    assert_eq!(found[1].path, vec![PathSegment::Index(1)]);
}

#[test]
fn scenario_merge_overwrites_kind() {
    let (arena, docs, _) = run("{a: {also: [1]}, b: {also: me}}", ".a * .b").unwrap();
    assert_eq!(
        to_value(&arena, docs[0]).unwrap(),
        json!({"a": {"also": "me"}, "b": {"also": "me"}})
    );
}

#[test]
fn scenario_index_out_of_range() {
    let err = run("- one\n- two\n- three\n", "[-4]").map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Eval);
    assert!(matches!(err, TreeqError::IndexOutOfRange { index: -4, length: 3 }));
}

#[test]
fn scenario_recursive_descent_order() {
    let (arena, _, found) = run("{a: frog}", "..").unwrap();
    assert_eq!(values(&arena, &found), vec![json!({"a": "frog"}), json!("frog")]);
    assert!(found[0].path.is_empty());
    assert_eq!(found[1].path, vec![key("a")]);
}

#[test]
fn parsing_is_deterministic() {
    for expression in [
        ".a.b[0] | select(. == \"x*\")",
        "[.a[] | .name], count(..)",
        ".a * .b or .c == null",
        "x: .y, d0 | .z .- .w",
    ] {
        let first = parse_path(expression).unwrap();
        let second = parse_path(expression).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }
}

#[test]
fn select_is_idempotent() {
    let input = "[apple, banana, avocado, cherry]";
    let (arena_once, _, once) = run(input, r#".[] | select(. == "a*")"#).unwrap();
    let (arena_twice, _, twice) =
        run(input, r#".[] | select(. == "a*") | select(. == "a*")"#).unwrap();
    assert_eq!(values(&arena_once, &once), values(&arena_twice, &twice));
    let paths = |found: &[Candidate]| found.iter().map(|c| c.path.clone()).collect::<Vec<_>>();
    assert_eq!(paths(&once), paths(&twice));
}

#[test]
fn union_with_itself_is_deduplicated() {
    let input = "a: [1, 2, 3]\nb: x";
    for expression in [".a[]", ".b", "..", ".a[1]"] {
        let (arena, _, single) = run(input, expression).unwrap();
        let (arena2, _, doubled) = run(input, &format!("{expression}, {expression}")).unwrap();
        assert_eq!(values(&arena, &single), values(&arena2, &doubled), "{expression}");
        assert_eq!(single.len(), doubled.len());
    }
}

#[test]
fn negative_indexing() {
    let input = "[zero, one, two, three]";
    let (arena, _, last) = run(input, ".[-1]").unwrap();
    assert_eq!(values(&arena, &last), vec![json!("three")]);
    assert_eq!(last[0].path, vec![PathSegment::Index(3)]);

    let (arena, _, first) = run(input, ".[-4]").unwrap();
    assert_eq!(values(&arena, &first), vec![json!("zero")]);

    let err = run(input, ".[-5]").map(|_| ()).unwrap_err();
    assert!(matches!(err, TreeqError::IndexOutOfRange { index: -5, length: 4 }));
}

#[test]
fn merge_precedence() {
    let (arena, docs, _) = run(
        "lhs: {shared: old, only_lhs: 1, nested: {x: 1, y: 2}, list: [a, b]}\n\
         rhs: {shared: new, only_rhs: 2, nested: {y: 3}, list: [c, d, e]}\n",
        ".lhs * .rhs",
    )
    .unwrap();
    let merged = to_value(&arena, docs[0]).unwrap();
    assert_eq!(
        merged["lhs"],
        json!({
            "shared": "new",
            "only_lhs": 1,
            "nested": {"x": 1, "y": 3},
            "list": ["c", "d", "e"],
            "only_rhs": 2
        })
    );
    assert_eq!(merged["rhs"]["list"], json!(["c", "d", "e"]));
}

#[test]
fn merge_keeps_longer_lhs_sequence() {
    let (arena, docs, _) = run("a: [1, 2, 3]\nb: [9]", ".a * .b").unwrap();
    assert_eq!(to_value(&arena, docs[0]).unwrap()["a"], json!([9, 2, 3]));
}

#[test]
fn auto_vivification_creates_exactly_the_missing_segments() {
    let (arena, docs, _) = run("a: 1", ".b.c[1] |= 5").unwrap();
    assert_eq!(
        to_value(&arena, docs[0]).unwrap(),
        json!({"a": 1, "b": {"c": [null, 5]}})
    );
}

#[test]
fn oversized_write_index_is_an_eval_error() {
    let err = run("[a]", ".[4000000000000000000] |= 1").map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Eval);
    assert!(matches!(err, TreeqError::ExtensionLimit { .. }));
}

#[test]
fn auto_vivification_reuses_existing_segments() {
    let (arena, docs, _) = run("a: {keep: true}", ".a.new |= 1").unwrap();
    assert_eq!(
        to_value(&arena, docs[0]).unwrap(),
        json!({"a": {"keep": true, "new": 1}})
    );
}

#[test]
fn reading_never_vivifies() {
    let (arena, docs, found) = run("a: 1", ".b.c[1]").unwrap();
    assert!(found.is_empty());
    assert_eq!(to_value(&arena, docs[0]).unwrap(), json!({"a": 1}));
}

#[test]
fn documents_are_evaluated_independently() {
    let (arena, docs, found) = run("a: 1\n---\na: 2\n---\nb: 3\n", ".a").unwrap();
    assert_eq!(docs.len(), 3);
    assert_eq!(values(&arena, &found), vec![json!(1), json!(2)]);
    assert_eq!(found[0].document, 0);
    assert_eq!(found[1].document, 1);
}

#[test]
fn delete_child_removes_matching_entries() {
    let (arena, docs, _) = run("a: 1\nb: 2\nc: 3", ". .- select(. == 2)").unwrap();
    assert_eq!(to_value(&arena, docs[0]).unwrap(), json!({"a": 1, "c": 3}));
}

#[test]
fn lex_and_parse_errors_carry_their_kind() {
    assert_eq!(parse_path(".a ^").unwrap_err().kind(), ErrorKind::Lex);
    assert_eq!(parse_path("(.a | .b").unwrap_err().kind(), ErrorKind::Parse);
    assert_eq!(parse_path(".a )").unwrap_err().kind(), ErrorKind::Parse);
}

#[test]
fn leading_dot_is_optional() {
    let (arena, _, found) = run("a: {b: [x, y, cat]}", "a.b[2] | select(.==cat)").unwrap();
    assert_eq!(values(&arena, &found), vec![json!("cat")]);
    assert_eq!(found[0].path, vec![key("a"), key("b"), PathSegment::Index(2)]);
}

#[test]
fn json_documents_are_queryable() {
    let mut arena = Arena::new();
    let docs = parser::parse(r#"{"a": {"b": [1, 2]}}"#, Format::Json, &mut arena).unwrap();
    let found = query::query(&mut arena, &docs, ".a.b[1]").unwrap();
    assert_eq!(values(&arena, &found), vec![json!(2)]);
}
