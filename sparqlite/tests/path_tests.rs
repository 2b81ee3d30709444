//! Property path tests: `p+`, `p*` and zero-length paths

#[path = "testutils/mod.rs"]
mod testutils;

use sparqlite::algebra::{TupleExpr, Var};
use sparqlite::{BindingSet, Solution, Statement};
use std::sync::Arc;
use testutils::test_fixture::{constant, iri, var, TestFixture};

/// a -> b -> c -> a, c -> d
fn cyclic_fixture() -> TestFixture {
    let fixture = TestFixture::new();
    for (from, to) in [("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")] {
        fixture.add(from, "next", iri(to));
    }
    fixture
}

/// `subject next{min_length,} object`; the hop pattern reuses the endpoint variables
fn next_path(subject: Var, object: Var, min_length: u64) -> Arc<TupleExpr> {
    let hop = TupleExpr::pattern(
        Var::new(subject.name.clone()),
        constant("next"),
        Var::new(object.name.clone()),
    );
    TupleExpr::path(subject, hop, object, min_length)
}

#[test]
fn test_one_or_more_terminates_on_cycle() {
    let fixture = cyclic_fixture();
    let expr = next_path(constant("a"), var("y"), 1);
    let reached = fixture.column(&expr, "y");
    assert_eq!(
        reached,
        vec![Some(iri("a")), Some(iri("b")), Some(iri("c")), Some(iri("d"))]
    );
    fixture.assert_all_closed();
}

#[test]
fn test_zero_or_more_includes_start() {
    let fixture = cyclic_fixture();
    let expr = next_path(constant("d"), var("y"), 0);
    assert_eq!(fixture.column(&expr, "y"), vec![Some(iri("d"))]);

    let expr = next_path(constant("d"), var("y"), 1);
    assert!(fixture.rows(&expr).is_empty());
}

#[test]
fn test_bound_object_walks_backwards() {
    let fixture = cyclic_fixture();
    let expr = next_path(var("x"), constant("d"), 1);
    assert_eq!(
        fixture.column(&expr, "x"),
        vec![Some(iri("a")), Some(iri("b")), Some(iri("c"))]
    );
}

#[test]
fn test_both_ends_fixed_is_an_ask() {
    let fixture = cyclic_fixture();
    let reachable = next_path(constant("b"), constant("a"), 1);
    let rows = fixture.rows(&reachable);
    assert_eq!(rows, vec![Solution::new()]);

    let unreachable = next_path(constant("d"), constant("a"), 1);
    assert!(fixture.rows(&unreachable).is_empty());
}

#[test]
fn test_both_ends_free_yields_distinct_pairs() {
    let fixture = cyclic_fixture();
    let expr = next_path(var("x"), var("y"), 1);
    let rows = fixture.rows(&expr);
    // a, b and c reach all four nodes; d reaches nothing
    assert_eq!(rows.len(), 12);
    let mut keys: Vec<_> = rows.iter().map(|r| r.key()).collect();
    keys.sort_by_key(|k| format!("{:?}", k));
    keys.dedup();
    assert_eq!(keys.len(), 12);
}

#[test]
fn test_same_variable_at_both_ends_finds_cycles() {
    let fixture = TestFixture::new();
    fixture.add("a", "next", iri("b"));
    fixture.add("b", "next", iri("a"));
    let expr = next_path(var("x"), var("x"), 1);
    assert_eq!(fixture.column(&expr, "x"), vec![Some(iri("a")), Some(iri("b"))]);

    // d hangs off the cycle and never returns to itself
    let fixture = cyclic_fixture();
    let expr = next_path(var("x"), var("x"), 1);
    assert_eq!(
        fixture.column(&expr, "x"),
        vec![Some(iri("a")), Some(iri("b")), Some(iri("c"))]
    );
    fixture.assert_all_closed();
}

#[test]
fn test_zero_or_more_with_free_ends_is_reflexive_for_every_node() {
    let fixture = TestFixture::new();
    fixture.add("a", "other", iri("b"));
    let expr = next_path(var("s"), var("o"), 0);
    let mut rows = fixture.rows(&expr);
    rows.sort_by_key(|r| r.to_string());
    assert_eq!(
        rows,
        vec![
            Solution::from_pairs([("s", iri("a")), ("o", iri("a"))]),
            Solution::from_pairs([("s", iri("b")), ("o", iri("b"))]),
        ]
    );
    fixture.assert_all_closed();
}

#[test]
fn test_input_binding_fixes_start() {
    let fixture = cyclic_fixture();
    let expr = next_path(var("x"), var("y"), 1);
    let input = Solution::from_pairs([("x", iri("c"))]);
    let rows = fixture.evaluate_with(&expr, &input).unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.value("x") == Some(&iri("c"))));
}

#[test]
fn test_path_does_not_leak_inner_variables() {
    let fixture = cyclic_fixture();
    let expr = next_path(constant("a"), var("y"), 1);
    for row in fixture.rows(&expr) {
        assert_eq!(row.binding_names(), vec!["y"]);
    }
}

#[test]
fn test_zero_length_path() {
    let fixture = cyclic_fixture();
    let free = TupleExpr::zero_length_path(var("x"), var("y"));
    let rows = fixture.rows(&free);
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.value("x") == r.value("y")));

    let fixed = TupleExpr::zero_length_path(constant("a"), var("y"));
    assert_eq!(fixture.column(&fixed, "y"), vec![Some(iri("a"))]);

    let mismatch = TupleExpr::zero_length_path(constant("a"), constant("b"));
    assert!(fixture.rows(&mismatch).is_empty());
}

#[test]
fn test_path_in_named_graph() {
    let fixture = TestFixture::new();
    fixture.add_statement(Statement::in_context(iri("a"), iri("next"), iri("b"), iri("g1")));
    fixture.add_statement(Statement::in_context(iri("b"), iri("next"), iri("c"), iri("g2")));

    let subject = constant("a");
    let hop = TupleExpr::pattern_in(
        Var::new(subject.name.clone()),
        constant("next"),
        var("y"),
        Var::constant(iri("g1")),
    );
    let expr = Arc::new(TupleExpr::ArbitraryLengthPath {
        subject,
        path: hop,
        object: var("y"),
        context: Some(Var::constant(iri("g1"))),
        min_length: 1,
    });
    assert_eq!(fixture.column(&expr, "y"), vec![Some(iri("b"))]);
}
