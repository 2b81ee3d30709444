//! Integration tests for UNION, MINUS, INTERSECTION, DISTINCT and REDUCED

#[path = "testutils/mod.rs"]
mod testutils;

use sparqlite::algebra::TupleExpr;
use sparqlite::{BindingSet, Solution, Value};
use std::sync::Arc;
use testutils::test_fixture::{int, iri, pattern, TestFixture};

fn values(names: &[&str], rows: Vec<Vec<Option<Value>>>) -> Arc<TupleExpr> {
    TupleExpr::values(names, rows)
}

#[test]
fn test_distinct_projection() {
    let fixture = TestFixture::new();
    fixture.add("a", "p", int(1));
    fixture.add("a", "p", int(2));
    fixture.add("b", "p", int(3));

    let expr = TupleExpr::distinct(TupleExpr::project(pattern("s", "p", "o"), &["s"]));
    let mut rows = fixture.rows(&expr);
    rows.sort_by_key(|r| r.to_string());
    assert_eq!(
        rows,
        vec![
            Solution::from_pairs([("s", iri("a"))]),
            Solution::from_pairs([("s", iri("b"))]),
        ]
    );

    let reduced = TupleExpr::reduced(TupleExpr::project(pattern("s", "p", "o"), &["s"]));
    assert_eq!(fixture.rows(&reduced).len(), 2);
}

#[test]
fn test_union_concatenates() {
    let fixture = TestFixture::with_people();
    let expr = TupleExpr::union(pattern("p", "knows", "q"), pattern("p", "age", "age"));
    let rows = fixture.rows(&expr);
    assert_eq!(rows.len(), 3 + 4);
    // Left rows come first
    assert!(rows[..3].iter().all(|r| r.has_binding("q")));
    assert!(rows[3..].iter().all(|r| r.has_binding("age")));
    fixture.assert_all_closed();
}

#[test]
fn test_minus_removes_compatible_rows_sharing_a_variable() {
    let fixture = TestFixture::with_people();
    // People with an age who know nobody
    let expr = TupleExpr::difference(pattern("p", "age", "age"), pattern("p", "knows", "q"));
    assert_eq!(
        fixture.column(&expr, "p"),
        vec![Some(iri("carol")), Some(iri("dave"))]
    );
    fixture.assert_all_closed();
}

#[test]
fn test_minus_with_disjoint_variables_keeps_everything() {
    let fixture = TestFixture::with_people();
    let expr = TupleExpr::difference(pattern("p", "age", "age"), pattern("x", "knows", "y"));
    assert_eq!(fixture.rows(&expr).len(), 4);
}

#[test]
fn test_minus_with_undef_right_row() {
    let fixture = TestFixture::new();
    let left = values(
        &["a", "b"],
        vec![vec![Some(int(1)), Some(int(2))], vec![Some(int(3)), Some(int(4))]],
    );
    // The second right row shares no bound variable with anything
    let right = values(&["a", "c"], vec![vec![Some(int(1)), None], vec![None, Some(int(9))]]);
    let rows = fixture.rows(&TupleExpr::difference(left, right));
    assert_eq!(
        rows,
        vec![Solution::from_pairs([("a", int(3)), ("b", int(4))])]
    );
}

#[test]
fn test_intersection_keeps_equal_rows() {
    let fixture = TestFixture::new();
    let left = values(&["x"], vec![vec![Some(int(1))], vec![Some(int(2))], vec![Some(int(3))]]);
    let right = values(&["x"], vec![vec![Some(int(3))], vec![Some(int(1))], vec![Some(int(7))]]);
    let rows = fixture.rows(&TupleExpr::intersection(left, right));
    assert_eq!(
        rows,
        vec![
            Solution::from_pairs([("x", int(1))]),
            Solution::from_pairs([("x", int(3))]),
        ]
    );
}

#[test]
fn test_union_with_empty_branch() {
    let fixture = TestFixture::with_people();
    let expr = TupleExpr::union(Arc::new(TupleExpr::EmptySet), pattern("p", "knows", "q"));
    assert_eq!(fixture.rows(&expr).len(), 3);
}
