//! Binding set representation tests
//!
//! Array and map binding sets must be interchangeable: equal content means
//! equal value, equal hash and the same compatibility answers.

#[path = "testutils/mod.rs"]
mod testutils;

use sparqlite::{ArrayBindingSet, BindingSet, MapBindingSet, MutableBindingSet, Solution};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use testutils::test_fixture::{int, iri};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn array(names: &[&str]) -> ArrayBindingSet {
    let names: Arc<[String]> = names.iter().map(|n| n.to_string()).collect();
    ArrayBindingSet::new(names)
}

#[test]
fn test_array_and_map_are_equal_with_same_content() {
    let mut a = array(&["x", "y", "z"]);
    a.add_binding("x", iri("a"));
    a.add_binding("y", int(1));

    let mut m = MapBindingSet::new();
    m.add_binding("y", int(1));
    m.add_binding("x", iri("a"));

    let a = Solution::Array(a);
    let m = Solution::Map(m);
    assert_eq!(a, m);
    assert_eq!(hash_of(&a), hash_of(&m));
    assert_eq!(a.key(), m.key());

    let mut set = HashSet::new();
    set.insert(a);
    assert!(!set.insert(m), "map form should be a duplicate of the array form");
}

#[test]
fn test_undef_slot_is_absent() {
    let mut row = array(&["x", "y"]);
    row.set_at(0, Some(int(1)));
    row.set_at(1, None);

    assert_eq!(row.len(), 1);
    assert!(row.has_binding("x"));
    assert!(!row.has_binding("y"));
    assert!(row.is_undef("y"));
    assert_eq!(Solution::Array(row), Solution::from_pairs([("x", int(1))]));
}

#[test]
fn test_adding_undeclared_name_keeps_all_bindings() {
    let mut row = Solution::Array(array(&["x"]));
    row.add_binding("x", int(1));
    row.add_binding("other", int(2));

    assert_eq!(row.len(), 2);
    assert_eq!(row.value("x"), Some(&int(1)));
    assert_eq!(row.value("other"), Some(&int(2)));
}

#[test]
fn test_compatibility() {
    let left = Solution::from_pairs([("x", int(1)), ("y", int(2))]);
    let agreeing = Solution::from_pairs([("y", int(2)), ("z", int(3))]);
    let conflicting = Solution::from_pairs([("y", int(5))]);
    let disjoint = Solution::from_pairs([("w", int(9))]);

    assert!(left.compatible_with(&agreeing));
    assert!(left.shares_variable_with(&agreeing));
    assert!(!left.compatible_with(&conflicting));
    assert!(left.compatible_with(&disjoint));
    assert!(!left.shares_variable_with(&disjoint));

    let merged = left.merged_with(&agreeing);
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.value("z"), Some(&int(3)));
}

#[test]
fn test_empty_solution_is_compatible_with_everything() {
    let empty = Solution::new();
    let row = Solution::from_pairs([("x", int(1))]);
    assert!(empty.is_empty());
    assert!(empty.compatible_with(&row));
    assert!(!empty.shares_variable_with(&row));
}

#[test]
fn test_remove_binding() {
    let mut row = Solution::from_pairs([("x", int(1)), ("y", int(2))]);
    assert!(row.remove_binding("x"));
    assert!(!row.remove_binding("x"));
    assert_eq!(row.binding_names(), vec!["y"]);
}

#[test]
fn test_projected_key() {
    let row = Solution::from_pairs([("x", int(1)), ("y", int(2))]);
    let names = vec!["y".to_string(), "missing".to_string()];
    assert_eq!(row.projected_key(&names), vec![Some(int(2)), None]);
}
