//! Resource-bounded collection tests
//!
//! All collections of one factory charge one shared budget; exceeding it
//! fails the insert with ResourceLimitExceeded.

#[path = "testutils/mod.rs"]
mod testutils;

use sparqlite::algebra::{OrderElem, TupleExpr, ValueExpr};
use sparqlite::{BindingSet, CollectionFactory, EvaluationConfig, EvaluationError, ResourceBudget};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use testutils::test_fixture::{int, pattern, TestFixture};

#[test]
fn test_collections_share_one_budget() {
    let factory = CollectionFactory::with_budget(ResourceBudget::new(3));
    let mut set = factory.make_set();
    let mut queue = factory.make_queue();

    assert!(set.insert(1).unwrap());
    assert!(!set.insert(1).unwrap());
    queue.push_back("a").unwrap();
    queue.push_back("b").unwrap();
    assert_eq!(factory.budget().used(), 3);

    match set.insert(2) {
        Err(EvaluationError::ResourceLimitExceeded { used, max_size }) => {
            assert_eq!(used, 4);
            assert_eq!(max_size, 3);
        }
        other => panic!("expected limit error, got {:?}", other),
    }
    // The failing element stays in the set and keeps its charge
    assert!(set.contains(&2));
    assert_eq!(factory.budget().used(), 4);

    drop(set);
    assert_eq!(factory.budget().used(), 2);
    queue.pop_front();
    assert_eq!(factory.budget().used(), 1);
}

#[test]
fn test_insert_all_reports_only_all_new() {
    let factory = CollectionFactory::unbounded();
    let mut set = factory.make_set();
    assert!(set.insert_all([1, 2, 3]).unwrap());
    assert!(!set.insert_all([3, 4]).unwrap());
    assert_eq!(set.len(), 4);
    assert_eq!(set.remove_all([1, 2, 9].iter()), 2);
    assert_eq!(factory.budget().used(), 2);
}

#[test]
fn test_multimap_counts_values() {
    let factory = CollectionFactory::with_budget(ResourceBudget::new(10));
    let mut map = factory.make_multimap();
    map.insert("k", 1).unwrap();
    map.insert("k", 2).unwrap();
    map.insert("j", 3).unwrap();
    assert_eq!(map.values_for(&"k"), &[1, 2]);
    assert!(map.values_for(&"missing").is_empty());
    assert_eq!(map.value_count(), 3);
    assert_eq!(factory.budget().used(), 3);
}

#[test]
fn test_shared_counter_across_factories() {
    let used = Arc::new(AtomicUsize::new(0));
    let first = CollectionFactory::new(Arc::clone(&used), 2);
    let second = CollectionFactory::new(Arc::clone(&used), 2);

    let mut a = first.make_queue();
    let mut b = second.make_queue();
    a.push_back(1).unwrap();
    b.push_back(2).unwrap();
    assert!(a.push_back(3).is_err());
}

#[test]
fn test_release_saturates_at_zero() {
    let budget = ResourceBudget::new(5);
    budget.acquire(1).unwrap();
    budget.release(10);
    assert_eq!(budget.used(), 0);
    assert_eq!(budget.peak(), 1);
}

#[test]
fn test_order_by_fails_over_budget() {
    let config = EvaluationConfig {
        max_collection_size: Some(2),
        ..Default::default()
    };
    let fixture = TestFixture::with_config(config);
    fixture.insert_people();

    let expr = Arc::new(TupleExpr::Order {
        arg: pattern("person", "age", "age"),
        elements: vec![OrderElem::asc(ValueExpr::var("age"))],
        limit: None,
        distinct: false,
    });
    match fixture.evaluate(&expr) {
        Err(EvaluationError::ResourceLimitExceeded { .. }) => {}
        other => panic!("expected limit error, got {:?}", other.map(|r| r.len())),
    }
    fixture.assert_all_closed();

    // Top-k keeps the buffer small enough
    let limited = Arc::new(TupleExpr::Order {
        arg: pattern("person", "age", "age"),
        elements: vec![OrderElem::asc(ValueExpr::var("age"))],
        limit: Some(1),
        distinct: false,
    });
    let rows = fixture.evaluate(&limited).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("age"), Some(&int(17)));
}

#[test]
fn test_config_from_json() {
    let config = EvaluationConfig::from_json_str(r#"{"max_collection_size": 10}"#).unwrap();
    assert_eq!(config.max_collection_size, Some(10));
    assert!(config.hash_join_enabled);

    assert!(matches!(
        EvaluationConfig::from_json_str(r#"{"max_collection_size": 0}"#),
        Err(EvaluationError::Configuration(_))
    ));
}
