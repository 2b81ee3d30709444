//! Test fixture for SPARQLite integration tests
//!
//! Wraps an in-memory store behind the public `EvaluationStrategy` API.

use super::counting_source::{CountingTripleSource, IterationCounters};
use sparqlite::algebra::{TupleExpr, Var};
use sparqlite::exec::{collect_all, EvaluationStrategy};
use sparqlite::{
    AggregateFunctionRegistry, BindingSet, EvaluationConfig, EvaluationResult,
    MemoryTripleSource, Solution, Statement, Value,
};
use std::sync::{Arc, Once};

pub const EX: &str = "http://example.org/";

static INIT_LOGGER: Once = Once::new();

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn iri(local: &str) -> Value {
    Value::iri(format!("{}{}", EX, local))
}

pub fn int(value: i64) -> Value {
    Value::integer(value)
}

pub fn var(name: &str) -> Var {
    Var::new(name)
}

pub fn constant(local: &str) -> Var {
    Var::constant(iri(local))
}

/// `?s <ex:predicate> ?o`
pub fn pattern(subject: &str, predicate: &str, object: &str) -> Arc<TupleExpr> {
    TupleExpr::pattern(var(subject), constant(predicate), var(object))
}

/// Store plus a strategy over it
pub struct TestFixture {
    store: MemoryTripleSource,
    counters: Arc<IterationCounters>,
    strategy: EvaluationStrategy,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(EvaluationConfig::default())
    }

    pub fn with_config(config: EvaluationConfig) -> Self {
        Self::build(config, None)
    }

    /// Fixture whose strategy resolves custom aggregates from `registry`
    pub fn with_registry(registry: Arc<AggregateFunctionRegistry>) -> Self {
        Self::build(EvaluationConfig::default(), Some(registry))
    }

    fn build(config: EvaluationConfig, registry: Option<Arc<AggregateFunctionRegistry>>) -> Self {
        init_logging();
        let store = MemoryTripleSource::new();
        let counting = CountingTripleSource::new(store.clone());
        let counters = counting.counters();
        let mut builder = EvaluationStrategy::builder(Arc::new(counting)).config(config);
        if let Some(registry) = registry {
            builder = builder.registry(registry);
        }
        let strategy = builder.build().expect("Failed to build strategy");
        Self {
            store,
            counters,
            strategy,
        }
    }

    /// Fixture over a small social graph
    ///
    /// alice knows bob and carol, bob knows dave; each has an age.
    pub fn with_people() -> Self {
        let fixture = Self::new();
        fixture.insert_people();
        fixture
    }

    pub fn insert_people(&self) {
        for (from, to) in [("alice", "bob"), ("alice", "carol"), ("bob", "dave")] {
            self.add(from, "knows", iri(to));
        }
        for (person, age) in [("alice", 34), ("bob", 30), ("carol", 17), ("dave", 52)] {
            self.add(person, "age", int(age));
        }
    }

    pub fn add(&self, subject: &str, predicate: &str, object: Value) {
        self.store.add_triple(iri(subject), iri(predicate), object);
    }

    pub fn add_statement(&self, statement: Statement) {
        self.store.add(statement);
    }

    pub fn strategy(&self) -> &EvaluationStrategy {
        &self.strategy
    }

    pub fn counters(&self) -> &IterationCounters {
        &self.counters
    }

    pub fn evaluate(&self, expr: &Arc<TupleExpr>) -> EvaluationResult<Vec<Solution>> {
        self.evaluate_with(expr, &Solution::new())
    }

    pub fn evaluate_with(
        &self,
        expr: &Arc<TupleExpr>,
        bindings: &Solution,
    ) -> EvaluationResult<Vec<Solution>> {
        collect_all(self.strategy.evaluate_query(expr, bindings)?)
    }

    /// Evaluate, panicking on error
    pub fn rows(&self, expr: &Arc<TupleExpr>) -> Vec<Solution> {
        self.evaluate(expr).expect("Evaluation failed")
    }

    /// Values of `name` across all rows, sorted by their display form
    pub fn column(&self, expr: &Arc<TupleExpr>, name: &str) -> Vec<Option<Value>> {
        let mut values: Vec<Option<Value>> = self
            .rows(expr)
            .iter()
            .map(|row| row.value(name).cloned())
            .collect();
        values.sort_by_key(|v| v.as_ref().map(|v| v.to_string()));
        values
    }

    pub fn assert_all_closed(&self) {
        let counters = self.counters();
        assert!(
            counters.all_closed_once(),
            "opened {} source iterations, closed {} ({} double closes)",
            counters.opened(),
            counters.closed(),
            counters.double_closed()
        );
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
