// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate function framework
//!
//! Built-in aggregates are resolved from their [`AggregateKind`](crate::algebra::AggregateKind);
//! custom aggregates are looked up by IRI in an [`AggregateFunctionRegistry`]
//! injected into the evaluation strategy. Add a new aggregate by implementing
//! [`AggregateFunctionFactory`] (or its n-ary variant) and registering it.

pub mod aggregate_functions;
pub mod distinct;
pub mod function_trait;

pub use aggregate_functions::builtin_factory;
pub use distinct::{AlwaysTrue, DistinctValues};
pub use function_trait::{
    AggregateCollector, AggregateFunction, AggregateFunctionFactory, DistinctPredicate,
    NaryAggregateFunction, NaryAggregateFunctionFactory, NaryEvaluationSteps, StepAggregate,
    StepNaryAggregate, ValueEvaluationStep,
};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide default registry for callers that do not inject their own
static GLOBAL_REGISTRY: Lazy<Arc<AggregateFunctionRegistry>> =
    Lazy::new(|| Arc::new(AggregateFunctionRegistry::new()));

/// Aggregate factories keyed by IRI
///
/// Registration is allowed at any time, including while queries run;
/// lookups happen when a group operator is evaluated.
pub struct AggregateFunctionRegistry {
    unary: RwLock<HashMap<String, Arc<dyn AggregateFunctionFactory>>>,
    nary: RwLock<HashMap<String, Arc<dyn NaryAggregateFunctionFactory>>>,
}

impl AggregateFunctionRegistry {
    /// Registry with the built-in aggregates registered under their IRIs
    pub fn new() -> Self {
        let registry = Self::empty();

        registry.register(Arc::new(aggregate_functions::CountFactory));
        registry.register(Arc::new(aggregate_functions::SumFactory));
        registry.register(Arc::new(aggregate_functions::MinFactory));
        registry.register(Arc::new(aggregate_functions::MaxFactory));
        registry.register(Arc::new(aggregate_functions::AvgFactory));
        registry.register(Arc::new(aggregate_functions::SampleFactory));
        registry.register(Arc::new(aggregate_functions::GroupConcatFactory::default()));

        registry
    }

    pub fn empty() -> Self {
        Self {
            unary: RwLock::new(HashMap::new()),
            nary: RwLock::new(HashMap::new()),
        }
    }

    /// Shared process-wide registry
    pub fn global() -> Arc<AggregateFunctionRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Register a unary factory, replacing any previous one with the same IRI
    pub fn register(&self, factory: Arc<dyn AggregateFunctionFactory>) {
        let iri = factory.iri().to_string();
        log::debug!("Registering aggregate function <{}>", iri);
        self.unary.write().insert(iri, factory);
    }

    pub fn register_nary(&self, factory: Arc<dyn NaryAggregateFunctionFactory>) {
        let iri = factory.iri().to_string();
        log::debug!("Registering n-ary aggregate function <{}>", iri);
        self.nary.write().insert(iri, factory);
    }

    pub fn get(&self, iri: &str) -> Option<Arc<dyn AggregateFunctionFactory>> {
        self.unary.read().get(iri).cloned()
    }

    pub fn get_nary(&self, iri: &str) -> Option<Arc<dyn NaryAggregateFunctionFactory>> {
        self.nary.read().get(iri).cloned()
    }

    /// Remove both the unary and n-ary factory for `iri`
    pub fn unregister(&self, iri: &str) -> bool {
        let unary = self.unary.write().remove(iri).is_some();
        let nary = self.nary.write().remove(iri).is_some();
        unary || nary
    }

    pub fn contains(&self, iri: &str) -> bool {
        self.unary.read().contains_key(iri) || self.nary.read().contains_key(iri)
    }

    /// All registered IRIs, sorted
    pub fn iris(&self) -> Vec<String> {
        let mut iris: Vec<String> = self.unary.read().keys().cloned().collect();
        for iri in self.nary.read().keys() {
            if !iris.contains(iri) {
                iris.push(iri.clone());
            }
        }
        iris.sort();
        iris
    }
}

impl Default for AggregateFunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AggregateFunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateFunctionRegistry")
            .field("iris", &self.iris())
            .finish()
    }
}
