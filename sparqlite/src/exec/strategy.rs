// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Evaluation strategy: turns algebra nodes into iterations
//!
//! Dispatch is a single `match` over [`TupleExpr`]. Each operator lives in its
//! own module and returns a lazily evaluated [`SolutionIteration`].

use super::context::EvaluationContext;
use super::error::{EvaluationError, EvaluationResult};
use super::iteration::{CloseableIteration, EmptyIteration, SingletonIteration, SolutionIteration};
use super::service::ServiceResolver;
use super::value_eval::ValueEvaluator;
use super::{group, join, order, path, pattern, service, set_ops, unary};
use crate::algebra::TupleExpr;
use crate::binding::Solution;
use crate::collection::CollectionFactory;
use crate::config::EvaluationConfig;
use crate::functions::AggregateFunctionRegistry;
use crate::store::TripleSource;
use std::sync::Arc;

/// Evaluates algebra trees against a triple source
///
/// Cheap to clone; clones share the context (and therefore the budget).
/// Use [`EvaluationStrategy::for_query`] to start a query with a fresh budget.
#[derive(Debug, Clone)]
pub struct EvaluationStrategy {
    context: Arc<EvaluationContext>,
}

impl EvaluationStrategy {
    /// Strategy with default configuration and the global aggregate registry
    pub fn new(triple_source: Arc<dyn TripleSource>) -> Self {
        let config = EvaluationConfig::default();
        Self {
            context: Arc::new(EvaluationContext {
                triple_source,
                collections: config.collection_factory(),
                registry: AggregateFunctionRegistry::global(),
                service_resolver: None,
                config,
                values: Arc::new(ValueEvaluator::new()),
            }),
        }
    }

    pub fn builder(triple_source: Arc<dyn TripleSource>) -> EvaluationStrategyBuilder {
        EvaluationStrategyBuilder::new(triple_source)
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.context.config
    }

    /// Copy of this strategy whose blocking operators draw from `factory`
    pub fn with_collection_factory(&self, factory: CollectionFactory) -> Self {
        Self {
            context: Arc::new(self.context.with_collections(factory)),
        }
    }

    /// Copy of this strategy with a fresh budget built from the configuration
    pub fn for_query(&self) -> Self {
        self.with_collection_factory(self.context.config.collection_factory())
    }

    /// Evaluate `expr` as a new query with its own budget
    ///
    /// Top-level entry point: concurrent queries started this way never
    /// compete for one ceiling.
    pub fn evaluate_query(
        &self,
        expr: &Arc<TupleExpr>,
        bindings: &Solution,
    ) -> EvaluationResult<SolutionIteration> {
        self.for_query().evaluate(expr, bindings)
    }

    /// Evaluate `expr` under the given input bindings
    ///
    /// Charges this strategy's budget, which every clone shares. Operators
    /// use this for subtrees of the running query; callers starting an
    /// independent query should use [`EvaluationStrategy::evaluate_query`].
    pub fn evaluate(
        &self,
        expr: &Arc<TupleExpr>,
        bindings: &Solution,
    ) -> EvaluationResult<SolutionIteration> {
        match expr.as_ref() {
            TupleExpr::StatementPattern {
                subject,
                predicate,
                object,
                context,
            } => pattern::evaluate_pattern(
                self,
                [subject, predicate, object],
                context.as_ref(),
                bindings,
            ),
            TupleExpr::Join { left, right } => join::evaluate_join(self, left, right, bindings),
            TupleExpr::LeftJoin {
                left,
                right,
                condition,
            } => join::evaluate_left_join(self, left, right, condition.as_ref(), bindings),
            TupleExpr::Union { left, right } => set_ops::evaluate_union(self, left, right, bindings),
            TupleExpr::Difference { left, right } => {
                set_ops::evaluate_difference(self, left, right, bindings)
            }
            TupleExpr::Intersection { left, right } => {
                set_ops::evaluate_intersection(self, left, right, bindings)
            }
            TupleExpr::Filter { arg, condition } => {
                unary::evaluate_filter(self, arg, condition, bindings)
            }
            TupleExpr::Projection { arg, elements } => {
                unary::evaluate_projection(self, arg, elements, bindings)
            }
            TupleExpr::Extension { arg, elements } => {
                unary::evaluate_extension(self, arg, elements, bindings)
            }
            TupleExpr::Distinct { arg } => set_ops::evaluate_distinct(self, arg, bindings),
            TupleExpr::Reduced { arg } => set_ops::evaluate_reduced(self, arg, bindings),
            TupleExpr::Order {
                arg,
                elements,
                limit,
                distinct,
            } => order::evaluate_order(self, arg, elements, *limit, *distinct, bindings),
            TupleExpr::Slice { arg, offset, limit } => {
                unary::evaluate_slice(self, arg, *offset, *limit, bindings)
            }
            TupleExpr::Group {
                arg,
                group_by,
                elements,
            } => group::evaluate_group(self, arg, group_by, elements, bindings),
            TupleExpr::ArbitraryLengthPath {
                subject,
                path,
                object,
                context,
                min_length,
            } => path::evaluate_arbitrary_length_path(
                self,
                subject,
                path,
                object,
                context.as_ref(),
                *min_length,
                bindings,
            ),
            TupleExpr::ZeroLengthPath {
                subject,
                object,
                context,
            } => path::evaluate_zero_length_path(self, subject, object, context.as_ref(), bindings),
            TupleExpr::Service {
                service_ref,
                arg,
                silent,
            } => service::evaluate_service(self, service_ref, arg, *silent, bindings),
            TupleExpr::BindingSetAssignment { names, rows } => {
                unary::evaluate_values(names, rows, bindings)
            }
            TupleExpr::SingletonSet => Ok(SingletonIteration::new(bindings.clone()).boxed()),
            TupleExpr::EmptySet => Ok(EmptyIteration.boxed()),
        }
    }
}

/// Builder for [`EvaluationStrategy`]
pub struct EvaluationStrategyBuilder {
    triple_source: Arc<dyn TripleSource>,
    config: EvaluationConfig,
    collections: Option<CollectionFactory>,
    registry: Option<Arc<AggregateFunctionRegistry>>,
    service_resolver: Option<Arc<dyn ServiceResolver>>,
}

impl EvaluationStrategyBuilder {
    pub fn new(triple_source: Arc<dyn TripleSource>) -> Self {
        Self {
            triple_source,
            config: EvaluationConfig::default(),
            collections: None,
            registry: None,
            service_resolver: None,
        }
    }

    pub fn config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this factory instead of one derived from the configuration
    pub fn collection_factory(mut self, factory: CollectionFactory) -> Self {
        self.collections = Some(factory);
        self
    }

    /// Use this registry instead of the global one
    pub fn registry(mut self, registry: Arc<AggregateFunctionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn service_resolver(mut self, resolver: Arc<dyn ServiceResolver>) -> Self {
        self.service_resolver = Some(resolver);
        self
    }

    pub fn build(self) -> EvaluationResult<EvaluationStrategy> {
        self.config
            .validate()
            .map_err(EvaluationError::Configuration)?;

        let collections = self
            .collections
            .unwrap_or_else(|| self.config.collection_factory());
        let registry = self
            .registry
            .unwrap_or_else(AggregateFunctionRegistry::global);

        log::debug!(
            "Building evaluation strategy: max_collection_size={:?}, hash_join={}, service_batch_size={}",
            self.config.max_collection_size,
            self.config.hash_join_enabled,
            self.config.service_batch_size
        );

        Ok(EvaluationStrategy {
            context: Arc::new(EvaluationContext {
                triple_source: self.triple_source,
                collections,
                registry,
                service_resolver: self.service_resolver,
                config: self.config,
                values: Arc::new(ValueEvaluator::new()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::iteration::collect_all;
    use crate::store::MemoryTripleSource;

    #[test]
    fn test_singleton_and_empty() {
        let strategy = EvaluationStrategy::new(Arc::new(MemoryTripleSource::new()));
        let input = Solution::from_pairs([("x", crate::model::Value::integer(1))]);

        let rows = collect_all(
            strategy
                .evaluate(&Arc::new(TupleExpr::SingletonSet), &input)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(rows, vec![input.clone()]);

        let rows = collect_all(
            strategy
                .evaluate(&Arc::new(TupleExpr::EmptySet), &input)
                .unwrap(),
        )
        .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_builder_validates_config() {
        let config = EvaluationConfig {
            max_collection_size: Some(0),
            ..EvaluationConfig::default()
        };
        let result = EvaluationStrategy::builder(Arc::new(MemoryTripleSource::new()))
            .config(config)
            .build();
        assert!(matches!(result, Err(EvaluationError::Configuration(_))));
    }

    #[test]
    fn test_evaluate_query_does_not_share_the_ceiling() {
        let config = EvaluationConfig {
            max_collection_size: Some(4),
            ..EvaluationConfig::default()
        };
        let strategy = EvaluationStrategy::builder(Arc::new(MemoryTripleSource::new()))
            .config(config)
            .build()
            .unwrap();
        let rows = (1..=3)
            .map(|i| vec![Some(crate::model::Value::integer(i))])
            .collect();
        let expr = TupleExpr::order(
            TupleExpr::values(&["n"], rows),
            vec![crate::algebra::OrderElem::asc(crate::algebra::ValueExpr::var("n"))],
        );

        // Each open ORDER holds its three buffered rows
        let mut first = strategy.evaluate_query(&expr, &Solution::new()).unwrap();
        assert!(first.has_next().unwrap());
        let mut second = strategy.evaluate_query(&expr, &Solution::new()).unwrap();
        assert!(second.has_next().unwrap());

        let mut shared = strategy.evaluate(&expr, &Solution::new()).unwrap();
        let mut shared_too = strategy.evaluate(&expr, &Solution::new()).unwrap();
        assert!(shared.has_next().unwrap());
        assert!(matches!(
            shared_too.has_next(),
            Err(EvaluationError::ResourceLimitExceeded { .. })
        ));

        first.close();
        second.close();
        shared.close();
        shared_too.close();
        assert_eq!(strategy.context().collections().budget().used(), 0);
    }

    #[test]
    fn test_for_query_gets_fresh_budget() {
        let config = EvaluationConfig {
            max_collection_size: Some(10),
            ..EvaluationConfig::default()
        };
        let strategy = EvaluationStrategy::builder(Arc::new(MemoryTripleSource::new()))
            .config(config)
            .registry(Arc::new(AggregateFunctionRegistry::new()))
            .build()
            .unwrap();

        strategy.context().collections().budget().acquire(4).unwrap();
        let fresh = strategy.for_query();
        assert_eq!(fresh.context().collections().budget().used(), 0);
        assert_eq!(strategy.context().collections().budget().used(), 4);
        strategy.context().collections().budget().release(4);
    }
}
