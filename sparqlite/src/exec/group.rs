// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GROUP BY and aggregation
//!
//! The input is consumed completely before the first group is produced.
//! Each group keeps one accumulator per aggregate:
//! - unary aggregates feed one value per row into a collector
//! - n-ary aggregates feed a tuple, skipping rows with an unbound argument
//! - `COUNT(*)` counts non-empty rows
//!
//! Without GROUP BY variables an empty input still produces one group, so
//! `COUNT(*)` over nothing is 0. With GROUP BY variables it produces none.

use super::error::{EvaluationError, EvaluationResult};
use super::iteration::{
    next_or_none, BlockingPhase, CloseableIteration, LookAhead, LookAheadIteration,
    SolutionIteration,
};
use super::strategy::EvaluationStrategy;
use super::value_eval::ValueEvaluator;
use crate::algebra::{AggregateKind, AggregateOperator, GroupElem, TupleExpr};
use crate::binding::{ArrayBindingSet, BindingSet, BindingSetKey, MutableBindingSet, Solution};
use crate::collection::{BoundedMap, CollectionFactory};
use crate::functions::aggregate_functions::CountCollector;
use crate::functions::{
    builtin_factory, AggregateCollector, AggregateFunction, AggregateFunctionFactory,
    AlwaysTrue, DistinctPredicate, DistinctValues, NaryAggregateFunction,
    NaryAggregateFunctionFactory, NaryEvaluationSteps,
};
use crate::model::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// An aggregate resolved to the function that evaluates it
enum ResolvedAggregate {
    Unary {
        function: Arc<dyn AggregateFunction>,
        factory: Arc<dyn AggregateFunctionFactory>,
    },
    Nary {
        function: Arc<dyn NaryAggregateFunction>,
        factory: Arc<dyn NaryAggregateFunctionFactory>,
    },
    WildcardCount,
}

struct AggregatePlan {
    name: String,
    distinct: bool,
    aggregate: ResolvedAggregate,
}

fn resolve(
    strategy: &EvaluationStrategy,
    operator: &AggregateOperator,
) -> EvaluationResult<ResolvedAggregate> {
    let values = strategy.context().values();
    let compile = |index: usize| ValueEvaluator::compile(values, operator.args[index].clone());

    if operator.kind == AggregateKind::Count && operator.args.is_empty() {
        return Ok(ResolvedAggregate::WildcardCount);
    }

    if let Some(factory) = builtin_factory(&operator.kind) {
        if operator.args.len() != 1 {
            return Err(EvaluationError::InvalidQuery(format!(
                "{} takes one argument, got {}",
                factory.iri(),
                operator.args.len()
            )));
        }
        return Ok(ResolvedAggregate::Unary {
            function: factory.build_function(compile(0)),
            factory,
        });
    }

    let AggregateKind::Custom(iri) = &operator.kind else {
        return Err(EvaluationError::UnknownAggregateFunction(format!(
            "{:?}",
            operator.kind
        )));
    };
    let registry = strategy.context().registry();
    if operator.args.len() == 1 {
        if let Some(factory) = registry.get(iri) {
            return Ok(ResolvedAggregate::Unary {
                function: factory.build_function(compile(0)),
                factory,
            });
        }
    }
    if let Some(factory) = registry.get_nary(iri) {
        let steps = (0..operator.args.len()).map(compile).collect();
        return Ok(ResolvedAggregate::Nary {
            function: factory.build_function(NaryEvaluationSteps::new(steps)),
            factory,
        });
    }
    Err(EvaluationError::UnknownAggregateFunction(iri.clone()))
}

/// Per-group running state of one aggregate
enum Accumulator {
    Unary {
        distinct: Box<dyn DistinctPredicate<Value>>,
        collector: Box<dyn AggregateCollector>,
    },
    Nary {
        distinct: Box<dyn DistinctPredicate<Vec<Value>>>,
        collector: Box<dyn AggregateCollector>,
    },
    WildcardCount {
        distinct: Box<dyn DistinctPredicate<BindingSetKey>>,
        collector: CountCollector,
    },
}

fn distinct_predicate<D>(distinct: bool, collections: &CollectionFactory) -> Box<dyn DistinctPredicate<D>>
where
    D: Eq + std::hash::Hash + Clone + Send + 'static,
{
    if distinct {
        Box::new(DistinctValues::new(collections))
    } else {
        Box::new(AlwaysTrue)
    }
}

impl AggregatePlan {
    fn accumulator(&self, collections: &CollectionFactory) -> Accumulator {
        match &self.aggregate {
            ResolvedAggregate::Unary { factory, .. } => Accumulator::Unary {
                distinct: distinct_predicate(self.distinct, collections),
                collector: factory.collector(),
            },
            ResolvedAggregate::Nary { factory, .. } => Accumulator::Nary {
                distinct: distinct_predicate(self.distinct, collections),
                collector: factory.collector(),
            },
            ResolvedAggregate::WildcardCount => Accumulator::WildcardCount {
                distinct: distinct_predicate(self.distinct, collections),
                collector: CountCollector::default(),
            },
        }
    }

    fn process(&self, accumulator: &mut Accumulator, row: &Solution) -> EvaluationResult<()> {
        match (&self.aggregate, accumulator) {
            (
                ResolvedAggregate::Unary { function, .. },
                Accumulator::Unary {
                    distinct,
                    collector,
                },
            ) => function.process_aggregate(row, distinct.as_mut(), collector.as_mut()),
            (
                ResolvedAggregate::Nary { function, .. },
                Accumulator::Nary {
                    distinct,
                    collector,
                },
            ) => function.process_aggregate(row, distinct.as_mut(), collector.as_mut()),
            (
                ResolvedAggregate::WildcardCount,
                Accumulator::WildcardCount {
                    distinct,
                    collector,
                },
            ) => {
                if !row.is_empty() && distinct.test(&row.key())? {
                    collector.increment();
                }
                Ok(())
            }
            _ => Err(EvaluationError::InvalidQuery(format!(
                "accumulator does not match aggregate ?{}",
                self.name
            ))),
        }
    }

    /// Final value; a type error leaves the aggregate unbound
    fn finish(&self, accumulator: &Accumulator) -> EvaluationResult<Option<Value>> {
        let result = match accumulator {
            Accumulator::Unary { collector, .. } | Accumulator::Nary { collector, .. } => {
                collector.final_value()
            }
            Accumulator::WildcardCount { collector, .. } => collector.final_value(),
        };
        match result {
            Err(e) if e.is_value_expression_error() => {
                log::warn!("Aggregate ?{} left unbound: {}", self.name, e);
                Ok(None)
            }
            other => other,
        }
    }
}

struct Group {
    keys: Vec<Option<Value>>,
    accumulators: Vec<Accumulator>,
}

pub(crate) fn evaluate_group(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    group_by: &[String],
    elements: &[GroupElem],
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let plans = elements
        .iter()
        .map(|element| {
            Ok(AggregatePlan {
                name: element.name.clone(),
                distinct: element.operator.distinct,
                aggregate: resolve(strategy, &element.operator)?,
            })
        })
        .collect::<EvaluationResult<Vec<_>>>()?;

    let upstream = strategy.evaluate(arg, bindings)?;
    let output_names: Arc<[String]> = group_by
        .iter()
        .chain(elements.iter().map(|e| &e.name))
        .cloned()
        .collect();
    log::debug!(
        "Group: by {:?}, {} aggregates",
        group_by,
        plans.len()
    );
    Ok(LookAheadIteration::new(GroupIteration {
        collections: strategy.context().collections().clone(),
        group_by: group_by.to_vec(),
        plans,
        output_names,
        parent: bindings.clone(),
        upstream: Some(upstream),
        output: VecDeque::new(),
        phase: BlockingPhase::NotStarted,
    })
    .boxed())
}

struct GroupIteration {
    collections: CollectionFactory,
    group_by: Vec<String>,
    plans: Vec<AggregatePlan>,
    output_names: Arc<[String]>,
    parent: Solution,
    upstream: Option<SolutionIteration>,
    output: VecDeque<Solution>,
    phase: BlockingPhase,
}

impl GroupIteration {
    fn new_group(&self, keys: Vec<Option<Value>>) -> Group {
        Group {
            keys,
            accumulators: self
                .plans
                .iter()
                .map(|plan| plan.accumulator(&self.collections))
                .collect(),
        }
    }

    fn consume(&mut self) -> EvaluationResult<Vec<Group>> {
        let mut index: BoundedMap<Vec<Option<Value>>, usize> = self.collections.make_map();
        let mut groups: Vec<Group> = Vec::new();
        let Some(mut upstream) = self.upstream.take() else {
            return Ok(groups);
        };

        let result = (|| -> EvaluationResult<()> {
            while let Some(row) = next_or_none(&mut upstream)? {
                let keys = row.projected_key(&self.group_by);
                let position = match index.get(&keys) {
                    Some(position) => *position,
                    None => {
                        groups.push(self.new_group(keys.clone()));
                        index.insert(keys, groups.len() - 1)?;
                        groups.len() - 1
                    }
                };
                let group = &mut groups[position];
                for (plan, accumulator) in self.plans.iter().zip(group.accumulators.iter_mut()) {
                    plan.process(accumulator, &row)?;
                }
            }
            Ok(())
        })();
        upstream.close();
        result?;

        if groups.is_empty() && self.group_by.is_empty() {
            groups.push(self.new_group(Vec::new()));
        }
        Ok(groups)
    }

    fn to_solution(&self, group: &Group) -> EvaluationResult<Solution> {
        let mut values: Vec<Option<Value>> = group.keys.clone();
        for (plan, accumulator) in self.plans.iter().zip(&group.accumulators) {
            values.push(plan.finish(accumulator)?);
        }

        if self.parent.is_empty() {
            let mut row = ArrayBindingSet::new(Arc::clone(&self.output_names));
            for (position, value) in values.into_iter().enumerate() {
                row.set_at(position, value);
            }
            return Ok(Solution::Array(row));
        }
        let mut row = self.parent.clone();
        for (name, value) in self.output_names.iter().zip(values) {
            if let Some(value) = value {
                row.add_binding(name, value);
            }
        }
        Ok(row)
    }
}

impl LookAhead<Solution> for GroupIteration {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.phase == BlockingPhase::NotStarted {
            self.phase = BlockingPhase::Buffering;
            let groups = self.consume()?;
            log::debug!("Group: {} groups", groups.len());
            for group in &groups {
                let row = self.to_solution(group)?;
                self.output.push_back(row);
            }
            self.phase = BlockingPhase::Draining;
        }
        Ok(self.output.pop_front())
    }

    fn handle_close(&mut self) {
        self.phase = BlockingPhase::Closed;
        if let Some(mut upstream) = self.upstream.take() {
            upstream.close();
        }
        self.output.clear();
    }
}
