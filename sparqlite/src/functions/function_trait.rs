// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Aggregate function traits
//!
//! An aggregate is split in three parts: the function (how one input row is
//! turned into a value and fed forward), the distinct predicate (whether that
//! value was already seen in the current group) and the collector (the
//! running state whose final value becomes the aggregate result).

use crate::binding::Solution;
use crate::exec::error::{EvaluationError, EvaluationResult};
use crate::model::Value;
use std::fmt;
use std::sync::Arc;

/// Compiled value expression: binding set to optional scalar
///
/// Steps built by the engine already map type errors to `Ok(None)`; any
/// error they still return aborts the query.
pub type ValueEvaluationStep = Arc<dyn Fn(&Solution) -> EvaluationResult<Option<Value>> + Send + Sync>;

/// Index-addressed argument steps of an n-ary aggregate
#[derive(Clone, Default)]
pub struct NaryEvaluationSteps {
    steps: Vec<ValueEvaluationStep>,
}

impl NaryEvaluationSteps {
    pub fn new(steps: Vec<ValueEvaluationStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ValueEvaluationStep> {
        self.steps.get(index)
    }

    /// Evaluate argument `index`; out-of-range indexes are an invalid query
    pub fn evaluate(&self, index: usize, bindings: &Solution) -> EvaluationResult<Option<Value>> {
        match self.steps.get(index) {
            Some(step) => step(bindings),
            None => Err(EvaluationError::InvalidQuery(format!(
                "aggregate argument {} out of range ({} arguments)",
                index,
                self.steps.len()
            ))),
        }
    }

    pub fn evaluate_all(&self, bindings: &Solution) -> EvaluationResult<Vec<Option<Value>>> {
        self.steps.iter().map(|step| step(bindings)).collect()
    }
}

impl fmt::Debug for NaryEvaluationSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NaryEvaluationSteps")
            .field("len", &self.steps.len())
            .finish()
    }
}

/// Per-group "have I seen this before" test
pub trait DistinctPredicate<D>: Send {
    /// True if `value` should be counted: first occurrence, or distinctness is off
    fn test(&mut self, value: &D) -> EvaluationResult<bool>;
}

/// Running state of one aggregate within one group
pub trait AggregateCollector: Send {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()>;

    /// Tuple input for n-ary aggregates
    fn accept_tuple(&mut self, values: &[Value]) -> EvaluationResult<()> {
        let _ = values;
        Err(EvaluationError::UnsupportedOperator(
            "collector does not accept tuples".to_string(),
        ))
    }

    /// Result for the group; `Ok(None)` leaves the aggregate unbound
    fn final_value(&self) -> EvaluationResult<Option<Value>>;
}

/// Unary aggregate function
pub trait AggregateFunction: Send + Sync {
    fn evaluation_step(&self) -> &ValueEvaluationStep;

    fn evaluate(&self, bindings: &Solution) -> EvaluationResult<Option<Value>> {
        (self.evaluation_step())(bindings)
    }

    /// Feed one input row of the group into the collector
    fn process_aggregate(
        &self,
        bindings: &Solution,
        distinct: &mut dyn DistinctPredicate<Value>,
        collector: &mut dyn AggregateCollector,
    ) -> EvaluationResult<()> {
        if let Some(value) = self.evaluate(bindings)? {
            if distinct.test(&value)? {
                collector.accept(&value)?;
            }
        }
        Ok(())
    }
}

/// N-ary aggregate function
pub trait NaryAggregateFunction: Send + Sync {
    fn evaluation_steps(&self) -> &NaryEvaluationSteps;

    /// Rows with any unbound argument are skipped
    fn process_aggregate(
        &self,
        bindings: &Solution,
        distinct: &mut dyn DistinctPredicate<Vec<Value>>,
        collector: &mut dyn AggregateCollector,
    ) -> EvaluationResult<()> {
        let values = self.evaluation_steps().evaluate_all(bindings)?;
        let tuple: Option<Vec<Value>> = values.into_iter().collect();
        if let Some(tuple) = tuple {
            if distinct.test(&tuple)? {
                collector.accept_tuple(&tuple)?;
            }
        }
        Ok(())
    }
}

/// Builds unary aggregate functions and their collectors
pub trait AggregateFunctionFactory: Send + Sync {
    /// Identifying IRI (built-ins use a `urn:aggregate:` name)
    fn iri(&self) -> &str;

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction>;

    /// Fresh collector for one group
    fn collector(&self) -> Box<dyn AggregateCollector>;
}

/// Builds n-ary aggregate functions and their collectors
pub trait NaryAggregateFunctionFactory: Send + Sync {
    fn iri(&self) -> &str;

    fn build_function(&self, steps: NaryEvaluationSteps) -> Arc<dyn NaryAggregateFunction>;

    fn collector(&self) -> Box<dyn AggregateCollector>;
}

/// Unary function that just runs its step through the default processing
pub struct StepAggregate {
    step: ValueEvaluationStep,
}

impl StepAggregate {
    pub fn new(step: ValueEvaluationStep) -> Self {
        Self { step }
    }
}

impl AggregateFunction for StepAggregate {
    fn evaluation_step(&self) -> &ValueEvaluationStep {
        &self.step
    }
}

/// N-ary counterpart of [`StepAggregate`]
pub struct StepNaryAggregate {
    steps: NaryEvaluationSteps,
}

impl StepNaryAggregate {
    pub fn new(steps: NaryEvaluationSteps) -> Self {
        Self { steps }
    }
}

impl NaryAggregateFunction for StepNaryAggregate {
    fn evaluation_steps(&self) -> &NaryEvaluationSteps {
        &self.steps
    }
}
