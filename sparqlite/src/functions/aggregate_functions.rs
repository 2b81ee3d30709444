// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Built-in aggregate functions
//!
//! - COUNT: counts bound argument values
//! - SUM: numeric sum with type promotion
//! - MIN / MAX: extremes under term ordering
//! - AVG: arithmetic mean
//! - SAMPLE: an arbitrary (here: the first) value
//! - GROUP_CONCAT: string concatenation with a separator
//!
//! `COUNT(*)` counts rows rather than values and is handled by the group
//! operator itself.

use super::function_trait::{
    AggregateCollector, AggregateFunction, AggregateFunctionFactory, StepAggregate,
    ValueEvaluationStep,
};
use crate::algebra::{AggregateKind, MathOp};
use crate::exec::error::{EvaluationError, EvaluationResult};
use crate::exec::value_eval::compute;
use crate::model::{compare_terms, Numeric, Value};
use std::cmp::Ordering;
use std::sync::Arc;

pub const COUNT_IRI: &str = "urn:aggregate:count";
pub const SUM_IRI: &str = "urn:aggregate:sum";
pub const MIN_IRI: &str = "urn:aggregate:min";
pub const MAX_IRI: &str = "urn:aggregate:max";
pub const AVG_IRI: &str = "urn:aggregate:avg";
pub const SAMPLE_IRI: &str = "urn:aggregate:sample";
pub const GROUP_CONCAT_IRI: &str = "urn:aggregate:group_concat";

/// Separator used by GROUP_CONCAT when none is given
pub const DEFAULT_SEPARATOR: &str = " ";

/// Factory for a built-in aggregate kind; `None` for custom aggregates
pub fn builtin_factory(kind: &AggregateKind) -> Option<Arc<dyn AggregateFunctionFactory>> {
    let factory: Arc<dyn AggregateFunctionFactory> = match kind {
        AggregateKind::Count => Arc::new(CountFactory),
        AggregateKind::Sum => Arc::new(SumFactory),
        AggregateKind::Min => Arc::new(MinFactory),
        AggregateKind::Max => Arc::new(MaxFactory),
        AggregateKind::Avg => Arc::new(AvgFactory),
        AggregateKind::Sample => Arc::new(SampleFactory),
        AggregateKind::GroupConcat { separator } => {
            Arc::new(GroupConcatFactory::new(separator.clone()))
        }
        AggregateKind::Custom(_) => return None,
    };
    Some(factory)
}

fn step_function(step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
    Arc::new(StepAggregate::new(step))
}

// ==============================================================================
// COUNT FUNCTION
// ==============================================================================

/// COUNT(expr) - number of rows where the argument is bound
#[derive(Debug, Default)]
pub struct CountFactory;

impl AggregateFunctionFactory for CountFactory {
    fn iri(&self) -> &str {
        COUNT_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(CountCollector::default())
    }
}

#[derive(Debug, Default)]
pub struct CountCollector {
    count: i64,
}

impl CountCollector {
    /// Count one row without looking at a value (`COUNT(*)`)
    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> i64 {
        self.count
    }
}

impl AggregateCollector for CountCollector {
    fn accept(&mut self, _value: &Value) -> EvaluationResult<()> {
        self.increment();
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        Ok(Some(Value::integer(self.count)))
    }
}

// ==============================================================================
// SUM FUNCTION
// ==============================================================================

/// SUM(expr) - numeric sum, integer 0 for an empty group
#[derive(Debug, Default)]
pub struct SumFactory;

impl AggregateFunctionFactory for SumFactory {
    fn iri(&self) -> &str {
        SUM_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(SumCollector::default())
    }
}

/// Running numeric sum; the first type error sticks
#[derive(Debug)]
pub struct SumCollector {
    sum: Numeric,
    count: i64,
    error: Option<EvaluationError>,
}

impl Default for SumCollector {
    fn default() -> Self {
        Self {
            sum: Numeric::Integer(0),
            count: 0,
            error: None,
        }
    }
}

impl SumCollector {
    fn add(&mut self, value: &Value) {
        if self.error.is_some() {
            return;
        }
        let result = match value.as_numeric() {
            Some(n) => compute(self.sum, n, MathOp::Add),
            None => Err(EvaluationError::type_error(format!(
                "not a number: {}",
                value
            ))),
        };
        match result {
            Ok(sum) => {
                self.sum = sum;
                self.count += 1;
            }
            Err(e) => self.error = Some(e),
        }
    }

    fn checked_sum(&self) -> EvaluationResult<Numeric> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.sum),
        }
    }
}

impl AggregateCollector for SumCollector {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()> {
        self.add(value);
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        Ok(Some(self.checked_sum()?.into_value()))
    }
}

// ==============================================================================
// AVG FUNCTION
// ==============================================================================

/// AVG(expr) - sum divided by count, integer 0 for an empty group
#[derive(Debug, Default)]
pub struct AvgFactory;

impl AggregateFunctionFactory for AvgFactory {
    fn iri(&self) -> &str {
        AVG_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(AvgCollector::default())
    }
}

#[derive(Debug, Default)]
pub struct AvgCollector {
    sum: SumCollector,
}

impl AggregateCollector for AvgCollector {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()> {
        self.sum.add(value);
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        let sum = self.sum.checked_sum()?;
        if self.sum.count == 0 {
            return Ok(Some(Value::integer(0)));
        }
        let average = compute(sum, Numeric::Integer(self.sum.count), MathOp::Divide)?;
        Ok(Some(average.into_value()))
    }
}

// ==============================================================================
// MIN / MAX FUNCTIONS
// ==============================================================================

/// MIN(expr) - smallest value, unbound for an empty group
#[derive(Debug, Default)]
pub struct MinFactory;

impl AggregateFunctionFactory for MinFactory {
    fn iri(&self) -> &str {
        MIN_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(ExtremeCollector::new(Ordering::Less))
    }
}

/// MAX(expr) - largest value, unbound for an empty group
#[derive(Debug, Default)]
pub struct MaxFactory;

impl AggregateFunctionFactory for MaxFactory {
    fn iri(&self) -> &str {
        MAX_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(ExtremeCollector::new(Ordering::Greater))
    }
}

/// Keeps the value that compares `wanted` against every other
#[derive(Debug)]
pub struct ExtremeCollector {
    wanted: Ordering,
    value: Option<Value>,
}

impl ExtremeCollector {
    pub fn new(wanted: Ordering) -> Self {
        Self {
            wanted,
            value: None,
        }
    }
}

impl AggregateCollector for ExtremeCollector {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()> {
        let replace = match &self.value {
            None => true,
            Some(current) => compare_terms(Some(value), Some(current)) == self.wanted,
        };
        if replace {
            self.value = Some(value.clone());
        }
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        Ok(self.value.clone())
    }
}

// ==============================================================================
// SAMPLE FUNCTION
// ==============================================================================

/// SAMPLE(expr) - the first value seen in the group
#[derive(Debug, Default)]
pub struct SampleFactory;

impl AggregateFunctionFactory for SampleFactory {
    fn iri(&self) -> &str {
        SAMPLE_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(SampleCollector::default())
    }
}

#[derive(Debug, Default)]
pub struct SampleCollector {
    value: Option<Value>,
}

impl AggregateCollector for SampleCollector {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()> {
        if self.value.is_none() {
            self.value = Some(value.clone());
        }
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        Ok(self.value.clone())
    }
}

// ==============================================================================
// GROUP_CONCAT FUNCTION
// ==============================================================================

/// GROUP_CONCAT(expr; SEPARATOR=sep) - lexical forms joined by `sep`
#[derive(Debug)]
pub struct GroupConcatFactory {
    separator: String,
}

impl GroupConcatFactory {
    pub fn new(separator: Option<String>) -> Self {
        Self {
            separator: separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_string()),
        }
    }
}

impl Default for GroupConcatFactory {
    fn default() -> Self {
        Self::new(None)
    }
}

impl AggregateFunctionFactory for GroupConcatFactory {
    fn iri(&self) -> &str {
        GROUP_CONCAT_IRI
    }

    fn build_function(&self, step: ValueEvaluationStep) -> Arc<dyn AggregateFunction> {
        step_function(step)
    }

    fn collector(&self) -> Box<dyn AggregateCollector> {
        Box::new(ConcatCollector::new(self.separator.clone()))
    }
}

#[derive(Debug)]
pub struct ConcatCollector {
    separator: String,
    buffer: String,
    empty: bool,
}

impl ConcatCollector {
    pub fn new(separator: String) -> Self {
        Self {
            separator,
            buffer: String::new(),
            empty: true,
        }
    }
}

impl AggregateCollector for ConcatCollector {
    fn accept(&mut self, value: &Value) -> EvaluationResult<()> {
        if !self.empty {
            self.buffer.push_str(&self.separator);
        }
        self.buffer.push_str(value.string_value());
        self.empty = false;
        Ok(())
    }

    fn final_value(&self) -> EvaluationResult<Option<Value>> {
        Ok(Some(Value::literal(self.buffer.clone())))
    }
}
