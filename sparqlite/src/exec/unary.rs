// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row-at-a-time operators: FILTER, projection, BIND, slice and VALUES

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, CloseableIteration, LookAhead, LookAheadIteration, SolutionIteration,
    VecIteration,
};
use super::strategy::EvaluationStrategy;
use crate::algebra::{ExtensionElem, ProjectionElem, TupleExpr, ValueExpr};
use crate::binding::{ArrayBindingSet, BindingSet, MutableBindingSet, Solution};
use crate::model::Value;
use std::sync::Arc;

fn close_slot(slot: &mut Option<SolutionIteration>) {
    if let Some(mut iter) = slot.take() {
        iter.close();
    }
}

// ============================================================================
// FILTER
// ============================================================================

pub(crate) fn evaluate_filter(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    condition: &ValueExpr,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    Ok(LookAheadIteration::new(Filter {
        strategy: strategy.clone(),
        condition: condition.clone(),
        upstream: Some(upstream),
    })
    .boxed())
}

struct Filter {
    strategy: EvaluationStrategy,
    condition: ValueExpr,
    upstream: Option<SolutionIteration>,
}

impl LookAhead<Solution> for Filter {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        let values = self.strategy.context().values();
        while let Some(row) = next_or_none(upstream)? {
            if values.is_true(&self.condition, &row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
    }
}

// ============================================================================
// Projection
// ============================================================================

pub(crate) fn evaluate_projection(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    elements: &[ProjectionElem],
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    let targets: Arc<[String]> = elements.iter().map(|e| e.target.clone()).collect();
    Ok(LookAheadIteration::new(Projection {
        elements: elements.to_vec(),
        targets,
        parent: bindings.clone(),
        upstream: Some(upstream),
    })
    .boxed())
}

/// Keeps the projected variables; input bindings not shadowed by a target pass through
struct Projection {
    elements: Vec<ProjectionElem>,
    targets: Arc<[String]>,
    parent: Solution,
    upstream: Option<SolutionIteration>,
}

impl Projection {
    fn project(&self, row: &Solution) -> Solution {
        let mut projected = ArrayBindingSet::new(Arc::clone(&self.targets));
        for (index, element) in self.elements.iter().enumerate() {
            projected.set_at(index, row.value(&element.source).cloned());
        }
        let mut projected = Solution::Array(projected);
        for binding in self.parent.iter() {
            if !self.targets.iter().any(|t| t == binding.name) {
                projected.add_binding(binding.name, binding.value.clone());
            }
        }
        projected
    }
}

impl LookAhead<Solution> for Projection {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        match next_or_none(upstream)? {
            Some(row) => Ok(Some(self.project(&row))),
            None => Ok(None),
        }
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
    }
}

// ============================================================================
// Extension (BIND)
// ============================================================================

pub(crate) fn evaluate_extension(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    elements: &[ExtensionElem],
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    Ok(LookAheadIteration::new(Extension {
        strategy: strategy.clone(),
        elements: elements.to_vec(),
        upstream: Some(upstream),
    })
    .boxed())
}

/// Binds each element in order; a type error leaves the variable unbound
struct Extension {
    strategy: EvaluationStrategy,
    elements: Vec<ExtensionElem>,
    upstream: Option<SolutionIteration>,
}

impl LookAhead<Solution> for Extension {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        let Some(mut row) = next_or_none(upstream)? else {
            return Ok(None);
        };
        let values = self.strategy.context().values();
        for element in &self.elements {
            if let Some(value) = values.evaluate_optional(&element.expr, &row)? {
                row.add_binding(&element.name, value);
            }
        }
        Ok(Some(row))
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
    }
}

// ============================================================================
// Slice (OFFSET / LIMIT)
// ============================================================================

pub(crate) fn evaluate_slice(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    offset: u64,
    limit: Option<u64>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    if limit == Some(0) {
        return Ok(VecIteration::new(Vec::new()).boxed());
    }
    let upstream = strategy.evaluate(arg, bindings)?;
    Ok(LookAheadIteration::new(Slice {
        upstream: Some(upstream),
        to_skip: offset,
        remaining: limit,
    })
    .boxed())
}

struct Slice {
    upstream: Option<SolutionIteration>,
    to_skip: u64,
    remaining: Option<u64>,
}

impl LookAhead<Solution> for Slice {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.remaining == Some(0) {
            // Upstream is released as soon as the limit is reached
            close_slot(&mut self.upstream);
            return Ok(None);
        }
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        while self.to_skip > 0 {
            if next_or_none(upstream)?.is_none() {
                return Ok(None);
            }
            self.to_skip -= 1;
        }
        let row = next_or_none(upstream)?;
        if row.is_some() {
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
                if *remaining == 0 {
                    close_slot(&mut self.upstream);
                }
            }
        }
        Ok(row)
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// Inline rows compatible with the input, merged with it
pub(crate) fn evaluate_values(
    names: &[String],
    rows: &[Vec<Option<Value>>],
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let names: Arc<[String]> = names.iter().cloned().collect();
    let mut output = Vec::with_capacity(rows.len());
    for cells in rows {
        let mut row = ArrayBindingSet::new(Arc::clone(&names));
        for (index, cell) in cells.iter().enumerate() {
            row.set_at(index, cell.clone());
        }
        let row = Solution::Array(row);
        if bindings.is_empty() {
            output.push(row);
        } else if bindings.compatible_with(&row) {
            output.push(bindings.merged_with(&row));
        }
    }
    Ok(VecIteration::new(output).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{CompareOp, MathOp, Var};
    use crate::exec::iteration::collect_all;
    use crate::store::MemoryTripleSource;

    fn strategy() -> EvaluationStrategy {
        EvaluationStrategy::new(Arc::new(MemoryTripleSource::new()))
    }

    fn numbers(values: &[i64]) -> Arc<TupleExpr> {
        TupleExpr::values(
            &["n"],
            values.iter().map(|v| vec![Some(Value::integer(*v))]).collect(),
        )
    }

    fn run(expr: &Arc<TupleExpr>) -> Vec<Solution> {
        collect_all(strategy().evaluate(expr, &Solution::new()).unwrap()).unwrap()
    }

    #[test]
    fn test_filter_treats_type_error_as_false() {
        let input = TupleExpr::values(
            &["n"],
            vec![
                vec![Some(Value::integer(5))],
                vec![Some(Value::from("five"))],
                vec![Some(Value::integer(1))],
            ],
        );
        let expr = TupleExpr::filter(
            input,
            ValueExpr::compare(ValueExpr::var("n"), CompareOp::Gt, ValueExpr::constant(2i64)),
        );
        assert_eq!(run(&expr), vec![Solution::from_pairs([("n", Value::integer(5))])]);
    }

    #[test]
    fn test_extension_leaves_var_unbound_on_error() {
        let input = TupleExpr::values(
            &["n"],
            vec![vec![Some(Value::integer(2))], vec![Some(Value::from("x"))]],
        );
        let expr = TupleExpr::extend(
            input,
            "double",
            ValueExpr::math(ValueExpr::var("n"), MathOp::Multiply, ValueExpr::constant(2i64)),
        );
        let rows = run(&expr);
        assert_eq!(rows[0].value("double"), Some(&Value::integer(4)));
        assert!(!rows[1].has_binding("double"));
        assert!(rows[1].has_binding("n"));
    }

    #[test]
    fn test_projection_renames_and_keeps_parent() {
        let input = TupleExpr::pattern(Var::new("s"), Var::new("p"), Var::new("o"));
        let source = MemoryTripleSource::new();
        source.add_triple(Value::iri("http://e/a"), Value::iri("http://e/p"), Value::integer(1));
        let strategy = EvaluationStrategy::new(Arc::new(source));

        let expr = Arc::new(TupleExpr::Projection {
            arg: input,
            elements: vec![ProjectionElem::renamed("o", "value")],
        });
        let parent = Solution::from_pairs([("outer", Value::integer(9))]);
        let rows = collect_all(strategy.evaluate(&expr, &parent).unwrap()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("value"), Some(&Value::integer(1)));
        assert_eq!(rows[0].value("outer"), Some(&Value::integer(9)));
        assert!(!rows[0].has_binding("s"));
    }

    #[test]
    fn test_slice() {
        let expr = TupleExpr::slice(numbers(&[1, 2, 3, 4, 5]), 1, Some(2));
        let rows = run(&expr);
        assert_eq!(
            rows,
            vec![
                Solution::from_pairs([("n", Value::integer(2))]),
                Solution::from_pairs([("n", Value::integer(3))]),
            ]
        );
        assert!(run(&TupleExpr::slice(numbers(&[1]), 0, Some(0))).is_empty());
        assert_eq!(run(&TupleExpr::slice(numbers(&[1, 2, 3]), 2, None)).len(), 1);
    }

    #[test]
    fn test_values_with_undef_joins_input() {
        let rows = vec![
            vec![Some(Value::integer(1)), None],
            vec![Some(Value::integer(2)), Some(Value::integer(20))],
        ];
        let names = vec!["a".to_string(), "b".to_string()];

        let all = collect_all(evaluate_values(&names, &rows, &Solution::new()).unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[0].has_binding("b"));

        let input = Solution::from_pairs([("b", Value::integer(20))]);
        let matched = collect_all(evaluate_values(&names, &rows, &input).unwrap()).unwrap();
        // UNDEF is compatible with anything
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].value("b"), Some(&Value::integer(20)));
        assert_eq!(matched[1].value("a"), Some(&Value::integer(2)));

        let input = Solution::from_pairs([("a", Value::integer(3))]);
        assert!(collect_all(evaluate_values(&names, &rows, &input).unwrap())
            .unwrap()
            .is_empty());
    }
}
