// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DISTINCT, REDUCED, UNION, MINUS and INTERSECTION

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, BlockingPhase, CloseableIteration, DelayedIteration, LookAhead,
    LookAheadIteration, SolutionIteration,
};
use super::join::fill_hash_table;
use super::strategy::EvaluationStrategy;
use crate::algebra::TupleExpr;
use crate::binding::{BindingSetKey, Solution};
use crate::collection::{BoundedMultiMap, BoundedQueue, BoundedSet};
use crate::model::Value;
use std::sync::Arc;

/// Iteration that only evaluates `expr` on its first pull
fn delayed(
    strategy: &EvaluationStrategy,
    expr: &Arc<TupleExpr>,
    bindings: &Solution,
) -> SolutionIteration {
    let strategy = strategy.clone();
    let expr = Arc::clone(expr);
    let bindings = bindings.clone();
    DelayedIteration::new(move || strategy.evaluate(&expr, &bindings)).boxed()
}

fn close_slot(slot: &mut Option<SolutionIteration>) {
    if let Some(mut iter) = slot.take() {
        iter.close();
    }
}

pub(crate) fn evaluate_distinct(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    Ok(LookAheadIteration::new(Distinct {
        upstream: Some(upstream),
        seen: strategy.context().collections().make_set(),
    })
    .boxed())
}

/// Emits the first occurrence of each solution
struct Distinct {
    upstream: Option<SolutionIteration>,
    seen: BoundedSet<BindingSetKey>,
}

impl LookAhead<Solution> for Distinct {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        while let Some(row) = next_or_none(upstream)? {
            if self.seen.insert(row.key())? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
        self.seen.clear();
    }
}

pub(crate) fn evaluate_reduced(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    Ok(LookAheadIteration::new(Reduced {
        upstream: Some(upstream),
        previous: None,
    })
    .boxed())
}

/// Drops a solution equal to the one just emitted
struct Reduced {
    upstream: Option<SolutionIteration>,
    previous: Option<Solution>,
}

impl LookAhead<Solution> for Reduced {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(None);
        };
        while let Some(row) = next_or_none(upstream)? {
            if self.previous.as_ref() != Some(&row) {
                self.previous = Some(row.clone());
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.upstream);
        self.previous = None;
    }
}

pub(crate) fn evaluate_union(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    Ok(LookAheadIteration::new(Union {
        parts: vec![delayed(strategy, left, bindings), delayed(strategy, right, bindings)],
        position: 0,
    })
    .boxed())
}

/// Left rows, then right rows
struct Union {
    parts: Vec<SolutionIteration>,
    position: usize,
}

impl LookAhead<Solution> for Union {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        while let Some(part) = self.parts.get_mut(self.position) {
            if let Some(row) = next_or_none(part)? {
                return Ok(Some(row));
            }
            part.close();
            self.position += 1;
        }
        Ok(None)
    }

    fn handle_close(&mut self) {
        for part in self.parts.iter_mut() {
            part.close();
        }
    }
}

pub(crate) fn evaluate_difference(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let left_names = left.binding_names();
    let right_names = right.binding_names();
    // No variable in common: MINUS never removes anything
    if left_names.is_disjoint(&right_names) {
        log::debug!("MINUS operands share no variables, passing left side through");
        return strategy.evaluate(left, bindings);
    }
    let key_names: Vec<String> = left_names.intersection(&right_names).cloned().collect();
    log::debug!("MINUS keyed on {:?}", key_names);
    Ok(LookAheadIteration::new(Minus {
        strategy: strategy.clone(),
        key_names,
        left: Some(delayed(strategy, left, bindings)),
        right: Some(delayed(strategy, right, bindings)),
        keyed: None,
        partial: None,
        phase: BlockingPhase::NotStarted,
    })
    .boxed())
}

/// MINUS: drops left rows compatible with, and sharing a variable with, some right row
///
/// Right rows binding every shared variable are bucketed on those values, so a
/// fully bound left row only checks its own bucket plus the partial rows.
struct Minus {
    strategy: EvaluationStrategy,
    key_names: Vec<String>,
    left: Option<SolutionIteration>,
    right: Option<SolutionIteration>,
    keyed: Option<BoundedMultiMap<Vec<Value>, Solution>>,
    partial: Option<BoundedQueue<Solution>>,
    phase: BlockingPhase,
}

impl Minus {
    fn buffer_right(&mut self) -> EvaluationResult<()> {
        self.phase = BlockingPhase::Buffering;
        let collections = self.strategy.context().collections();
        let mut keyed = collections.make_multimap();
        let mut partial = collections.make_queue();
        if let Some(mut iter) = self.right.take() {
            let result = fill_hash_table(&mut iter, &self.key_names, &mut keyed, &mut partial);
            iter.close();
            result?;
        }
        self.keyed = Some(keyed);
        self.partial = Some(partial);
        self.phase = BlockingPhase::Draining;
        Ok(())
    }

    fn is_removed(&self, row: &Solution) -> bool {
        let (Some(keyed), Some(partial)) = (self.keyed.as_ref(), self.partial.as_ref()) else {
            return false;
        };
        let removes = |r: &Solution| row.shares_variable_with(r) && row.compatible_with(r);
        let key: Option<Vec<Value>> = row.projected_key(&self.key_names).into_iter().collect();
        let keyed_hit = match key {
            Some(key) => keyed.values_for(&key).iter().any(removes),
            None => keyed.values().flatten().any(removes),
        };
        keyed_hit || partial.iter().any(removes)
    }
}

impl LookAhead<Solution> for Minus {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.phase == BlockingPhase::NotStarted {
            self.buffer_right()?;
        }
        loop {
            let Some(left) = self.left.as_mut() else {
                return Ok(None);
            };
            let Some(row) = next_or_none(left)? else {
                return Ok(None);
            };
            if !self.is_removed(&row) {
                return Ok(Some(row));
            }
        }
    }

    fn handle_close(&mut self) {
        self.phase = BlockingPhase::Closed;
        close_slot(&mut self.left);
        close_slot(&mut self.right);
        self.keyed = None;
        self.partial = None;
    }
}

pub(crate) fn evaluate_intersection(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    Ok(LookAheadIteration::new(Intersection {
        strategy: strategy.clone(),
        left: Some(delayed(strategy, left, bindings)),
        right: Some(delayed(strategy, right, bindings)),
        right_keys: None,
        phase: BlockingPhase::NotStarted,
    })
    .boxed())
}

/// Keeps left rows equal to some right row
struct Intersection {
    strategy: EvaluationStrategy,
    left: Option<SolutionIteration>,
    right: Option<SolutionIteration>,
    right_keys: Option<BoundedSet<BindingSetKey>>,
    phase: BlockingPhase,
}

impl Intersection {
    fn buffer_right(&mut self) -> EvaluationResult<()> {
        self.phase = BlockingPhase::Buffering;
        let mut keys = self.strategy.context().collections().make_set();
        if let Some(mut iter) = self.right.take() {
            let result = (|| -> EvaluationResult<()> {
                while let Some(row) = next_or_none(&mut iter)? {
                    keys.insert(row.key())?;
                }
                Ok(())
            })();
            iter.close();
            result?;
        }
        self.right_keys = Some(keys);
        self.phase = BlockingPhase::Draining;
        Ok(())
    }
}

impl LookAhead<Solution> for Intersection {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.phase == BlockingPhase::NotStarted {
            self.buffer_right()?;
        }
        let (Some(left), Some(keys)) = (self.left.as_mut(), self.right_keys.as_ref()) else {
            return Ok(None);
        };
        while let Some(row) = next_or_none(left)? {
            if keys.contains(&row.key()) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn handle_close(&mut self) {
        self.phase = BlockingPhase::Closed;
        close_slot(&mut self.left);
        close_slot(&mut self.right);
        self.right_keys = None;
    }
}
