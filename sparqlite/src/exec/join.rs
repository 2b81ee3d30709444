// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join operators
//!
//! Algorithm selection happens per evaluation:
//! - right side is a SERVICE: vectored service join (see [`super::service`])
//! - right side contains a sub-select and hash joins are enabled: hash join
//! - otherwise: nested-loop join, right side re-evaluated per left row

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, BlockingPhase, CloseableIteration, LookAhead, LookAheadIteration,
    SolutionIteration,
};
use super::service;
use super::strategy::EvaluationStrategy;
use crate::algebra::{TupleExpr, ValueExpr};
use crate::binding::Solution;
use crate::collection::{BoundedMultiMap, BoundedQueue};
use crate::model::Value;
use std::collections::VecDeque;
use std::sync::Arc;

pub(crate) fn evaluate_join(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    // A service IRI that varies per left row falls through to the nested loop
    if let TupleExpr::Service {
        service_ref,
        arg,
        silent,
    } = right.as_ref()
    {
        if service::service_iri(service_ref, bindings).is_some() {
            log::debug!("Join: service join against ?{}", service_ref.name);
            let left_iter = strategy.evaluate(left, bindings)?;
            return service::service_join(strategy, left_iter, service_ref, arg, *silent, bindings);
        }
    }

    if strategy.config().hash_join_enabled && right.contains_projection() {
        let join_names: Vec<String> = left
            .binding_names()
            .intersection(&right.binding_names())
            .cloned()
            .collect();
        log::debug!("Join: hash join on {:?}", join_names);
        let left_iter = strategy.evaluate(left, bindings)?;
        return Ok(LookAheadIteration::new(HashJoin {
            strategy: strategy.clone(),
            right: Arc::clone(right),
            bindings: bindings.clone(),
            join_names,
            left: Some(left_iter),
            keyed: None,
            partial: None,
            pending: VecDeque::new(),
            phase: BlockingPhase::NotStarted,
        })
        .boxed());
    }

    log::debug!("Join: nested loop over {}", right.node_type());
    let left_iter = strategy.evaluate(left, bindings)?;
    Ok(LookAheadIteration::new(NestedLoopJoin {
        strategy: strategy.clone(),
        right: Arc::clone(right),
        left: Some(left_iter),
        current: None,
    })
    .boxed())
}

pub(crate) fn evaluate_left_join(
    strategy: &EvaluationStrategy,
    left: &Arc<TupleExpr>,
    right: &Arc<TupleExpr>,
    condition: Option<&ValueExpr>,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let left_iter = strategy.evaluate(left, bindings)?;
    Ok(LookAheadIteration::new(LeftJoin {
        strategy: strategy.clone(),
        right: Arc::clone(right),
        condition: condition.cloned(),
        left: Some(left_iter),
        current: None,
    })
    .boxed())
}

fn close_slot(slot: &mut Option<SolutionIteration>) {
    if let Some(mut iter) = slot.take() {
        iter.close();
    }
}

/// Right side re-evaluated with each left row as input
struct NestedLoopJoin {
    strategy: EvaluationStrategy,
    right: Arc<TupleExpr>,
    left: Option<SolutionIteration>,
    current: Option<SolutionIteration>,
}

impl LookAhead<Solution> for NestedLoopJoin {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(row) = next_or_none(current)? {
                    return Ok(Some(row));
                }
                close_slot(&mut self.current);
            }

            let Some(left) = self.left.as_mut() else {
                return Ok(None);
            };
            let Some(left_row) = next_or_none(left)? else {
                return Ok(None);
            };
            self.current = Some(self.strategy.evaluate(&self.right, &left_row)?);
        }
    }

    fn handle_close(&mut self) {
        close_slot(&mut self.current);
        close_slot(&mut self.left);
    }
}

/// OPTIONAL: right matches that pass the condition, or the left row alone
struct LeftJoin {
    strategy: EvaluationStrategy,
    right: Arc<TupleExpr>,
    condition: Option<ValueExpr>,
    left: Option<SolutionIteration>,
    /// Left row being extended, its right iteration and whether it matched
    current: Option<(Solution, SolutionIteration, bool)>,
}

impl LookAhead<Solution> for LeftJoin {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        loop {
            if let Some((left_row, right_iter, matched)) = self.current.as_mut() {
                while let Some(row) = next_or_none(right_iter)? {
                    let accepted = match &self.condition {
                        Some(condition) => self
                            .strategy
                            .context()
                            .values()
                            .is_true(condition, &row)?,
                        None => true,
                    };
                    if accepted {
                        *matched = true;
                        return Ok(Some(row));
                    }
                }
                let unmatched = (!*matched).then(|| left_row.clone());
                if let Some((_, mut right_iter, _)) = self.current.take() {
                    right_iter.close();
                }
                if unmatched.is_some() {
                    return Ok(unmatched);
                }
            }

            let Some(left) = self.left.as_mut() else {
                return Ok(None);
            };
            let Some(left_row) = next_or_none(left)? else {
                return Ok(None);
            };
            let right_iter = self.strategy.evaluate(&self.right, &left_row)?;
            self.current = Some((left_row, right_iter, false));
        }
    }

    fn handle_close(&mut self) {
        if let Some((_, mut right_iter, _)) = self.current.take() {
            right_iter.close();
        }
        close_slot(&mut self.left);
    }
}

/// Right side materialized once, left side streamed and probed
struct HashJoin {
    strategy: EvaluationStrategy,
    right: Arc<TupleExpr>,
    bindings: Solution,
    join_names: Vec<String>,
    left: Option<SolutionIteration>,
    /// Right rows with every join variable bound, keyed on those values
    keyed: Option<BoundedMultiMap<Vec<Value>, Solution>>,
    /// Right rows missing some join variable; they are probed against every left row
    partial: Option<BoundedQueue<Solution>>,
    pending: VecDeque<Solution>,
    phase: BlockingPhase,
}

impl HashJoin {
    fn build(&mut self) -> EvaluationResult<()> {
        self.phase = BlockingPhase::Buffering;
        let collections = self.strategy.context().collections();
        let mut keyed = collections.make_multimap();
        let mut partial = collections.make_queue();

        let mut right = self.strategy.evaluate(&self.right, &self.bindings)?;
        let result = fill_hash_table(&mut right, &self.join_names, &mut keyed, &mut partial);
        right.close();
        result?;

        log::debug!(
            "Hash join built: {} keyed rows, {} partial rows",
            keyed.value_count(),
            partial.len()
        );
        self.keyed = Some(keyed);
        self.partial = Some(partial);
        self.phase = BlockingPhase::Draining;
        Ok(())
    }

    fn probe(&mut self, left_row: &Solution) {
        let (Some(keyed), Some(partial)) = (self.keyed.as_ref(), self.partial.as_ref()) else {
            return;
        };
        let key: Option<Vec<Value>> = left_row
            .projected_key(&self.join_names)
            .into_iter()
            .collect();

        let mut emit = |candidate: &Solution| {
            if left_row.compatible_with(candidate) {
                self.pending.push_back(left_row.merged_with(candidate));
            }
        };
        match key {
            Some(key) => keyed.values_for(&key).iter().for_each(&mut emit),
            None => keyed.values().flatten().for_each(&mut emit),
        }
        partial.iter().for_each(&mut emit);
    }
}

/// Split `right` into rows keyed on every join variable and rows missing one
pub(crate) fn fill_hash_table(
    right: &mut SolutionIteration,
    join_names: &[String],
    keyed: &mut BoundedMultiMap<Vec<Value>, Solution>,
    partial: &mut BoundedQueue<Solution>,
) -> EvaluationResult<()> {
    while let Some(row) = next_or_none(right)? {
        let key: Option<Vec<Value>> = row.projected_key(join_names).into_iter().collect();
        match key {
            Some(key) => keyed.insert(key, row)?,
            None => partial.push_back(row)?,
        }
    }
    Ok(())
}

impl LookAhead<Solution> for HashJoin {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.phase == BlockingPhase::NotStarted {
            self.build()?;
        }
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            let Some(left) = self.left.as_mut() else {
                return Ok(None);
            };
            let Some(left_row) = next_or_none(left)? else {
                return Ok(None);
            };
            self.probe(&left_row);
        }
    }

    fn handle_close(&mut self) {
        self.phase = BlockingPhase::Closed;
        close_slot(&mut self.left);
        self.keyed = None;
        self.partial = None;
        self.pending.clear();
    }
}
