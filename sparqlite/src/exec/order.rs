// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ORDER BY, with a bounded top-k mode for ORDER BY ... LIMIT
//!
//! # Algorithm
//!
//! Rows are buffered together with their evaluated sort keys, then sorted
//! stably once the input is exhausted. When a limit is known and top-k is
//! enabled, the buffer is sorted and cut back to `limit` rows every time it
//! reaches twice that size, so at most `2 * limit` rows are held at once.
//!
//! A sort key that fails to evaluate sorts as unbound.

use super::error::EvaluationResult;
use super::iteration::{
    next_or_none, BlockingPhase, CloseableIteration, LookAhead, LookAheadIteration,
    SolutionIteration,
};
use super::strategy::EvaluationStrategy;
use crate::algebra::{OrderElem, TupleExpr};
use crate::binding::{BindingSetKey, Solution};
use crate::collection::{BoundedQueue, BoundedSet};
use crate::model::{compare_terms, Value};
use std::cmp::Ordering;
use std::sync::Arc;

type Keyed = (Vec<Option<Value>>, Solution);

pub(crate) fn evaluate_order(
    strategy: &EvaluationStrategy,
    arg: &Arc<TupleExpr>,
    elements: &[OrderElem],
    limit: Option<u64>,
    distinct: bool,
    bindings: &Solution,
) -> EvaluationResult<SolutionIteration> {
    let upstream = strategy.evaluate(arg, bindings)?;
    let collections = strategy.context().collections();
    let top_k = match limit {
        Some(limit) if strategy.config().order_top_k => usize::try_from(limit).ok(),
        _ => None,
    };
    log::debug!(
        "Order: {} sort keys, top_k={:?}, distinct={}",
        elements.len(),
        top_k,
        distinct
    );
    Ok(LookAheadIteration::new(OrderIteration {
        strategy: strategy.clone(),
        elements: elements.to_vec(),
        upstream: Some(upstream),
        buffer: collections.make_queue(),
        seen: distinct.then(|| collections.make_set()),
        top_k,
        phase: BlockingPhase::NotStarted,
    })
    .boxed())
}

struct OrderIteration {
    strategy: EvaluationStrategy,
    elements: Vec<OrderElem>,
    upstream: Option<SolutionIteration>,
    buffer: BoundedQueue<Keyed>,
    seen: Option<BoundedSet<BindingSetKey>>,
    top_k: Option<usize>,
    phase: BlockingPhase,
}

/// Compare two rows by their sort keys
fn compare_keys(elements: &[OrderElem], a: &[Option<Value>], b: &[Option<Value>]) -> Ordering {
    for ((element, x), y) in elements.iter().zip(a).zip(b) {
        let ordering = compare_terms(x.as_ref(), y.as_ref());
        let ordering = if element.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl OrderIteration {
    fn sort(&mut self) {
        let elements = &self.elements;
        self.buffer.sort_by(|(a, _), (b, _)| compare_keys(elements, a, b));
    }

    fn fill(&mut self) -> EvaluationResult<()> {
        self.phase = BlockingPhase::Buffering;
        let Some(upstream) = self.upstream.as_mut() else {
            return Ok(());
        };
        let values = self.strategy.context().values();

        while let Some(row) = next_or_none(upstream)? {
            if let Some(seen) = self.seen.as_mut() {
                if !seen.insert(row.key())? {
                    continue;
                }
            }
            let mut keys = Vec::with_capacity(self.elements.len());
            for element in &self.elements {
                keys.push(values.evaluate_optional(&element.expr, &row)?);
            }
            self.buffer.push_back((keys, row))?;

            if let Some(k) = self.top_k {
                if self.buffer.len() >= k.saturating_mul(2).max(1) {
                    let elements = &self.elements;
                    self.buffer.sort_by(|(a, _), (b, _)| compare_keys(elements, a, b));
                    self.buffer.truncate(k);
                }
            }
        }

        if let Some(mut upstream) = self.upstream.take() {
            upstream.close();
        }
        self.sort();
        if let Some(k) = self.top_k {
            self.buffer.truncate(k);
        }
        log::debug!("Order: {} rows buffered", self.buffer.len());
        self.phase = BlockingPhase::Draining;
        Ok(())
    }
}

impl LookAhead<Solution> for OrderIteration {
    fn next_element(&mut self) -> EvaluationResult<Option<Solution>> {
        if self.phase == BlockingPhase::NotStarted {
            self.fill()?;
        }
        Ok(self.buffer.pop_front().map(|(_, row)| row))
    }

    fn handle_close(&mut self) {
        self.phase = BlockingPhase::Closed;
        if let Some(mut upstream) = self.upstream.take() {
            upstream.close();
        }
        self.buffer.clear();
        if let Some(seen) = self.seen.as_mut() {
            seen.clear();
        }
    }
}
