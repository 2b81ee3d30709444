// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Distinct predicates for aggregates

use super::function_trait::DistinctPredicate;
use crate::collection::{BoundedSet, CollectionFactory};
use crate::exec::error::EvaluationResult;
use std::hash::Hash;

/// Accepts everything (non-DISTINCT aggregates)
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

impl<D> DistinctPredicate<D> for AlwaysTrue {
    fn test(&mut self, _value: &D) -> EvaluationResult<bool> {
        Ok(true)
    }
}

/// Accepts each value once; the seen set counts against the query budget
pub struct DistinctValues<D: Eq + Hash> {
    seen: BoundedSet<D>,
}

impl<D: Eq + Hash> DistinctValues<D> {
    pub fn new(factory: &CollectionFactory) -> Self {
        Self {
            seen: factory.make_set(),
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl<D: Eq + Hash + Clone + Send> DistinctPredicate<D> for DistinctValues<D> {
    fn test(&mut self, value: &D) -> EvaluationResult<bool> {
        if self.seen.contains(value) {
            return Ok(false);
        }
        self.seen.insert(value.clone())
    }
}
