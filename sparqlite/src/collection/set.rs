// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0

use super::budget::ResourceBudget;
use crate::exec::error::EvaluationResult;
use std::collections::HashSet;
use std::hash::Hash;
use std::ops::Deref;

/// Hash set charging one budget unit per element
///
/// Reads go through `Deref<Target = HashSet<T>>`; every mutation is a
/// method here so the budget stays in sync.
pub struct BoundedSet<T: Eq + Hash> {
    inner: HashSet<T>,
    budget: ResourceBudget,
}

impl<T: Eq + Hash> BoundedSet<T> {
    pub fn new(budget: ResourceBudget) -> Self {
        Self {
            inner: HashSet::new(),
            budget,
        }
    }

    /// Insert `value`. Returns `Ok(false)` for a duplicate.
    ///
    /// Fails after inserting if the budget is now exceeded.
    pub fn insert(&mut self, value: T) -> EvaluationResult<bool> {
        if !self.inner.insert(value) {
            return Ok(false);
        }
        self.budget.acquire(1)?;
        Ok(true)
    }

    /// Insert every element; `Ok(true)` only if all were new
    pub fn insert_all<I: IntoIterator<Item = T>>(&mut self, values: I) -> EvaluationResult<bool> {
        let mut all_new = true;
        for value in values {
            all_new &= self.insert(value)?;
        }
        Ok(all_new)
    }

    pub fn remove(&mut self, value: &T) -> bool {
        let removed = self.inner.remove(value);
        if removed {
            self.budget.release(1);
        }
        removed
    }

    /// Remove every given element, returning how many were present
    pub fn remove_all<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut removed = 0;
        for value in values {
            if self.inner.remove(value) {
                removed += 1;
            }
        }
        self.budget.release(removed);
        removed
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        let before = self.inner.len();
        self.inner.retain(keep);
        self.budget.release(before - self.inner.len());
    }

    pub fn clear(&mut self) {
        self.budget.release(self.inner.len());
        self.inner.clear();
    }
}

impl<T: Eq + Hash> Deref for BoundedSet<T> {
    type Target = HashSet<T>;

    fn deref(&self) -> &HashSet<T> {
        &self.inner
    }
}

impl<T: Eq + Hash> Drop for BoundedSet<T> {
    fn drop(&mut self) {
        self.budget.release(self.inner.len());
    }
}

impl<T: Eq + Hash + std::fmt::Debug> std::fmt::Debug for BoundedSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.inner.iter()).finish()
    }
}
