// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0

use super::budget::ResourceBudget;
use crate::exec::error::EvaluationResult;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Deref;

/// FIFO buffer charging one budget unit per element
pub struct BoundedQueue<T> {
    inner: VecDeque<T>,
    budget: ResourceBudget,
}

impl<T> BoundedQueue<T> {
    pub fn new(budget: ResourceBudget) -> Self {
        Self {
            inner: VecDeque::new(),
            budget,
        }
    }

    pub fn push_back(&mut self, value: T) -> EvaluationResult<()> {
        self.inner.push_back(value);
        self.budget.acquire(1)
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let value = self.inner.pop_front();
        if value.is_some() {
            self.budget.release(1);
        }
        value
    }

    /// Keep the first `len` elements
    pub fn truncate(&mut self, len: usize) {
        let before = self.inner.len();
        self.inner.truncate(len);
        self.budget.release(before - self.inner.len());
    }

    /// Stable sort in place
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.inner.make_contiguous().sort_by(compare);
    }

    /// Remove and return all elements, releasing their budget
    pub fn take_all(&mut self) -> Vec<T> {
        self.budget.release(self.inner.len());
        self.inner.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.budget.release(self.inner.len());
        self.inner.clear();
    }
}

impl<T> Deref for BoundedQueue<T> {
    type Target = VecDeque<T>;

    fn deref(&self) -> &VecDeque<T> {
        &self.inner
    }
}

impl<T> Drop for BoundedQueue<T> {
    fn drop(&mut self) {
        self.budget.release(self.inner.len());
    }
}
