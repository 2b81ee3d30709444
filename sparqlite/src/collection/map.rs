// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0

use super::budget::ResourceBudget;
use crate::exec::error::EvaluationResult;
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::Deref;

/// Hash map charging one budget unit per key
pub struct BoundedMap<K: Eq + Hash, V> {
    inner: HashMap<K, V>,
    budget: ResourceBudget,
}

impl<K: Eq + Hash, V> BoundedMap<K, V> {
    pub fn new(budget: ResourceBudget) -> Self {
        Self {
            inner: HashMap::new(),
            budget,
        }
    }

    /// Insert or replace. Only a new key is charged.
    pub fn insert(&mut self, key: K, value: V) -> EvaluationResult<Option<V>> {
        let previous = self.inner.insert(key, value);
        if previous.is_none() {
            self.budget.acquire(1)?;
        }
        Ok(previous)
    }

    /// Mutable access to an existing value; never changes the size
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.inner.remove(key);
        if removed.is_some() {
            self.budget.release(1);
        }
        removed
    }

    pub fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, keep: F) {
        let before = self.inner.len();
        self.inner.retain(keep);
        self.budget.release(before - self.inner.len());
    }

    pub fn clear(&mut self) {
        self.budget.release(self.inner.len());
        self.inner.clear();
    }
}

impl<K: Eq + Hash, V> Deref for BoundedMap<K, V> {
    type Target = HashMap<K, V>;

    fn deref(&self) -> &HashMap<K, V> {
        &self.inner
    }
}

impl<K: Eq + Hash, V> Drop for BoundedMap<K, V> {
    fn drop(&mut self) {
        self.budget.release(self.inner.len());
    }
}

/// Hash map of value lists, charging one budget unit per stored value
///
/// The hash join build side keeps every right row, so keys alone would
/// undercount its footprint.
pub struct BoundedMultiMap<K: Eq + Hash, V> {
    inner: HashMap<K, Vec<V>>,
    value_count: usize,
    budget: ResourceBudget,
}

impl<K: Eq + Hash, V> BoundedMultiMap<K, V> {
    pub fn new(budget: ResourceBudget) -> Self {
        Self {
            inner: HashMap::new(),
            value_count: 0,
            budget,
        }
    }

    /// Append `value` under `key`
    pub fn insert(&mut self, key: K, value: V) -> EvaluationResult<()> {
        self.inner.entry(key).or_default().push(value);
        self.value_count += 1;
        self.budget.acquire(1)
    }

    /// All values stored under `key`
    pub fn values_for(&self, key: &K) -> &[V] {
        self.inner.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of stored values
    pub fn value_count(&self) -> usize {
        self.value_count
    }

    pub fn remove(&mut self, key: &K) -> Option<Vec<V>> {
        let removed = self.inner.remove(key);
        if let Some(values) = &removed {
            self.value_count -= values.len();
            self.budget.release(values.len());
        }
        removed
    }

    pub fn clear(&mut self) {
        self.budget.release(self.value_count);
        self.value_count = 0;
        self.inner.clear();
    }
}

impl<K: Eq + Hash, V> Deref for BoundedMultiMap<K, V> {
    type Target = HashMap<K, Vec<V>>;

    fn deref(&self) -> &HashMap<K, Vec<V>> {
        &self.inner
    }
}

impl<K: Eq + Hash, V> Drop for BoundedMultiMap<K, V> {
    fn drop(&mut self) {
        self.budget.release(self.value_count);
    }
}
