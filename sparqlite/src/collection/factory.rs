// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0

use super::budget::ResourceBudget;
use super::map::{BoundedMap, BoundedMultiMap};
use super::queue::BoundedQueue;
use super::set::BoundedSet;
use std::hash::Hash;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Creates bounded collections that all charge one budget
///
/// One factory is created per query execution.
#[derive(Debug, Clone)]
pub struct CollectionFactory {
    budget: ResourceBudget,
}

impl CollectionFactory {
    /// Factory over a caller-owned `used` counter and ceiling
    pub fn new(used: Arc<AtomicUsize>, max_size: usize) -> Self {
        Self::with_budget(ResourceBudget::with_counter(used, max_size))
    }

    pub fn with_budget(budget: ResourceBudget) -> Self {
        Self { budget }
    }

    /// Factory whose collections never fail
    pub fn unbounded() -> Self {
        Self::with_budget(ResourceBudget::unlimited())
    }

    pub fn budget(&self) -> &ResourceBudget {
        &self.budget
    }

    pub fn make_set<T: Eq + Hash>(&self) -> BoundedSet<T> {
        BoundedSet::new(self.budget.clone())
    }

    pub fn make_map<K: Eq + Hash, V>(&self) -> BoundedMap<K, V> {
        BoundedMap::new(self.budget.clone())
    }

    pub fn make_multimap<K: Eq + Hash, V>(&self) -> BoundedMultiMap<K, V> {
        BoundedMultiMap::new(self.budget.clone())
    }

    pub fn make_queue<T>(&self) -> BoundedQueue<T> {
        BoundedQueue::new(self.budget.clone())
    }
}

impl Default for CollectionFactory {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_collections_share_one_budget() {
        let used = Arc::new(AtomicUsize::new(0));
        let factory = CollectionFactory::new(used.clone(), 3);

        let mut set = factory.make_set();
        let mut queue = factory.make_queue();
        let mut map = factory.make_map();

        set.insert(1).unwrap();
        queue.push_back("a").unwrap();
        map.insert("k", 1).unwrap();
        assert_eq!(used.load(Ordering::SeqCst), 3);

        assert!(set.insert(2).is_err());

        set.remove(&2);
        set.remove(&1);
        assert!(queue.push_back("b").is_ok());
        assert_eq!(factory.budget().used(), 3);
    }
}
