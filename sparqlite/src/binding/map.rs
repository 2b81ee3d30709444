// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Open (growable) binding set

use super::{Binding, BindingIter, BindingSet, MutableBindingSet};
use crate::model::Value;
use std::fmt;

/// Binding set backed by an insertion-ordered list
///
/// Binding sets are small (a handful of variables), so a linear scan
/// beats hashing here.
#[derive(Clone, Default)]
pub struct MapBindingSet {
    entries: Vec<(String, Value)>,
}

impl MapBindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Copy the bound entries of any binding set
    pub fn from_bindings<B: BindingSet + ?Sized>(bindings: &B) -> Self {
        let mut copy = Self::with_capacity(bindings.len());
        for binding in bindings.iter() {
            copy.entries
                .push((binding.name.to_string(), binding.value.clone()));
        }
        copy
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }
}

impl BindingSet for MapBindingSet {
    fn value(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    fn iter(&self) -> BindingIter<'_> {
        Box::new(self.entries.iter().map(|(n, v)| Binding::new(n, v)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl MutableBindingSet for MapBindingSet {
    fn add_binding(&mut self, name: &str, value: Value) {
        match self.position(name) {
            Some(index) => self.entries[index].1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    fn set_binding(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => self.add_binding(name, v),
            None => {
                self.remove_binding(name);
            }
        }
    }

    fn remove_binding(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for MapBindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}
