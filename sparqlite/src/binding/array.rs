// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fixed-slot binding set

use super::{BindingIter, BindingSet, Binding, MutableBindingSet};
use crate::model::Value;
use std::fmt;
use std::sync::Arc;

/// Slot state. `Undef` and `Unset` both read as "absent"; only the
/// construction API can tell them apart.
#[derive(Debug, Clone, PartialEq)]
enum Slot {
    /// Never touched since construction
    Unset,
    /// Explicitly set to "no value"
    Undef,
    Bound(Value),
}

impl Slot {
    fn value(&self) -> Option<&Value> {
        match self {
            Slot::Bound(v) => Some(v),
            Slot::Unset | Slot::Undef => None,
        }
    }
}

/// Binding set over a pre-declared list of variable names
///
/// The name list is shared between all sets produced by one operator, so
/// creating a row only allocates the slot vector.
#[derive(Clone)]
pub struct ArrayBindingSet {
    names: Arc<[String]>,
    slots: Vec<Slot>,
}

impl ArrayBindingSet {
    /// Create an empty set with one slot per declared name
    pub fn new(names: Arc<[String]>) -> Self {
        let slots = vec![Slot::Unset; names.len()];
        Self { names, slots }
    }

    /// Declared variable names, bound or not
    pub fn declared_names(&self) -> &Arc<[String]> {
        &self.names
    }

    /// Slot index of a declared name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Value at a slot index
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.slots.get(index).and_then(Slot::value)
    }

    /// Set a slot by index; `None` marks it UNDEF. Returns false for an out-of-range index.
    pub fn set_at(&mut self, index: usize, value: Option<Value>) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = match value {
                    Some(v) => Slot::Bound(v),
                    None => Slot::Undef,
                };
                true
            }
            None => false,
        }
    }

    /// Set a declared slot by name. Returns false if `name` is not declared.
    pub fn try_set(&mut self, name: &str, value: Option<Value>) -> bool {
        match self.index_of(name) {
            Some(index) => self.set_at(index, value),
            None => false,
        }
    }

    /// True if `name` is declared and was explicitly set to UNDEF
    pub fn is_undef(&self, name: &str) -> bool {
        self.index_of(name)
            .map_or(false, |i| matches!(self.slots[i], Slot::Undef))
    }
}

impl BindingSet for ArrayBindingSet {
    fn value(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|i| self.value_at(i))
    }

    fn iter(&self) -> BindingIter<'_> {
        Box::new(
            self.names
                .iter()
                .zip(self.slots.iter())
                .filter_map(|(name, slot)| slot.value().map(|v| Binding::new(name, v))),
        )
    }

    fn len(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Bound(_))).count()
    }
}

impl MutableBindingSet for ArrayBindingSet {
    fn add_binding(&mut self, name: &str, value: Value) {
        if !self.try_set(name, Some(value)) {
            log::warn!(
                "Ignoring binding for undeclared variable '{}' in fixed-slot binding set",
                name
            );
        }
    }

    fn set_binding(&mut self, name: &str, value: Option<Value>) {
        if !self.try_set(name, value) {
            log::warn!(
                "Ignoring binding for undeclared variable '{}' in fixed-slot binding set",
                name
            );
        }
    }

    fn remove_binding(&mut self, name: &str) -> bool {
        match self.index_of(name) {
            Some(index) => {
                let was_bound = matches!(self.slots[index], Slot::Bound(_));
                self.slots[index] = Slot::Unset;
                was_bound
            }
            None => false,
        }
    }
}

impl fmt::Debug for ArrayBindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|b| (b.name, b.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::MapBindingSet;

    fn xy() -> Arc<[String]> {
        vec!["x".to_string(), "y".to_string()].into()
    }

    #[test]
    fn test_undef_slot_is_invisible() {
        let mut bs = ArrayBindingSet::new(xy());
        bs.set_binding("x", None);
        bs.add_binding("y", Value::integer(1));

        assert!(bs.is_undef("x"));
        assert_eq!(bs.len(), 1);
        assert!(!bs.has_binding("x"));
        assert_eq!(bs.value("x"), None);

        let names: Vec<&str> = bs.iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["y"]);
    }

    #[test]
    fn test_undef_interleaved_with_bound_slots() {
        let names: Arc<[String]> =
            vec!["a".to_string(), "b".to_string(), "c".to_string()].into();
        let mut bs = ArrayBindingSet::new(names);
        bs.add_binding("a", Value::integer(1));
        bs.set_binding("b", None);
        bs.add_binding("c", Value::integer(3));

        let copy = MapBindingSet::from_bindings(&bs);
        assert_eq!(copy.len(), 2);
        assert!(!copy.has_binding("b"));
        assert_eq!(copy.value("c"), Some(&Value::integer(3)));
        assert_eq!(copy, bs);
    }

    #[test]
    fn test_untouched_and_undef_read_alike() {
        let mut a = ArrayBindingSet::new(xy());
        let b = ArrayBindingSet::new(xy());
        a.set_binding("x", None);

        assert!(a.is_undef("x"));
        assert!(!b.is_undef("x"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_undeclared_name_is_ignored() {
        let mut bs = ArrayBindingSet::new(xy());
        bs.add_binding("z", Value::integer(1));
        assert!(bs.is_empty());
        assert!(!bs.try_set("z", Some(Value::integer(1))));
    }

    #[test]
    fn test_positional_access_and_remove() {
        let mut bs = ArrayBindingSet::new(xy());
        assert!(bs.set_at(1, Some(Value::integer(9))));
        assert!(!bs.set_at(2, Some(Value::integer(9))));
        assert_eq!(bs.value_at(1), Some(&Value::integer(9)));
        assert_eq!(bs.value("y"), Some(&Value::integer(9)));

        assert!(bs.remove_binding("y"));
        assert!(!bs.remove_binding("y"));
        assert!(bs.is_empty());
    }
}
