// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The binding set carried through iterations

use super::{
    compatible, shares_variable, ArrayBindingSet, BindingIter, BindingSet, MapBindingSet,
    MutableBindingSet,
};
use crate::model::Value;
use std::fmt;

/// One solution row, in either representation
///
/// Adding a binding for a name the array form did not declare promotes the
/// row to the map form; callers never observe a dropped binding.
#[derive(Clone)]
pub enum Solution {
    Array(ArrayBindingSet),
    Map(MapBindingSet),
}

/// Canonical, name-sorted content of a solution
///
/// Used as the hash key for DISTINCT, set operators and COUNT(DISTINCT *).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingSetKey(Vec<(String, Value)>);

impl BindingSetKey {
    pub fn entries(&self) -> &[(String, Value)] {
        &self.0
    }
}

impl Solution {
    /// Empty, open solution
    pub fn new() -> Self {
        Solution::Map(MapBindingSet::new())
    }

    /// Build an open solution from `(name, value)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut map = MapBindingSet::new();
        for (name, value) in pairs {
            map.add_binding(name.as_ref(), value);
        }
        Solution::Map(map)
    }

    /// True if both agree on every variable bound in both
    pub fn compatible_with<B: BindingSet + ?Sized>(&self, other: &B) -> bool {
        compatible(self, other)
    }

    /// True if at least one variable is bound in both
    pub fn shares_variable_with<B: BindingSet + ?Sized>(&self, other: &B) -> bool {
        shares_variable(self, other)
    }

    /// Union of two compatible solutions; `self` wins on conflicts
    pub fn merged_with<B: BindingSet + ?Sized>(&self, other: &B) -> Solution {
        let mut merged = self.clone();
        for binding in other.iter() {
            if !merged.has_binding(binding.name) {
                merged.add_binding(binding.name, binding.value.clone());
            }
        }
        merged
    }

    pub fn key(&self) -> BindingSetKey {
        let mut entries: Vec<(String, Value)> = self
            .iter()
            .map(|b| (b.name.to_string(), b.value.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        BindingSetKey(entries)
    }

    /// Values of `names` in order, `None` for unbound
    pub fn projected_key(&self, names: &[String]) -> Vec<Option<Value>> {
        names.iter().map(|n| self.value(n).cloned()).collect()
    }
}

impl Default for Solution {
    fn default() -> Self {
        Solution::new()
    }
}

impl From<ArrayBindingSet> for Solution {
    fn from(bindings: ArrayBindingSet) -> Self {
        Solution::Array(bindings)
    }
}

impl From<MapBindingSet> for Solution {
    fn from(bindings: MapBindingSet) -> Self {
        Solution::Map(bindings)
    }
}

impl BindingSet for Solution {
    fn value(&self, name: &str) -> Option<&Value> {
        match self {
            Solution::Array(a) => a.value(name),
            Solution::Map(m) => m.value(name),
        }
    }

    fn iter(&self) -> BindingIter<'_> {
        match self {
            Solution::Array(a) => a.iter(),
            Solution::Map(m) => m.iter(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Solution::Array(a) => a.len(),
            Solution::Map(m) => m.len(),
        }
    }
}

impl MutableBindingSet for Solution {
    fn add_binding(&mut self, name: &str, value: Value) {
        match self {
            Solution::Map(m) => m.add_binding(name, value),
            Solution::Array(a) if a.index_of(name).is_some() => a.add_binding(name, value),
            Solution::Array(a) => {
                let mut map = MapBindingSet::from_bindings(a);
                map.add_binding(name, value);
                *self = Solution::Map(map);
            }
        }
    }

    fn set_binding(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(v) => self.add_binding(name, v),
            None => match self {
                Solution::Map(m) => m.set_binding(name, None),
                // Undeclared names are already absent
                Solution::Array(a) => {
                    a.try_set(name, None);
                }
            },
        }
    }

    fn remove_binding(&mut self, name: &str) -> bool {
        match self {
            Solution::Array(a) => a.remove_binding(name),
            Solution::Map(m) => m.remove_binding(name),
        }
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solution::Array(a) => a.fmt(f),
            Solution::Map(m) => m.fmt(f),
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.name.cmp(b.name));
        write!(f, "[")?;
        for (i, b) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{}={}", b.name, b.value)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_promotion_on_undeclared_name() {
        let names: Arc<[String]> = vec!["s".to_string()].into();
        let mut array = ArrayBindingSet::new(names);
        array.add_binding("s", Value::iri("http://a"));

        let mut solution = Solution::from(array);
        solution.add_binding("o", Value::integer(1));

        assert!(matches!(solution, Solution::Map(_)));
        assert_eq!(solution.len(), 2);
        assert_eq!(solution.value("s"), Some(&Value::iri("http://a")));
        assert_eq!(solution.value("o"), Some(&Value::integer(1)));
    }

    #[test]
    fn test_declared_name_stays_array() {
        let names: Arc<[String]> = vec!["s".to_string(), "o".to_string()].into();
        let mut solution = Solution::from(ArrayBindingSet::new(names));
        solution.add_binding("o", Value::integer(1));
        solution.set_binding("unknown", None);

        assert!(matches!(solution, Solution::Array(_)));
        assert_eq!(solution.len(), 1);
    }

    #[test]
    fn test_merge_and_key() {
        let left = Solution::from_pairs([("s", Value::iri("http://a"))]);
        let right = Solution::from_pairs([
            ("o", Value::integer(2)),
            ("s", Value::iri("http://a")),
        ]);

        let merged = left.merged_with(&right);
        assert_eq!(merged, right);
        assert_eq!(merged.key(), right.key());
        assert_eq!(merged.key().entries()[0].0, "o");
        assert_eq!(
            merged.projected_key(&["s".to_string(), "z".to_string()]),
            vec![Some(Value::iri("http://a")), None]
        );
    }

    #[test]
    fn test_display_is_sorted() {
        let s = Solution::from_pairs([("b", Value::integer(2)), ("a", Value::integer(1))]);
        assert!(s.to_string().starts_with("[a="));
    }
}
