// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Binding-set model
//!
//! Two representation families share one read capability ([`BindingSet`]):
//! - [`ArrayBindingSet`]: fixed, pre-declared variable slots with O(1) positional access
//! - [`MapBindingSet`]: open, growable name/value list
//!
//! [`Solution`] is what flows through iterations; it wraps either representation.
//! Equality and hashing are defined over the bound entries only, so a binding set
//! compares equal to any other representation holding the same pairs.

mod array;
mod map;
mod solution;

pub use array::ArrayBindingSet;
pub use map::MapBindingSet;
pub use solution::{BindingSetKey, Solution};

use crate::model::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A single bound variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub value: &'a Value,
}

impl<'a> Binding<'a> {
    pub fn new(name: &'a str, value: &'a Value) -> Self {
        Self { name, value }
    }
}

/// Boxed iterator over the bound entries of a binding set
pub type BindingIter<'a> = Box<dyn Iterator<Item = Binding<'a>> + 'a>;

/// Read access to a set of variable bindings
pub trait BindingSet {
    /// Bound value of `name`, `None` when unbound or unknown
    fn value(&self, name: &str) -> Option<&Value>;

    /// Iterate over bound entries only
    fn iter(&self) -> BindingIter<'_>;

    /// Number of bound entries
    fn len(&self) -> usize;

    fn has_binding(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all bound variables
    fn binding_names(&self) -> Vec<&str> {
        self.iter().map(|b| b.name).collect()
    }
}

/// Construction-time mutation of a binding set
pub trait MutableBindingSet: BindingSet {
    /// Bind `name`, replacing any previous value
    fn add_binding(&mut self, name: &str, value: Value);

    /// Bind or explicitly unbind `name`
    fn set_binding(&mut self, name: &str, value: Option<Value>);

    /// Remove the binding for `name`, returning whether it was bound
    fn remove_binding(&mut self, name: &str) -> bool;
}

/// Representation-independent equality
pub fn binding_sets_equal<A, B>(a: &A, b: &B) -> bool
where
    A: BindingSet + ?Sized,
    B: BindingSet + ?Sized,
{
    a.len() == b.len() && a.iter().all(|binding| b.value(binding.name) == Some(binding.value))
}

/// Order-independent hash: the sum of per-binding hashes
pub fn binding_set_hash<B: BindingSet + ?Sized>(bindings: &B) -> u64 {
    bindings.iter().fold(0u64, |acc, binding| {
        let mut hasher = DefaultHasher::new();
        binding.name.hash(&mut hasher);
        binding.value.hash(&mut hasher);
        acc.wrapping_add(hasher.finish())
    })
}

/// True if both sets agree on every variable bound in both
pub fn compatible<A, B>(a: &A, b: &B) -> bool
where
    A: BindingSet + ?Sized,
    B: BindingSet + ?Sized,
{
    a.iter()
        .all(|binding| b.value(binding.name).map_or(true, |v| v == binding.value))
}

/// True if at least one variable is bound in both sets
pub fn shares_variable<A, B>(a: &A, b: &B) -> bool
where
    A: BindingSet + ?Sized,
    B: BindingSet + ?Sized,
{
    a.iter().any(|binding| b.has_binding(binding.name))
}

macro_rules! impl_binding_set_eq {
    ($left:ty, $right:ty) => {
        impl PartialEq<$right> for $left {
            fn eq(&self, other: &$right) -> bool {
                $crate::binding::binding_sets_equal(self, other)
            }
        }
    };
}

impl_binding_set_eq!(ArrayBindingSet, ArrayBindingSet);
impl_binding_set_eq!(ArrayBindingSet, MapBindingSet);
impl_binding_set_eq!(ArrayBindingSet, Solution);
impl_binding_set_eq!(MapBindingSet, MapBindingSet);
impl_binding_set_eq!(MapBindingSet, ArrayBindingSet);
impl_binding_set_eq!(MapBindingSet, Solution);
impl_binding_set_eq!(Solution, Solution);
impl_binding_set_eq!(Solution, ArrayBindingSet);
impl_binding_set_eq!(Solution, MapBindingSet);

impl Eq for ArrayBindingSet {}
impl Eq for MapBindingSet {}
impl Eq for Solution {}

impl Hash for ArrayBindingSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(binding_set_hash(self));
    }
}

impl Hash for MapBindingSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(binding_set_hash(self));
    }
}

impl Hash for Solution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(binding_set_hash(self));
    }
}
