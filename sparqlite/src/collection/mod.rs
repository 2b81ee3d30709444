// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Resource-bounded collections
//!
//! Blocking operators (ORDER, DISTINCT, MINUS, GROUP, hash join, path
//! expansion) keep their temporary state here. All collections created by
//! one [`CollectionFactory`] charge a single [`ResourceBudget`]; crossing
//! its ceiling fails the insert with `ResourceLimitExceeded`, which aborts
//! the query.

pub mod budget;
pub mod factory;
pub mod map;
pub mod queue;
pub mod set;

pub use budget::{BudgetStats, ResourceBudget};
pub use factory::CollectionFactory;
pub use map::{BoundedMap, BoundedMultiMap};
pub use queue::BoundedQueue;
pub use set::BoundedSet;
