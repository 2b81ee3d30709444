// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query evaluation engine
//!
//! [`EvaluationStrategy`] turns an algebra tree into a lazy
//! [`CloseableIteration`] of solutions. Each operator lives in its own module
//! and pulls from the iterations of its children; nothing is computed until
//! the caller asks for the first result.

pub mod context;
pub mod error;
pub mod iteration;
pub mod service;
pub mod strategy;
pub mod value_eval;

mod group;
mod join;
mod order;
mod path;
mod pattern;
mod set_ops;
mod unary;

// Re-export the main types for convenience
pub use context::EvaluationContext;
pub use error::{EvaluationError, EvaluationResult};
pub use iteration::{
    collect_all, BoxedIteration, CloseableIteration, DelayedIteration, EmptyIteration,
    LookAhead, LookAheadIteration, SingletonIteration, SolutionIteration, VecIteration,
};
pub use service::{FederatedService, MapServiceResolver, ServiceResolver, StrategyService};
pub use strategy::{EvaluationStrategy, EvaluationStrategyBuilder};
pub use value_eval::ValueEvaluator;
