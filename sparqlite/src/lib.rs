// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SPARQLite - a streaming SPARQL algebra evaluation engine
//!
//! SPARQLite evaluates SPARQL query algebra trees against any
//! [`TripleSource`] and streams the solutions back lazily.
//!
//! # Features
//!
//! - **Lazy evaluation**: every operator is a pull-based, closeable iteration
//! - **Joins**: nested-loop, hash and batched federated service joins
//! - **Property paths**: arbitrary- and zero-length paths with cycle detection
//! - **Aggregation**: built-in aggregates plus a registry for custom ones
//! - **Resource bounds**: blocking operators share a per-query size budget
//!
//! # Usage
//!
//! ```no_run
//! use sparqlite::algebra::{TupleExpr, Var};
//! use sparqlite::exec::{collect_all, EvaluationStrategy};
//! use sparqlite::{MemoryTripleSource, Solution, Value};
//! use std::sync::Arc;
//!
//! let source = MemoryTripleSource::new();
//! source.add_triple(
//!     Value::iri("http://example.org/alice"),
//!     Value::iri("http://example.org/knows"),
//!     Value::iri("http://example.org/bob"),
//! );
//!
//! let strategy = EvaluationStrategy::new(Arc::new(source));
//! let expr = TupleExpr::pattern(
//!     Var::new("s"),
//!     Var::constant(Value::iri("http://example.org/knows")),
//!     Var::new("o"),
//! );
//! let rows = collect_all(strategy.evaluate(&expr, &Solution::new())?)?;
//! assert_eq!(rows.len(), 1);
//! # Ok::<(), sparqlite::EvaluationError>(())
//! ```

pub mod algebra;
pub mod binding;
pub mod collection;
pub mod config;
pub mod exec;
pub mod functions;
pub mod model;
pub mod store;

// Re-export the public API
pub use binding::{ArrayBindingSet, BindingSet, MapBindingSet, MutableBindingSet, Solution};
pub use collection::{CollectionFactory, ResourceBudget};
pub use config::EvaluationConfig;
pub use exec::{CloseableIteration, EvaluationError, EvaluationResult, EvaluationStrategy};
pub use functions::AggregateFunctionRegistry;
pub use model::{Statement, Value};
pub use store::{MemoryTripleSource, TripleSource};

/// SPARQLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SPARQLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
