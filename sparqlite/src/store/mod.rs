// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Triple source interface consumed by evaluation

pub mod memory;

pub use memory::MemoryTripleSource;

use crate::exec::error::EvaluationResult;
use crate::exec::iteration::BoxedIteration;
use crate::model::{Statement, Value};

/// Read-only statement lookup
///
/// Every returned iteration is closed by the engine exactly once, whether
/// it was drained or abandoned.
pub trait TripleSource: Send + Sync {
    /// Statements matching the given positions; `None` is a wildcard.
    ///
    /// An empty `contexts` slice matches every graph, including the default graph.
    fn get_statements(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Value>,
        object: Option<&Value>,
        contexts: &[Value],
    ) -> EvaluationResult<BoxedIteration<Statement>>;
}

/// True if `statement` matches the lookup positions
pub fn statement_matches(
    statement: &Statement,
    subject: Option<&Value>,
    predicate: Option<&Value>,
    object: Option<&Value>,
    contexts: &[Value],
) -> bool {
    subject.map_or(true, |s| *s == statement.subject)
        && predicate.map_or(true, |p| *p == statement.predicate)
        && object.map_or(true, |o| *o == statement.object)
        && (contexts.is_empty()
            || statement
                .context
                .as_ref()
                .map_or(false, |c| contexts.contains(c)))
}
