// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory triple source for testing and embedding

use super::{statement_matches, TripleSource};
use crate::exec::error::EvaluationResult;
use crate::exec::iteration::{BoxedIteration, CloseableIteration, VecIteration};
use crate::model::{Statement, Value};
use parking_lot::RwLock;
use std::sync::Arc;

/// Statement list behind a read/write lock
///
/// Lookups are linear scans that snapshot the matches, so an open
/// iteration never holds the lock.
#[derive(Default, Clone)]
pub struct MemoryTripleSource {
    statements: Arc<RwLock<Vec<Statement>>>,
}

impl MemoryTripleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_statements(statements: Vec<Statement>) -> Self {
        Self {
            statements: Arc::new(RwLock::new(statements)),
        }
    }

    /// Add a statement; returns false if it was already present
    pub fn add(&self, statement: Statement) -> bool {
        let mut statements = self.statements.write();
        if statements.contains(&statement) {
            return false;
        }
        statements.push(statement);
        true
    }

    pub fn add_triple(&self, subject: Value, predicate: Value, object: Value) -> bool {
        self.add(Statement::new(subject, predicate, object))
    }

    pub fn remove(&self, statement: &Statement) -> bool {
        let mut statements = self.statements.write();
        let before = statements.len();
        statements.retain(|s| s != statement);
        statements.len() != before
    }

    pub fn len(&self) -> usize {
        self.statements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.read().is_empty()
    }

    pub fn clear(&self) {
        self.statements.write().clear();
    }

    /// Distinct named graphs, in first-seen order
    pub fn contexts(&self) -> Vec<Value> {
        let statements = self.statements.read();
        let mut contexts: Vec<Value> = Vec::new();
        for ctx in statements.iter().filter_map(|s| s.context.as_ref()) {
            if !contexts.contains(ctx) {
                contexts.push(ctx.clone());
            }
        }
        contexts
    }
}

impl TripleSource for MemoryTripleSource {
    fn get_statements(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Value>,
        object: Option<&Value>,
        contexts: &[Value],
    ) -> EvaluationResult<BoxedIteration<Statement>> {
        let statements = self.statements.read();
        let matches: Vec<Statement> = statements
            .iter()
            .filter(|s| statement_matches(s, subject, predicate, object, contexts))
            .cloned()
            .collect();
        Ok(VecIteration::new(matches).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::iteration::collect_all;

    fn iri(local: &str) -> Value {
        Value::iri(format!("http://example.org/{}", local))
    }

    fn source() -> MemoryTripleSource {
        let source = MemoryTripleSource::new();
        source.add_triple(iri("a"), iri("p"), iri("b"));
        source.add_triple(iri("b"), iri("p"), iri("c"));
        source.add(Statement::in_context(iri("a"), iri("q"), iri("c"), iri("g1")));
        source
    }

    #[test]
    fn test_wildcard_lookup() {
        let source = source();
        let all = collect_all(source.get_statements(None, None, None, &[]).unwrap()).unwrap();
        assert_eq!(all.len(), 3);

        let from_a =
            collect_all(source.get_statements(Some(&iri("a")), None, None, &[]).unwrap()).unwrap();
        assert_eq!(from_a.len(), 2);
    }

    #[test]
    fn test_context_restriction() {
        let source = source();
        let in_g1 =
            collect_all(source.get_statements(None, None, None, &[iri("g1")]).unwrap()).unwrap();
        assert_eq!(in_g1.len(), 1);
        assert_eq!(in_g1[0].predicate, iri("q"));
        assert_eq!(source.contexts(), vec![iri("g1")]);
    }

    #[test]
    fn test_add_and_remove() {
        let source = source();
        assert!(!source.add_triple(iri("a"), iri("p"), iri("b")));
        assert!(source.remove(&Statement::new(iri("a"), iri("p"), iri("b"))));
        assert_eq!(source.len(), 2);
        source.clear();
        assert!(source.is_empty());
    }
}
