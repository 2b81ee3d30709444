//! Triple source that records lookups and iteration lifecycles
//!
//! Used to check that every iteration the engine opens is closed exactly once.

use sparqlite::exec::{BoxedIteration, CloseableIteration, EvaluationResult};
use sparqlite::{MemoryTripleSource, Statement, TripleSource, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct IterationCounters {
    pub lookups: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    /// Second and later close calls on the same iteration
    pub double_closed: AtomicUsize,
}

impl IterationCounters {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn double_closed(&self) -> usize {
        self.double_closed.load(Ordering::SeqCst)
    }

    pub fn all_closed_once(&self) -> bool {
        self.opened() == self.closed() && self.double_closed() == 0
    }
}

pub struct CountingTripleSource {
    inner: MemoryTripleSource,
    counters: Arc<IterationCounters>,
}

impl CountingTripleSource {
    pub fn new(inner: MemoryTripleSource) -> Self {
        Self {
            inner,
            counters: Arc::new(IterationCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<IterationCounters> {
        Arc::clone(&self.counters)
    }
}

impl TripleSource for CountingTripleSource {
    fn get_statements(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Value>,
        object: Option<&Value>,
        contexts: &[Value],
    ) -> EvaluationResult<BoxedIteration<Statement>> {
        self.counters.lookups.fetch_add(1, Ordering::SeqCst);
        let inner = self
            .inner
            .get_statements(subject, predicate, object, contexts)?;
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedIteration {
            inner,
            counters: Arc::clone(&self.counters),
            closed: false,
        }))
    }
}

struct TrackedIteration {
    inner: BoxedIteration<Statement>,
    counters: Arc<IterationCounters>,
    closed: bool,
}

impl CloseableIteration<Statement> for TrackedIteration {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        if self.closed {
            return Ok(false);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> EvaluationResult<Statement> {
        self.inner.next()
    }

    fn close(&mut self) {
        if self.closed {
            self.counters.double_closed.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}
