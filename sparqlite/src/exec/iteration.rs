// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Closeable iteration protocol
//!
//! Every operator evaluation returns a lazy pull iterator. Unlike
//! `std::iter::Iterator` it separates look-ahead (`has_next`) from
//! consumption (`next`), surfaces errors from both, and has an explicit
//! `close()` that releases upstream resources exactly once.
//!
//! ```ignore
//! let mut iter = strategy.evaluate(&expr, &Solution::new())?;
//! while iter.has_next()? {
//!     let row = iter.next()?;
//!     if done(&row) {
//!         break; // dropping (or closing) the iteration closes the whole chain
//!     }
//! }
//! ```

use crate::binding::Solution;
use crate::exec::error::{EvaluationError, EvaluationResult};

/// Lazy, closeable pull iterator
pub trait CloseableIteration<T>: Send {
    /// True if another element is available. May pull from upstream;
    /// repeated calls without `next()` in between are idempotent.
    fn has_next(&mut self) -> EvaluationResult<bool>;

    /// Next element, or `EvaluationError::NoSuchElement` when exhausted
    fn next(&mut self) -> EvaluationResult<T>;

    /// Release upstream iterations and operator state. Idempotent.
    fn close(&mut self);

    fn boxed(self) -> BoxedIteration<T>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<T, I> CloseableIteration<T> for Box<I>
where
    I: CloseableIteration<T> + ?Sized,
{
    fn has_next(&mut self) -> EvaluationResult<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> EvaluationResult<T> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

impl<T, I> CloseableIteration<T> for &mut I
where
    I: CloseableIteration<T> + ?Sized,
{
    fn has_next(&mut self) -> EvaluationResult<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> EvaluationResult<T> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

pub type BoxedIteration<T> = Box<dyn CloseableIteration<T>>;

/// The iteration type every operator returns
pub type SolutionIteration = BoxedIteration<Solution>;

/// Element producer plugged into [`LookAheadIteration`]
///
/// Operators only implement "produce the next element" and "release my
/// resources"; the wrapper owns peeking, exhaustion and close bookkeeping.
pub trait LookAhead<T>: Send {
    /// Next element, `Ok(None)` once exhausted
    fn next_element(&mut self) -> EvaluationResult<Option<T>>;

    /// Release upstream iterations and buffered state. Called at most once.
    fn handle_close(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterationState {
    Open,
    /// An error was reported; no further elements
    Exhausted,
    Closed,
}

/// Generic look-ahead wrapper around a [`LookAhead`] producer
pub struct LookAheadIteration<T: Send, L: LookAhead<T>> {
    inner: L,
    peeked: Option<T>,
    state: IterationState,
}

impl<T: Send, L: LookAhead<T>> LookAheadIteration<T, L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            peeked: None,
            state: IterationState::Open,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == IterationState::Closed
    }
}

impl<T: Send, L: LookAhead<T>> CloseableIteration<T> for LookAheadIteration<T, L> {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        if self.state != IterationState::Open {
            return Ok(false);
        }
        if self.peeked.is_some() {
            return Ok(true);
        }
        match self.inner.next_element() {
            Ok(Some(element)) => {
                self.peeked = Some(element);
                Ok(true)
            }
            Ok(None) => {
                self.close();
                Ok(false)
            }
            Err(e) => {
                self.state = IterationState::Exhausted;
                Err(e)
            }
        }
    }

    fn next(&mut self) -> EvaluationResult<T> {
        if self.has_next()? {
            self.peeked.take().ok_or(EvaluationError::NoSuchElement)
        } else {
            Err(EvaluationError::NoSuchElement)
        }
    }

    fn close(&mut self) {
        if self.state == IterationState::Closed {
            return;
        }
        self.state = IterationState::Closed;
        self.peeked = None;
        self.inner.handle_close();
    }
}

impl<T: Send, L: LookAhead<T>> Drop for LookAheadIteration<T, L> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Iteration without elements
pub struct EmptyIteration;

impl<T> CloseableIteration<T> for EmptyIteration {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        Ok(false)
    }

    fn next(&mut self) -> EvaluationResult<T> {
        Err(EvaluationError::NoSuchElement)
    }

    fn close(&mut self) {}
}

/// Iteration over exactly one element
pub struct SingletonIteration<T> {
    element: Option<T>,
}

impl<T> SingletonIteration<T> {
    pub fn new(element: T) -> Self {
        Self {
            element: Some(element),
        }
    }
}

impl<T: Send> CloseableIteration<T> for SingletonIteration<T> {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        Ok(self.element.is_some())
    }

    fn next(&mut self) -> EvaluationResult<T> {
        self.element.take().ok_or(EvaluationError::NoSuchElement)
    }

    fn close(&mut self) {
        self.element = None;
    }
}

/// Iteration over a materialized vector
pub struct VecIteration<T> {
    elements: std::vec::IntoIter<T>,
    peeked: Option<T>,
}

impl<T> VecIteration<T> {
    pub fn new(elements: Vec<T>) -> Self {
        Self {
            elements: elements.into_iter(),
            peeked: None,
        }
    }
}

impl<T: Send> CloseableIteration<T> for VecIteration<T> {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        if self.peeked.is_none() {
            self.peeked = self.elements.next();
        }
        Ok(self.peeked.is_some())
    }

    fn next(&mut self) -> EvaluationResult<T> {
        self.has_next()?;
        self.peeked.take().ok_or(EvaluationError::NoSuchElement)
    }

    fn close(&mut self) {
        self.peeked = None;
        self.elements = Vec::new().into_iter();
    }
}

/// Iteration that reports a single error
///
/// Lets a lookup failure surface through the pull protocol instead of at
/// construction time.
pub struct ErrorIteration {
    error: Option<EvaluationError>,
}

impl ErrorIteration {
    pub fn new(error: EvaluationError) -> Self {
        Self { error: Some(error) }
    }
}

impl<T> CloseableIteration<T> for ErrorIteration {
    fn has_next(&mut self) -> EvaluationResult<bool> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> EvaluationResult<T> {
        CloseableIteration::<T>::has_next(self)?;
        Err(EvaluationError::NoSuchElement)
    }

    fn close(&mut self) {
        self.error = None;
    }
}

/// Defers construction of its upstream until the first pull
///
/// Closing before the first pull means the upstream is never built.
pub struct DelayedIteration<T, F>
where
    F: FnOnce() -> EvaluationResult<BoxedIteration<T>> + Send,
{
    factory: Option<F>,
    inner: Option<BoxedIteration<T>>,
    closed: bool,
}

impl<T, F> DelayedIteration<T, F>
where
    F: FnOnce() -> EvaluationResult<BoxedIteration<T>> + Send,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory: Some(factory),
            inner: None,
            closed: false,
        }
    }

    /// True once the upstream has been built
    pub fn is_started(&self) -> bool {
        self.inner.is_some()
    }

    fn upstream(&mut self) -> EvaluationResult<Option<&mut BoxedIteration<T>>> {
        if self.closed {
            return Ok(None);
        }
        if self.inner.is_none() {
            if let Some(factory) = self.factory.take() {
                self.inner = Some(factory()?);
            }
        }
        Ok(self.inner.as_mut())
    }
}

impl<T, F> CloseableIteration<T> for DelayedIteration<T, F>
where
    F: FnOnce() -> EvaluationResult<BoxedIteration<T>> + Send,
{
    fn has_next(&mut self) -> EvaluationResult<bool> {
        match self.upstream()? {
            Some(inner) => inner.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> EvaluationResult<T> {
        match self.upstream()? {
            Some(inner) => inner.next(),
            None => Err(EvaluationError::NoSuchElement),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.factory = None;
        if let Some(mut inner) = self.inner.take() {
            inner.close();
        }
    }
}

impl<T, F> Drop for DelayedIteration<T, F>
where
    F: FnOnce() -> EvaluationResult<BoxedIteration<T>> + Send,
{
    fn drop(&mut self) {
        self.close();
    }
}

/// Pull one element, `Ok(None)` once the iteration is exhausted
pub fn next_or_none<T, I>(iter: &mut I) -> EvaluationResult<Option<T>>
where
    I: CloseableIteration<T> + ?Sized,
{
    if iter.has_next()? {
        iter.next().map(Some)
    } else {
        Ok(None)
    }
}

/// Progress of a blocking operator
///
/// `NotStarted -> Buffering -> Draining -> Closed`; `Closed` is reachable
/// from every state and terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingPhase {
    NotStarted,
    Buffering,
    Draining,
    Closed,
}

/// Drain an iteration into a vector, closing it afterwards (also on error)
pub fn collect_all<T, I>(mut iter: I) -> EvaluationResult<Vec<T>>
where
    I: CloseableIteration<T>,
{
    let mut out = Vec::new();
    let result = loop {
        match iter.has_next() {
            Ok(true) => match iter.next() {
                Ok(element) => out.push(element),
                Err(e) => break Err(e),
            },
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    iter.close();
    result.map(|_| out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts up to `limit`, optionally failing at `fail_at`
    struct Counter {
        current: usize,
        limit: usize,
        fail_at: Option<usize>,
        closes: Arc<AtomicUsize>,
    }

    impl Counter {
        fn new(limit: usize, closes: Arc<AtomicUsize>) -> Self {
            Self {
                current: 0,
                limit,
                fail_at: None,
                closes,
            }
        }
    }

    impl LookAhead<usize> for Counter {
        fn next_element(&mut self) -> EvaluationResult<Option<usize>> {
            if Some(self.current) == self.fail_at {
                return Err(EvaluationError::TripleSource("boom".to_string()));
            }
            if self.current >= self.limit {
                return Ok(None);
            }
            self.current += 1;
            Ok(Some(self.current))
        }

        fn handle_close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut iter = LookAheadIteration::new(Counter::new(2, closes.clone()));

        assert!(iter.has_next().unwrap());
        assert!(iter.has_next().unwrap());
        assert_eq!(iter.next().unwrap(), 1);
        assert_eq!(iter.next().unwrap(), 2);
        assert!(!iter.has_next().unwrap());
        assert!(matches!(iter.next(), Err(EvaluationError::NoSuchElement)));
    }

    #[test]
    fn test_exhaustion_closes_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut iter = LookAheadIteration::new(Counter::new(1, closes.clone()));

        assert_eq!(collect_all(&mut iter).unwrap(), vec![1]);
        assert!(iter.is_closed());
        iter.close();
        drop(iter);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_exhausts_but_stays_closeable() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut counter = Counter::new(5, closes.clone());
        counter.fail_at = Some(1);
        let mut iter = LookAheadIteration::new(counter);

        assert_eq!(iter.next().unwrap(), 1);
        assert!(matches!(iter.has_next(), Err(EvaluationError::TripleSource(_))));
        assert!(!iter.has_next().unwrap());
        iter.close();
        iter.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_closes() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let mut iter = LookAheadIteration::new(Counter::new(10, closes.clone()));
            assert!(iter.has_next().unwrap());
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delayed_iteration_never_built_when_closed_first() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut delayed = DelayedIteration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(VecIteration::new(vec![1, 2]).boxed())
        });

        delayed.close();
        assert!(!delayed.has_next().unwrap());
        assert!(!delayed.is_started());
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delayed_iteration_builds_on_first_pull() {
        let mut delayed = DelayedIteration::new(|| Ok(VecIteration::new(vec![1, 2]).boxed()));
        assert!(!delayed.is_started());
        assert_eq!(collect_all(delayed).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_basic_iterations() {
        let mut empty = EmptyIteration;
        assert!(!CloseableIteration::<u8>::has_next(&mut empty).unwrap());
        CloseableIteration::<u8>::close(&mut empty);

        let mut single = SingletonIteration::new("a");
        assert_eq!(single.next().unwrap(), "a");
        assert!(!single.has_next().unwrap());

        let result = collect_all::<u8, _>(ErrorIteration::new(EvaluationError::NoSuchElement));
        assert!(result.is_err());
    }
}
