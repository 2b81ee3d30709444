// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared element budget for one query execution
//!
//! Every bounded collection of a query charges the same counter. The
//! insert that pushes the counter above the ceiling fails; the element it
//! inserted stays accounted for, so the caller must abandon the query.
//!
//! ```ignore
//! let budget = ResourceBudget::new(10_000);
//! let factory = CollectionFactory::with_budget(budget.clone());
//! let mut seen = factory.make_set();
//! seen.insert(key)?; // charges 1
//! ```

use crate::exec::error::{EvaluationError, EvaluationResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared `used` counter plus an immutable ceiling
#[derive(Clone)]
pub struct ResourceBudget {
    /// Maximum number of elements held across all collections
    max_size: usize,

    /// Elements currently held (shared by reference)
    used: Arc<AtomicUsize>,

    /// High-water mark of `used`
    peak: Arc<AtomicUsize>,
}

impl std::fmt::Debug for ResourceBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceBudget")
            .field("max_size", &self.max_size)
            .field("used", &self.used.load(Ordering::SeqCst))
            .field("peak", &self.peak.load(Ordering::SeqCst))
            .finish()
    }
}

impl ResourceBudget {
    pub fn new(max_size: usize) -> Self {
        Self::with_counter(Arc::new(AtomicUsize::new(0)), max_size)
    }

    /// Budget over a caller-owned counter, e.g. one shared with other executions
    pub fn with_counter(used: Arc<AtomicUsize>, max_size: usize) -> Self {
        let current = used.load(Ordering::SeqCst);
        Self {
            max_size,
            used,
            peak: Arc::new(AtomicUsize::new(current)),
        }
    }

    /// Budget that never fails
    pub fn unlimited() -> Self {
        Self::new(usize::MAX)
    }

    /// Charge `count` elements
    ///
    /// The charge is kept even when it crosses the ceiling; the caller
    /// has already inserted the element.
    pub fn acquire(&self, count: usize) -> EvaluationResult<()> {
        if count == 0 {
            return Ok(());
        }
        let current = self.used.fetch_add(count, Ordering::SeqCst);
        let new_total = current.saturating_add(count);
        self.peak.fetch_max(new_total, Ordering::SeqCst);

        if new_total > self.max_size {
            log::warn!(
                "Collection size limit exceeded: {} elements in use, limit {}",
                new_total,
                self.max_size
            );
            return Err(EvaluationError::ResourceLimitExceeded {
                used: new_total,
                max_size: self.max_size,
            });
        }
        Ok(())
    }

    /// Return `count` elements to the budget (saturating at zero)
    pub fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(count))
            });
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// The shared counter handle
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.used)
    }

    pub fn available(&self) -> usize {
        self.max_size.saturating_sub(self.used())
    }

    /// Fraction of the ceiling in use (0.0 for a zero ceiling)
    pub fn usage_ratio(&self) -> f64 {
        if self.max_size == 0 {
            return 0.0;
        }
        self.used() as f64 / self.max_size as f64
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_size == usize::MAX
    }

    pub fn stats(&self) -> BudgetStats {
        BudgetStats {
            max_size: self.max_size,
            used: self.used(),
            peak: self.peak(),
            available: self.available(),
        }
    }
}

/// Budget usage snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetStats {
    pub max_size: usize,
    pub used: usize,
    pub peak: usize,
    pub available: usize,
}

impl std::fmt::Display for BudgetStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.max_size == usize::MAX {
            write!(f, "Collections: {} elements (unlimited), Peak: {}", self.used, self.peak)
        } else {
            write!(
                f,
                "Collections: {}/{} elements ({:.1}%), Peak: {}",
                self.used,
                self.max_size,
                (self.used as f64 / self.max_size.max(1) as f64) * 100.0,
                self.peak
            )
        }
    }
}
