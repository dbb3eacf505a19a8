//! Admission control: cap the number of non-terminal tasks.
//!
//! The check reads the active count and releases the registry lock before
//! the caller inserts a record, so two submissions racing past the check can
//! both be admitted and briefly exceed the ceiling by a small margin.

use crate::task::TaskStore;

/// Returned when the ceiling is reached. Callers should retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("concurrency limit reached ({active}/{ceiling} downloads active)")]
pub struct ConcurrencyLimitReached {
    pub active: usize,
    pub ceiling: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    ceiling: usize,
}

impl AdmissionController {
    /// Create a controller; a ceiling of 0 is raised to 1 with a warning.
    /// Config loading rejects 0, so this only guards direct callers.
    pub fn new(ceiling: usize) -> Self {
        if ceiling == 0 {
            tracing::warn!("max_concurrent_downloads is 0; using 1");
        }
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Admit if fewer than `ceiling` tasks are active.
    pub fn decide(&self, active: usize) -> Result<(), ConcurrencyLimitReached> {
        if active < self.ceiling {
            Ok(())
        } else {
            Err(ConcurrencyLimitReached {
                active,
                ceiling: self.ceiling,
            })
        }
    }

    pub fn check(&self, store: &TaskStore) -> Result<(), ConcurrencyLimitReached> {
        self.decide(store.count_active())
    }
}
