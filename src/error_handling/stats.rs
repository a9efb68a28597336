//! Flush statistics tracking.
//!
//! Thread-safe counters describing what the writer has accepted, flushed and
//! lost. Failed batches are tracked per `FlushStep` so operators can tell a
//! connectivity problem from a schema problem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::FlushStep;

/// Thread-safe flush statistics tracker.
///
/// Shared between producers (which bump `records_added`) and the flush path.
/// All step counters are initialized to zero on creation.
pub struct FlushStats {
    records_added: AtomicUsize,
    batches_flushed: AtomicUsize,
    records_flushed: AtomicUsize,
    batches_failed: AtomicUsize,
    records_dropped: AtomicUsize,
    provisioning_attempts: AtomicUsize,
    step_failures: HashMap<FlushStep, AtomicUsize>,
}

/// Point-in-time copy of `FlushStats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushStatsSnapshot {
    /// Records accepted by `add`.
    pub records_added: usize,
    /// Batches committed to the store.
    pub batches_flushed: usize,
    /// Records committed to the store.
    pub records_flushed: usize,
    /// Batches aborted at any step.
    pub batches_failed: usize,
    /// Records lost with aborted batches.
    pub records_dropped: usize,
    /// Times table provisioning was attempted (at most 1).
    pub provisioning_attempts: usize,
}

impl FlushStats {
    /// Creates a tracker with every counter at zero.
    pub fn new() -> Self {
        let mut step_failures = HashMap::new();
        for step in FlushStep::iter() {
            step_failures.insert(step, AtomicUsize::new(0));
        }

        FlushStats {
            records_added: AtomicUsize::new(0),
            batches_flushed: AtomicUsize::new(0),
            records_flushed: AtomicUsize::new(0),
            batches_failed: AtomicUsize::new(0),
            records_dropped: AtomicUsize::new(0),
            provisioning_attempts: AtomicUsize::new(0),
            step_failures,
        }
    }

    /// Counts one record accepted by `add`.
    pub fn record_added(&self) {
        self.records_added.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one schema provisioning attempt.
    pub fn record_provisioning(&self) {
        self.provisioning_attempts.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a committed batch of `rows` records.
    pub fn record_flushed(&self, rows: usize) {
        self.batches_flushed.fetch_add(1, Ordering::SeqCst);
        self.records_flushed.fetch_add(rows, Ordering::SeqCst);
    }

    /// Records a batch of `rows` records aborted at `step`.
    pub fn record_failed(&self, step: FlushStep, rows: usize) {
        self.batches_failed.fetch_add(1, Ordering::SeqCst);
        self.records_dropped.fetch_add(rows, Ordering::SeqCst);
        if let Some(counter) = self.step_failures.get(&step) {
            counter.fetch_add(1, Ordering::SeqCst);
        } else {
            log::error!(
                "Flush step {:?} is not in the stats map. \
                 This indicates a bug in FlushStats initialization.",
                step
            );
        }
    }

    /// Records `rows` buffered records lost without a flush attempt.
    pub fn record_lost(&self, rows: usize) {
        self.records_dropped.fetch_add(rows, Ordering::SeqCst);
    }

    /// Number of batches that failed at `step`.
    pub fn step_failure_count(&self, step: FlushStep) -> usize {
        self.step_failures
            .get(&step)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total failures across all steps.
    pub fn total_step_failures(&self) -> usize {
        FlushStep::iter().map(|s| self.step_failure_count(s)).sum()
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> FlushStatsSnapshot {
        FlushStatsSnapshot {
            records_added: self.records_added.load(Ordering::SeqCst),
            batches_flushed: self.batches_flushed.load(Ordering::SeqCst),
            records_flushed: self.records_flushed.load(Ordering::SeqCst),
            batches_failed: self.batches_failed.load(Ordering::SeqCst),
            records_dropped: self.records_dropped.load(Ordering::SeqCst),
            provisioning_attempts: self.provisioning_attempts.load(Ordering::SeqCst),
        }
    }
}

impl Default for FlushStats {
    fn default() -> Self {
        Self::new()
    }
}
