//! Execution statistics.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};

use crate::models::ExecutionStats;

/// Shared accumulator of execution counts and timing.
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    inner: Arc<Mutex<ExecutionStats>>,
}

impl StatsTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ExecutionStats> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks an execution as in flight. The returned guard records the
    /// outcome exactly once when it is finished or dropped.
    pub fn begin(&self) -> ExecutionGuard {
        self.lock().current_concurrent_executions += 1;
        ExecutionGuard { stats: self.clone(), started: Instant::now(), finished: false }
    }

    /// A copy of the current numbers.
    pub fn snapshot(&self) -> ExecutionStats {
        self.lock().clone()
    }

    /// Zeroes the totals. Executions still in flight stay counted.
    pub fn clear(&self) {
        let mut stats = self.lock();
        *stats = ExecutionStats {
            current_concurrent_executions: stats.current_concurrent_executions,
            ..ExecutionStats::default()
        };
    }

    /// Replaces the totals with `imported`, keeping the live in-flight count.
    pub fn restore(&self, imported: &ExecutionStats) {
        let mut stats = self.lock();
        *stats = ExecutionStats {
            current_concurrent_executions: stats.current_concurrent_executions,
            ..imported.clone()
        };
    }

    fn record(&self, success: bool, elapsed_ms: f64) {
        let mut stats = self.lock();
        stats.current_concurrent_executions = stats.current_concurrent_executions.saturating_sub(1);
        stats.total_executions += 1;
        if success {
            stats.successful_executions += 1;
        } else {
            stats.failed_executions += 1;
        }
        stats.average_execution_time +=
            (elapsed_ms - stats.average_execution_time) / stats.total_executions as f64;
    }
}

/// An in-flight execution. Dropping it without calling
/// [`ExecutionGuard::finish`] records a failure, which covers panics and
/// cancelled futures.
#[derive(Debug)]
pub struct ExecutionGuard {
    stats: StatsTracker,
    started: Instant,
    finished: bool,
}

impl ExecutionGuard {
    /// Milliseconds since the execution started.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1_000.0
    }

    /// Records the outcome with an explicit duration.
    pub fn finish(mut self, success: bool, elapsed_ms: f64) {
        self.finished = true;
        self.stats.record(success, elapsed_ms);
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        if !self.finished {
            let elapsed = self.elapsed_ms();
            self.stats.record(false, elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let tracker = StatsTracker::new();
        tracker.begin().finish(true, 10.0);
        tracker.begin().finish(false, 20.0);
        tracker.begin().finish(true, 30.0);

        let stats = tracker.snapshot();
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.successful_executions, 2);
        assert_eq!(stats.failed_executions, 1);
        assert!((stats.average_execution_time - 20.0).abs() < 1e-9);
        assert_eq!(stats.current_concurrent_executions, 0);
    }

    #[test]
    fn test_in_flight_count() {
        let tracker = StatsTracker::new();
        let first = tracker.begin();
        let second = tracker.begin();
        assert_eq!(tracker.snapshot().current_concurrent_executions, 2);
        first.finish(true, 1.0);
        assert_eq!(tracker.snapshot().current_concurrent_executions, 1);
        drop(second);
        assert_eq!(tracker.snapshot().current_concurrent_executions, 0);
    }

    #[test]
    fn test_dropped_guard_counts_as_failure() {
        let tracker = StatsTracker::new();
        drop(tracker.begin());
        let stats = tracker.snapshot();
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.failed_executions, 1);
    }

    #[test]
    fn test_guard_records_on_panic() {
        let tracker = StatsTracker::new();
        let cloned = tracker.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.begin();
            panic!("boom");
        });
        assert!(result.is_err());
        assert_eq!(tracker.snapshot().failed_executions, 1);
        assert_eq!(tracker.snapshot().current_concurrent_executions, 0);
    }

    #[test]
    fn test_clear_keeps_in_flight() {
        let tracker = StatsTracker::new();
        tracker.begin().finish(true, 5.0);
        let running = tracker.begin();
        tracker.clear();

        let stats = tracker.snapshot();
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.average_execution_time, 0.0);
        assert_eq!(stats.current_concurrent_executions, 1);

        running.finish(true, 7.0);
        let stats = tracker.snapshot();
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.current_concurrent_executions, 0);
    }

    #[test]
    fn test_restore_keeps_in_flight() {
        let tracker = StatsTracker::new();
        let _running = tracker.begin();
        let imported = ExecutionStats {
            total_executions: 10,
            successful_executions: 8,
            failed_executions: 2,
            average_execution_time: 4.5,
            current_concurrent_executions: 99,
        };
        tracker.restore(&imported);

        let stats = tracker.snapshot();
        assert_eq!(stats.total_executions, 10);
        assert_eq!(stats.current_concurrent_executions, 1);
    }
}
