//! Records when the best coverage of a run was reached.

use std::time::{Duration, Instant};

use log::trace;

use super::clock::{Clock, SystemClock};

/// Observer of the coverage value after every generation.
#[derive(Debug, Clone)]
pub struct BudgetConsumptionMonitor<K: Clock = SystemClock> {
    clock: K,
    search_start: Instant,
    best_coverage: f64,
    time_to_max_coverage: Duration,
}

impl BudgetConsumptionMonitor<SystemClock> {
    /// Start monitoring now.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for BudgetConsumptionMonitor<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> BudgetConsumptionMonitor<K> {
    /// Start monitoring at the clock's current instant.
    pub fn with_clock(clock: K) -> Self {
        let search_start = clock.now();
        Self {
            clock,
            search_start,
            best_coverage: 0.0,
            time_to_max_coverage: Duration::ZERO,
        }
    }

    /// Record `coverage` if it beats the best seen so far.
    ///
    /// Returns whether the maximum moved. Equal values leave the recorded
    /// time untouched.
    pub fn check_max_coverage(&mut self, coverage: f64) -> bool {
        if coverage > self.best_coverage {
            self.time_to_max_coverage = self.clock.now().saturating_duration_since(self.search_start);
            self.best_coverage = coverage;
            trace!(
                "coverage {:.4} reached after {:?}",
                coverage, self.time_to_max_coverage
            );
            true
        } else {
            false
        }
    }

    /// Time from search start until the best coverage was first observed.
    pub fn time_to_max_coverage(&self) -> Duration {
        self.time_to_max_coverage
    }

    /// Best coverage seen so far.
    pub fn best_coverage(&self) -> f64 {
        self.best_coverage
    }

    /// Instant the monitor started.
    pub fn search_start(&self) -> Instant {
        self.search_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ManualClock;

    #[test]
    fn test_equal_coverage_does_not_update_time() {
        let clock = ManualClock::new();
        let mut monitor = BudgetConsumptionMonitor::with_clock(clock.clone());

        clock.advance(Duration::from_millis(100));
        assert!(monitor.check_max_coverage(0.5));
        assert_eq!(monitor.time_to_max_coverage(), Duration::from_millis(100));

        clock.advance(Duration::from_millis(400));
        assert!(!monitor.check_max_coverage(0.5));
        assert_eq!(monitor.time_to_max_coverage(), Duration::from_millis(100));
    }

    #[test]
    fn test_higher_coverage_updates_time() {
        let clock = ManualClock::new();
        let mut monitor = BudgetConsumptionMonitor::with_clock(clock.clone());

        monitor.check_max_coverage(0.2);
        clock.advance(Duration::from_secs(3));
        monitor.check_max_coverage(0.1);
        assert_eq!(monitor.time_to_max_coverage(), Duration::ZERO);

        clock.advance(Duration::from_secs(2));
        monitor.check_max_coverage(0.8);
        assert_eq!(monitor.time_to_max_coverage(), Duration::from_secs(5));
        assert_eq!(monitor.best_coverage(), 0.8);
    }

    #[test]
    fn test_generation_zero_with_no_coverage() {
        let mut monitor = BudgetConsumptionMonitor::with_clock(ManualClock::new());
        assert!(!monitor.check_max_coverage(0.0));
        assert_eq!(monitor.time_to_max_coverage(), Duration::ZERO);
    }
}
