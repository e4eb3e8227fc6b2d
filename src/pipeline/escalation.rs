// SPDX-License-Identifier: GPL-3.0-only

//! Consecutive read failure tracking

/// Counts consecutive capture failures against a reopen threshold
#[derive(Debug, Clone)]
pub struct FailureTracker {
    threshold: u32,
    consecutive: u32,
    total: u64,
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            consecutive: 0,
            total: 0,
        }
    }

    /// Record a failure; true exactly when the threshold is reached
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.total += 1;
        self.consecutive == self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Start counting again after a reopen
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_resets_counter() {
        let mut tracker = FailureTracker::new(3);
        assert!(!tracker.record_failure());
        assert!(!tracker.record_failure());
        tracker.record_success();
        assert!(!tracker.record_failure());
        assert!(!tracker.record_failure());
        assert_eq!(tracker.consecutive(), 2);
        assert_eq!(tracker.total(), 4);
    }

    #[test]
    fn test_escalates_exactly_at_threshold() {
        let mut tracker = FailureTracker::new(3);
        let fired: Vec<bool> = (0..5).map(|_| tracker.record_failure()).collect();
        assert_eq!(fired, vec![false, false, true, false, false]);
    }

    #[test]
    fn test_zero_threshold_treated_as_one() {
        let mut tracker = FailureTracker::new(0);
        assert!(tracker.record_failure());
    }
}
