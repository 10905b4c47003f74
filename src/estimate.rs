//! Running distribution-time estimate
//!
//! Two scalars carried across the whole trace:
//!
//! - `minimum_creation_time`: creation time of the latest-created straggler,
//!   i.e. a thread that was known but unplaced and has just been placed.
//!   Approximates "all workload threads exist".
//! - `maximum_distribution_bound`: the moment full coverage is known to
//!   have been reached by.
//!
//! Both start unset. The update rules below are the only mutators.

use crate::timestamp::Timestamp;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionEstimate {
    minimum_creation_time: Option<Timestamp>,
    maximum_distribution_bound: Option<Timestamp>,
}

impl DistributionEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minimum_creation_time(&self) -> Option<Timestamp> {
        self.minimum_creation_time
    }

    pub fn maximum_distribution_bound(&self) -> Option<Timestamp> {
        self.maximum_distribution_bound
    }

    /// A previously unplaced thread created at `creation` received its
    /// first placement at `placed_at`
    ///
    /// If it was created after every straggler seen so far it becomes the
    /// new reference point, and `placed_at` becomes the new bound. Returns
    /// whether the estimate moved.
    pub fn record_straggler(&mut self, creation: Timestamp, placed_at: Timestamp) -> bool {
        let newer = self
            .minimum_creation_time
            .is_none_or(|current| creation > current);
        if newer {
            self.minimum_creation_time = Some(creation);
            self.maximum_distribution_bound = Some(placed_at);
        }
        newer
    }

    /// Full coverage holds at `now`; pull the bound down to it if it is
    /// unset or later
    pub fn tighten(&mut self, now: Timestamp) {
        if self.maximum_distribution_bound.is_none_or(|bound| bound > now) {
            self.maximum_distribution_bound = Some(now);
        }
    }

    /// Current distribution time
    ///
    /// An unset creation time counts from the trace clock origin, not from
    /// one second before it; an unset bound yields `None`.
    pub fn distance(&self) -> Option<Duration> {
        let bound = self.maximum_distribution_bound?;
        let origin = self.minimum_creation_time.unwrap_or(Timestamp::ZERO);
        Some(bound.saturating_since(origin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_nanos(secs * 1_000_000_000)
    }

    #[test]
    fn test_starts_unset() {
        let estimate = DistributionEstimate::new();
        assert_eq!(estimate.minimum_creation_time(), None);
        assert_eq!(estimate.maximum_distribution_bound(), None);
        assert_eq!(estimate.distance(), None);
    }

    #[test]
    fn test_straggler_sets_both_scalars() {
        let mut estimate = DistributionEstimate::new();
        assert!(estimate.record_straggler(ts(6), ts(12)));
        assert_eq!(estimate.minimum_creation_time(), Some(ts(6)));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(12)));
    }

    #[test]
    fn test_older_straggler_is_ignored() {
        let mut estimate = DistributionEstimate::new();
        estimate.record_straggler(ts(8), ts(20));
        assert!(!estimate.record_straggler(ts(7), ts(25)));
        assert!(!estimate.record_straggler(ts(8), ts(25)));
        assert_eq!(estimate.minimum_creation_time(), Some(ts(8)));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(20)));
    }

    #[test]
    fn test_newer_straggler_can_move_bound_later() {
        let mut estimate = DistributionEstimate::new();
        estimate.tighten(ts(5));
        estimate.record_straggler(ts(6), ts(12));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(12)));
    }

    #[test]
    fn test_tighten_only_moves_down() {
        let mut estimate = DistributionEstimate::new();
        estimate.tighten(ts(20));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(20)));
        estimate.tighten(ts(30));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(20)));
        estimate.tighten(ts(15));
        assert_eq!(estimate.maximum_distribution_bound(), Some(ts(15)));
    }

    #[test]
    fn test_unset_creation_counts_from_clock_origin() {
        // No -1 s sentinel: a bound at 3.5 s reads 3.5 s, not 4.5 s
        let mut estimate = DistributionEstimate::new();
        estimate.tighten(Timestamp::from_nanos(3_500_000_000));
        assert_eq!(estimate.minimum_creation_time(), None);
        assert_eq!(estimate.distance(), Some(Duration::from_millis(3_500)));
    }

    #[test]
    fn test_distance() {
        let mut estimate = DistributionEstimate::new();
        estimate.tighten(ts(5));
        assert_eq!(estimate.distance(), Some(Duration::from_secs(5)));

        estimate.record_straggler(ts(8), ts(20));
        assert_eq!(estimate.distance(), Some(Duration::from_secs(12)));
    }
}
