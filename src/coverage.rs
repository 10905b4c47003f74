//! Processor coverage evaluation
//!
//! Pure functions over the current tracker contents: which processors host
//! at least one placed workload thread, and whether that amounts to full
//! distribution.
//!
//! When processors outnumber workload threads only the *count* of idle
//! processors is checked (`processor_count - members`), not which ones are
//! idle. Because unplaced threads never mark a slot, a matching count still
//! implies every member sits on its own processor; placements outside
//! `0..processor_count` are the one way the count can be off.

use crate::membership::WorkloadMembership;
use crate::tracker::ThreadTracker;

/// Result of one coverage evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    /// Processors hosting no placed workload thread
    pub uncovered: usize,
    /// Workload threads considered
    pub members: usize,
    /// Processor count the evaluation was done against
    pub processor_count: usize,
}

impl Coverage {
    /// Every processor is occupied, or the idle ones are exactly those a
    /// smaller workload cannot fill
    pub fn is_full(&self) -> bool {
        self.uncovered == 0
            || (self.processor_count > self.members
                && self.uncovered == self.processor_count - self.members)
    }
}

/// Mark processors occupied by placed members and count the free ones
///
/// Placements on processors `>= processor_count` mark nothing, so the
/// result is always within `[0, processor_count]`.
pub fn uncovered_processors(
    membership: &WorkloadMembership,
    tracker: &ThreadTracker,
    processor_count: usize,
) -> usize {
    let mut covered = vec![false; processor_count];

    for tid in membership.iter() {
        let Some(processor) = tracker.get(tid).and_then(|state| state.last_processor) else {
            continue;
        };
        if let Some(slot) = covered.get_mut(processor as usize) {
            *slot = true;
        }
    }

    covered.iter().filter(|occupied| !**occupied).count()
}

/// Evaluate coverage for the current tracker state
pub fn evaluate(
    membership: &WorkloadMembership,
    tracker: &ThreadTracker,
    processor_count: usize,
) -> Coverage {
    Coverage {
        uncovered: uncovered_processors(membership, tracker, processor_count),
        members: membership.len(),
        processor_count,
    }
}
