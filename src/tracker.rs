//! Per-thread placement tracking
//!
//! Every workload thread moves through `Unseen -> Unplaced -> Placed(cpu)`
//! and may be re-placed any number of times. The tracker only remembers the
//! most recent placement plus the moment the thread was first observed.

use crate::timestamp::Timestamp;
use std::collections::HashMap;

/// Last known state of one thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadState {
    /// Timestamp of the most recent event for this thread
    pub last_timestamp: Timestamp,
    /// Processor from the most recent event, `None` while unplaced
    pub last_processor: Option<u32>,
    /// Timestamp of the first event for this thread; never updated
    pub creation_timestamp: Timestamp,
}

impl ThreadState {
    pub fn is_placed(&self) -> bool {
        self.last_processor.is_some()
    }
}

/// Map from thread id to [`ThreadState`]
///
/// A state exists for a thread id if and only if at least one event for it
/// has been observed. There is no removal.
#[derive(Debug, Default)]
pub struct ThreadTracker {
    threads: HashMap<String, ThreadState>,
}

impl ThreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event for `tid`
    ///
    /// The first observation fixes the creation timestamp; later ones only
    /// move the last timestamp and processor.
    pub fn observe(&mut self, tid: &str, timestamp: Timestamp, processor: Option<u32>) {
        match self.threads.get_mut(tid) {
            Some(state) => {
                state.last_timestamp = timestamp;
                state.last_processor = processor;
            }
            None => {
                self.threads.insert(
                    tid.to_string(),
                    ThreadState {
                        last_timestamp: timestamp,
                        last_processor: processor,
                        creation_timestamp: timestamp,
                    },
                );
            }
        }
    }

    pub fn get(&self, tid: &str) -> Option<&ThreadState> {
        self.threads.get(tid)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
