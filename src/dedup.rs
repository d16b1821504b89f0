//! Deduplication index for job scheduling
//!
//! Multiple in-flight jobs can discover the same dependency concurrently.
//! The index is the sole mechanism preventing a second job for an already
//! seen key from ever being scheduled: the first `try_claim` for a key wins
//! and every later one loses. Claims are never released; they last for the
//! lifetime of the index, which is owned by the scheduler of a single run
//! rather than being process-global, so independent runs in one process do
//! not contaminate each other.

use std::collections::HashSet;
use std::sync::Mutex;

/// Process-lifetime set of job keys already accepted for scheduling
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: Mutex<HashSet<String>>,
}

impl DedupIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically tests and claims a key
    ///
    /// Returns `true` if the key had not been claimed before (the caller now
    /// owns the only scheduling slot for it), `false` if it was already
    /// claimed. Safe to call concurrently from multiple workers.
    pub fn try_claim(&self, key: &str) -> bool {
        self.seen.lock().unwrap().insert(key.to_string())
    }

    /// Returns the number of claimed keys
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Returns whether no key has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.seen.lock().unwrap().is_empty()
    }
}
