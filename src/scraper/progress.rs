//! Contiguous completion tracking
//!
//! Pages finish in any order, but the checkpoint may only cover a prefix
//! of pages that have all completed. Completions past a gap are held until
//! the gap fills. A failed page never completes, so it holds the checkpoint
//! below it for the rest of the run.

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ContiguousTracker {
    checkpoint: u64,
    completed_ahead: BTreeSet<u64>,
    completed_count: u64,
}

impl ContiguousTracker {
    /// Starts tracking above an existing checkpoint
    pub fn new(checkpoint: u64) -> Self {
        Self {
            checkpoint,
            completed_ahead: BTreeSet::new(),
            completed_count: 0,
        }
    }

    /// Records a successful page
    ///
    /// Returns the new checkpoint if this completion extended the
    /// contiguous prefix, `None` otherwise.
    pub fn complete(&mut self, page: u64) -> Option<u64> {
        if page <= self.checkpoint {
            return None;
        }
        if !self.completed_ahead.insert(page) {
            return None;
        }
        self.completed_count += 1;

        let before = self.checkpoint;
        while self.completed_ahead.remove(&self.checkpoint.saturating_add(1)) {
            self.checkpoint += 1;
        }

        (self.checkpoint > before).then_some(self.checkpoint)
    }

    /// Highest page `N` such that every page up to `N` has completed
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint
    }

    /// Pages completed in this run, in or out of order
    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    /// Completed pages waiting on an earlier page
    pub fn held_back(&self) -> usize {
        self.completed_ahead.len()
    }
}
