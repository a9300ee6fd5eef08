//! Output sink traits and run summary types
//!
//! This module defines the trait interface for record sinks and the
//! summary a collection run reports back to its caller.

use crate::state::RunPhase;
use crate::transform::IssueRecord;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to persist {path}: {message}")]
    Persist { path: String, message: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Receives transformed records for a collection
///
/// Implementations are shared by all page workers, so every method takes
/// `&self` and must be safe to call concurrently for the same collection.
pub trait RecordSink: Send + Sync {
    /// Appends one page's records
    ///
    /// Records must be durable when this returns `Ok`, since the page may
    /// then be covered by a checkpoint. Returns the number of records
    /// actually written, which is lower than `records.len()` when some were
    /// already present.
    fn append(&self, collection: &str, records: &[IssueRecord]) -> OutputResult<usize>;

    /// Finalizes derived outputs for a collection after a run
    ///
    /// Returns the number of records in the collection's output.
    fn finish(&self, collection: &str) -> OutputResult<usize>;

    /// Deletes all output for a collection
    fn reset(&self, collection: &str) -> OutputResult<()>;
}

/// A page that did not complete during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// 1-based page number
    pub page: u64,

    /// Human-readable reason
    pub reason: String,

    /// Whether a later run is likely to succeed without intervention
    pub retryable: bool,
}

/// Summary of one collection run
#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    /// Collection identifier
    pub collection: String,

    /// Issue count reported by the API at the start of the run
    pub total_records: u64,

    /// Pages needed to cover `total_records`
    pub total_pages: u64,

    /// Checkpoint loaded at the start of the run
    pub starting_checkpoint: u64,

    /// Checkpoint persisted at the end of the run
    pub checkpoint: u64,

    /// Pages fetched and written during this run
    pub pages_completed: u64,

    /// Pages that failed, in ascending page order
    pub failed_pages: Vec<PageFailure>,

    /// Records appended to the output during this run
    pub records_written: u64,

    /// Terminal run phase
    pub phase: RunPhase,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl ScrapeSummary {
    /// Number of failed pages
    pub fn pages_failed(&self) -> usize {
        self.failed_pages.len()
    }

    /// Returns true if every page of the collection is covered by the checkpoint
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty() && self.checkpoint >= self.total_pages
    }
}
