//! Checkpoint module for resumable runs
//!
//! This module persists, per collection, the last page for which every
//! earlier page has been fetched and written:
//! - Loading never fails; missing or corrupt checkpoints mean "start over"
//! - Saving is atomic with respect to crashes (write, sync, rename)
//! - Clearing supports fresh runs

mod file;
mod traits;

pub use file::FileCheckpointStore;
pub use traits::{CheckpointError, CheckpointResult, CheckpointStore};
