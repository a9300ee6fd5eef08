//! Checkpoint store trait and error types

use thiserror::Error;

/// Errors that can occur while persisting checkpoints
///
/// Loading never produces one of these; unreadable checkpoints load as 0.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error writing checkpoint for {collection}: {source}")]
    Io {
        collection: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Trait for checkpoint backends
///
/// A checkpoint is the last page of a collection for which every page up
/// to and including it has been fetched and handed to the output. Page
/// numbers only mean something together with a page size, so both are
/// stored. Only the run coordinator writes checkpoints.
pub trait CheckpointStore: Send + Sync {
    /// Loads the last completed page for a collection
    ///
    /// `page_size` is the size the caller will page with. A checkpoint
    /// written at another size is converted to the number of `page_size`
    /// pages it fully covers.
    ///
    /// Returns 0 when no checkpoint exists or when the stored value is
    /// unreadable or malformed.
    fn load(&self, collection: &str, page_size: u64) -> u64;

    /// Durably stores the last completed page, replacing any prior value
    ///
    /// A crash during `save` must leave either the old or the new value
    /// readable, never a partial one.
    fn save(&self, collection: &str, last_page: u64, page_size: u64) -> CheckpointResult<()>;

    /// Removes the checkpoint so the next run starts from page 1
    fn clear(&self, collection: &str) -> CheckpointResult<()>;
}
