//! Jira-Harvest: a resumable issue-tracker scraper
//!
//! This crate pages through a remote issue search API, fetching pages
//! concurrently under a bounded retry policy, and records per-collection
//! progress so an interrupted run resumes without skipping or re-marking
//! pages.

pub mod checkpoint;
pub mod config;
pub mod output;
pub mod scraper;
pub mod state;
pub mod transform;

use thiserror::Error;

/// Main error type for Jira-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Could not determine issue count for {collection}: {reason}")]
    TotalUnavailable {
        collection: String,
        reason: scraper::FailureReason,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Jira-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::{CheckpointStore, FileCheckpointStore};
pub use config::Config;
pub use output::{FileSink, RecordSink, ScrapeSummary};
pub use scraper::CollectionScraper;
pub use state::RunPhase;
pub use transform::{transform_issue, IssueRecord};
