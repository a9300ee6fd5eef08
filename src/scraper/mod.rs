//! Scraper module for paginated issue collection
//!
//! This module contains the core scraping logic, including:
//! - A single-request HTTP transport with outcome classification
//! - Retry with bounded, rate-limit-aware backoff
//! - Page addressing and page fetching
//! - Contiguous checkpoint tracking
//! - Per-collection run coordination over a bounded worker pool

mod coordinator;
mod fetcher;
pub mod page;
mod progress;
mod retry;
mod transport;

pub use coordinator::CollectionScraper;
pub use fetcher::{FetchOutcome, PageFetcher};
pub use page::Page;
pub use progress::ContiguousTracker;
pub use retry::{FailureReason, RetryPolicy};
pub use transport::{classify_status, parse_retry_after, Transport, TransportOutcome};

use crate::config::{Config, Credentials};
use crate::output::ScrapeSummary;
use crate::HarvestError;

/// Scrapes a single collection with file-backed checkpoints and output
///
/// This is the simplest entry point: it builds a [`CollectionScraper`]
/// from the configuration and runs it once.
///
/// # Example
///
/// ```no_run
/// use jira_harvest::config::load_config;
/// use jira_harvest::scraper::scrape_collection;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = scrape_collection(&config, None, "ACCUMULO").await?;
/// println!("checkpoint now at page {}", summary.checkpoint);
/// # Ok(())
/// # }
/// ```
pub async fn scrape_collection(
    config: &Config,
    credentials: Option<Credentials>,
    collection: &str,
) -> Result<ScrapeSummary, HarvestError> {
    let scraper = CollectionScraper::from_config(config, credentials)?;
    scraper.scrape(collection).await
}
