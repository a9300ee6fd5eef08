//! Collection scraper - run orchestration for one collection
//!
//! A run:
//! 1. Queries the total issue count and derives the page count
//! 2. Loads the checkpoint and queues every page above it
//! 3. Starts a bounded pool of workers that fetch pages, transform the
//!    issues and append them to the sink
//! 4. Reconciles worker reports on a single task, advancing and persisting
//!    the checkpoint only across a contiguous prefix of completed pages
//! 5. Finalizes the sink and returns a summary listing failed pages
//!
//! Workers never touch the checkpoint store. Stopping the process at any
//! point is safe: the next run resumes above the stored checkpoint and
//! refetches at most the pages that were in flight or held back.

use crate::checkpoint::{CheckpointStore, FileCheckpointStore};
use crate::config::{Config, Credentials, ScraperConfig};
use crate::output::{FileSink, PageFailure, RecordSink, ScrapeSummary};
use crate::scraper::fetcher::{FetchOutcome, PageFetcher};
use crate::scraper::page;
use crate::scraper::progress::ContiguousTracker;
use crate::state::RunPhase;
use crate::transform::{transform_issue, IssueRecord};
use crate::HarvestError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Log a progress line every this many finished pages
const PROGRESS_LOG_INTERVAL: u64 = 10;

/// Pages waiting for a worker
type PageQueue = Mutex<VecDeque<u64>>;

/// What a worker reports for one page
#[derive(Debug)]
struct PageReport {
    page: u64,
    /// Records written on success
    result: Result<usize, PageFailure>,
}

/// Totals gathered while reconciling worker reports
struct FetchTotals {
    tracker: ContiguousTracker,
    failures: Vec<PageFailure>,
    records_written: u64,
}

/// Scrapes collections page by page with resumable progress
pub struct CollectionScraper {
    config: ScraperConfig,
    fetcher: Arc<PageFetcher>,
    checkpoints: Arc<dyn CheckpointStore>,
    sink: Arc<dyn RecordSink>,
}

impl CollectionScraper {
    /// Creates a scraper from its collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count and paging settings
    /// * `fetcher` - Page fetcher (transport + retry policy)
    /// * `checkpoints` - Checkpoint store, written only by this scraper
    /// * `sink` - Destination for transformed records
    pub fn new(
        config: ScraperConfig,
        fetcher: PageFetcher,
        checkpoints: Arc<dyn CheckpointStore>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
            checkpoints,
            sink,
        }
    }

    /// Builds a scraper with file-backed checkpoints and output
    ///
    /// # Returns
    ///
    /// * `Ok(CollectionScraper)` - Ready to scrape
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn from_config(
        config: &Config,
        credentials: Option<Credentials>,
    ) -> Result<Self, HarvestError> {
        let fetcher = PageFetcher::from_config(config, credentials)?;
        let checkpoints = Arc::new(FileCheckpointStore::new(&config.output.checkpoint_dir));
        let sink = Arc::new(FileSink::new(&config.output.output_dir));
        Ok(Self::new(config.scraper.clone(), fetcher, checkpoints, sink))
    }

    /// Clears the checkpoint and output of a collection
    pub fn reset(&self, collection: &str) -> Result<(), HarvestError> {
        self.checkpoints.clear(collection)?;
        self.sink.reset(collection)?;
        Ok(())
    }

    /// Runs one collection to completion
    ///
    /// Page failures do not abort the run; they are listed in the
    /// returned summary and the checkpoint stays below the first one.
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeSummary)` - The run finished, possibly with failed pages
    /// * `Err(HarvestError)` - The issue count could not be fetched, or a
    ///   checkpoint/output write failed
    pub async fn scrape(&self, collection: &str) -> Result<ScrapeSummary, HarvestError> {
        let started = Instant::now();
        let mut phase = RunPhase::Init;
        tracing::info!(collection, "Scraper initiated");

        phase.advance(RunPhase::CountingTotal, collection);
        let total_records = self.fetcher.fetch_total(collection).await.map_err(|reason| {
            HarvestError::TotalUnavailable {
                collection: collection.to_string(),
                reason,
            }
        })?;
        let total_pages = page::total_pages(total_records, self.fetcher.page_size());
        tracing::info!(collection, total_records, total_pages, "Total issues found");

        phase.advance(RunPhase::Planning, collection);
        let page_size = self.fetcher.page_size();
        let starting_checkpoint = self.checkpoints.load(collection, page_size);
        if starting_checkpoint > total_pages {
            tracing::warn!(
                collection,
                checkpoint = starting_checkpoint,
                total_pages,
                "Checkpoint is past the current page count, nothing to fetch"
            );
        }
        let pending: VecDeque<u64> = page::pending_pages(starting_checkpoint, total_pages).collect();
        tracing::info!(
            collection,
            resume_from = starting_checkpoint.saturating_add(1),
            pending = pending.len(),
            "Planned pages"
        );

        phase.advance(RunPhase::FetchingConcurrent, collection);
        let mut totals = self
            .fetch_pending(collection, starting_checkpoint, pending)
            .await?;
        self.sink.finish(collection)?;

        totals.failures.sort_by_key(|f| f.page);
        let outcome = if totals.failures.is_empty() {
            RunPhase::Completed
        } else {
            RunPhase::PartiallyFailed
        };
        phase.advance(outcome, collection);

        let summary = ScrapeSummary {
            collection: collection.to_string(),
            total_records,
            total_pages,
            starting_checkpoint,
            checkpoint: totals.tracker.checkpoint(),
            pages_completed: totals.tracker.completed_count(),
            failed_pages: totals.failures,
            records_written: totals.records_written,
            phase,
            duration: started.elapsed(),
        };

        if summary.phase.is_success() {
            tracing::info!(
                collection,
                pages = summary.pages_completed,
                records = summary.records_written,
                checkpoint = summary.checkpoint,
                "Finished collection"
            );
        } else {
            tracing::warn!(
                collection,
                pages = summary.pages_completed,
                failed = summary.pages_failed(),
                checkpoint = summary.checkpoint,
                "Finished collection with failed pages"
            );
        }

        Ok(summary)
    }

    /// Fetches `pending` with the worker pool and reconciles reports
    async fn fetch_pending(
        &self,
        collection: &str,
        starting_checkpoint: u64,
        pending: VecDeque<u64>,
    ) -> Result<FetchTotals, HarvestError> {
        let planned = pending.len() as u64;
        let worker_count = (self.config.max_workers.max(1) as usize).min(pending.len());
        let queue: Arc<PageQueue> = Arc::new(Mutex::new(pending));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let fetcher = Arc::clone(&self.fetcher);
            let sink = Arc::clone(&self.sink);
            let tx = tx.clone();
            let collection = collection.to_string();

            workers.spawn(async move {
                run_worker(worker_id, &collection, &fetcher, &sink, &queue, &tx).await
            });
        }
        drop(tx);

        let mut totals = FetchTotals {
            tracker: ContiguousTracker::new(starting_checkpoint),
            failures: Vec::new(),
            records_written: 0,
        };
        let mut finished = 0u64;

        // Single reconciliation point: the only place checkpoints are saved
        while let Some(report) = rx.recv().await {
            finished += 1;
            match report.result {
                Ok(written) => {
                    totals.records_written += written as u64;
                    if let Some(checkpoint) = totals.tracker.complete(report.page) {
                        self.checkpoints
                            .save(collection, checkpoint, self.fetcher.page_size())?;
                    }
                }
                Err(failure) => {
                    tracing::error!(
                        collection,
                        page = failure.page,
                        reason = %failure.reason,
                        retryable = failure.retryable,
                        "Page failed"
                    );
                    totals.failures.push(failure);
                }
            }

            if finished % PROGRESS_LOG_INTERVAL == 0 || finished == planned {
                tracing::info!(
                    collection,
                    finished,
                    planned,
                    checkpoint = totals.tracker.checkpoint(),
                    held_back = totals.tracker.held_back(),
                    failed = totals.failures.len(),
                    "Progress"
                );
            }
        }

        while let Some(joined) = workers.join_next().await {
            joined.map_err(|e| HarvestError::Worker(e.to_string()))?;
        }

        Ok(totals)
    }
}

/// Takes pages off the queue until it is empty
async fn run_worker(
    worker_id: usize,
    collection: &str,
    fetcher: &PageFetcher,
    sink: &Arc<dyn RecordSink>,
    queue: &PageQueue,
    tx: &mpsc::UnboundedSender<PageReport>,
) {
    tracing::trace!(collection, worker_id, "Worker started");

    while let Some(page) = next_page(queue) {
        let result = process_page(collection, page, fetcher, sink).await;
        if tx.send(PageReport { page, result }).is_err() {
            // Coordinator stopped listening
            break;
        }
    }

    tracing::trace!(collection, worker_id, "Worker finished");
}

fn next_page(queue: &PageQueue) -> Option<u64> {
    queue
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .pop_front()
}

/// Fetches one page and hands its records to the sink
///
/// Sink writes sync to disk, so they run on the blocking pool.
async fn process_page(
    collection: &str,
    page: u64,
    fetcher: &PageFetcher,
    sink: &Arc<dyn RecordSink>,
) -> Result<usize, PageFailure> {
    match fetcher.fetch_page(collection, page).await {
        FetchOutcome::Success(issues) => {
            let records: Vec<IssueRecord> = issues.iter().map(transform_issue).collect();
            let sink = Arc::clone(sink);
            let owned_collection = collection.to_string();
            let appended =
                tokio::task::spawn_blocking(move || sink.append(&owned_collection, &records))
                    .await;

            let reason = match appended {
                Ok(Ok(written)) => return Ok(written),
                Ok(Err(e)) => format!("output error: {}", e),
                Err(e) => format!("output task failed: {}", e),
            };
            Err(PageFailure {
                page,
                reason,
                retryable: true,
            })
        }
        FetchOutcome::RetryableFailure(reason) => Err(PageFailure {
            page,
            reason: reason.to_string(),
            retryable: true,
        }),
        FetchOutcome::FatalFailure(reason) => Err(PageFailure {
            page,
            reason: reason.to_string(),
            retryable: false,
        }),
    }
}
