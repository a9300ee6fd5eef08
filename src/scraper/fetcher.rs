//! Page fetcher
//!
//! Builds page-scoped search queries and runs them through the retry
//! policy. The fetcher never touches checkpoints or output files, so any
//! number of pages of the same collection can be fetched concurrently.

use crate::config::{ApiConfig, Config, Credentials};
use crate::scraper::page::Page;
use crate::scraper::retry::{FailureReason, RetryPolicy};
use crate::scraper::transport::Transport;
use serde::Deserialize;
use serde_json::Value;

/// Result of fetching one page
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The page's raw issues, in the order the API returned them
    Success(Vec<Value>),

    /// Retries ran out on transient errors; a later run may succeed
    RetryableFailure(FailureReason),

    /// The request cannot succeed as issued (client error, bad payload)
    FatalFailure(FailureReason),
}

impl FetchOutcome {
    fn from_failure(reason: FailureReason) -> Self {
        if reason.is_transient() {
            Self::RetryableFailure(reason)
        } else {
            Self::FatalFailure(reason)
        }
    }
}

/// Subset of the search response the scraper reads
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    issues: Vec<Value>,
}

/// Fetches pages of a collection from the search API
#[derive(Debug, Clone)]
pub struct PageFetcher {
    transport: Transport,
    retry: RetryPolicy,
    api: ApiConfig,
    page_size: u64,
}

impl PageFetcher {
    pub fn new(transport: Transport, retry: RetryPolicy, api: ApiConfig, page_size: u64) -> Self {
        Self {
            transport,
            retry,
            api,
            page_size,
        }
    }

    /// Builds a fetcher, its transport, and its retry policy from config
    pub fn from_config(
        config: &Config,
        credentials: Option<Credentials>,
    ) -> Result<Self, reqwest::Error> {
        let transport = Transport::new(
            &config.api,
            config.scraper.request_timeout(),
            credentials,
        )?;
        Ok(Self::new(
            transport,
            RetryPolicy::from_config(&config.scraper),
            config.api.clone(),
            config.scraper.page_size,
        ))
    }

    /// Issues per page
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Queries the total issue count with a single-result request
    pub async fn fetch_total(&self, collection: &str) -> Result<u64, FailureReason> {
        let params = vec![
            ("jql", self.api.jql_for(collection)),
            ("maxResults", "1".to_string()),
        ];
        let label = format!("{} total", collection);
        let response = self.search(&label, &params).await?;
        Ok(response.total)
    }

    /// Fetches one page of raw issues
    ///
    /// # Arguments
    ///
    /// * `collection` - Project key
    /// * `page_index` - 1-based page number
    pub async fn fetch_page(&self, collection: &str, page_index: u64) -> FetchOutcome {
        let page = Page::new(page_index, self.page_size);
        let mut params = vec![
            ("jql", self.api.jql_for(collection)),
            ("startAt", page.offset().to_string()),
            ("maxResults", page.size.to_string()),
        ];
        if let Some(expand) = self.api.expand.as_deref().filter(|e| !e.is_empty()) {
            params.push(("expand", expand.to_string()));
        }

        let label = format!("{} page {}", collection, page_index);
        match self.search(&label, &params).await {
            Ok(response) => {
                tracing::debug!(
                    collection,
                    page = page_index,
                    issues = response.issues.len(),
                    "Fetched page"
                );
                FetchOutcome::Success(response.issues)
            }
            Err(reason) => FetchOutcome::from_failure(reason),
        }
    }

    async fn search(
        &self,
        label: &str,
        params: &[(&str, String)],
    ) -> Result<SearchResponse, FailureReason> {
        let request = self
            .transport
            .get(&self.api.base_url)
            .query(params)
            .build()
            .map_err(|e| FailureReason::InvalidRequest(e.to_string()))?;

        let transport = &self.transport;
        let request = &request;
        let body = self
            .retry
            .call_with_retry(label, move || transport.execute(request))
            .await?;

        serde_json::from_str(&body).map_err(|e| FailureReason::MalformedResponse(e.to_string()))
    }
}
