use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Jira-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Collection identifiers (project keys) to scrape, in order
    #[serde(default)]
    pub projects: Vec<String>,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Number of concurrent page workers per collection
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: u32,

    /// Total attempts allowed for one logical request
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries (milliseconds), multiplied by the attempt number
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for any single wait (milliseconds)
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Wait used for HTTP 429 responses without a usable Retry-After (milliseconds)
    #[serde(rename = "rate-limit-wait-ms", default = "default_rate_limit_wait_ms")]
    pub rate_limit_wait_ms: u64,

    /// Number of issues requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u64,

    /// Timeout for a single HTTP request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ScraperConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.rate_limit_wait_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            rate_limit_wait_ms: default_rate_limit_wait_ms(),
            page_size: default_page_size(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Remote search API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Search endpoint URL
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// JQL template; `{collection}` is replaced with the project key
    #[serde(default = "default_jql")]
    pub jql: String,

    /// Value for the `expand` query parameter on page requests
    #[serde(default = "default_expand")]
    pub expand: Option<String>,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl ApiConfig {
    /// Renders the JQL filter for one collection
    pub fn jql_for(&self, collection: &str) -> String {
        self.jql.replace("{collection}", collection)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            jql: default_jql(),
            expand: default_expand(),
            user_agent: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the JSON and JSONL issue files
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// Directory holding one checkpoint file per collection
    #[serde(rename = "checkpoint-dir", default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            checkpoint_dir: default_checkpoint_dir(),
        }
    }
}

/// Basic-auth credentials for private trackers
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

// Keep the token out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn default_max_workers() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    5_000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_rate_limit_wait_ms() -> u64 {
    60_000
}

fn default_page_size() -> u64 {
    50
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_base_url() -> String {
    "https://issues.apache.org/jira/rest/api/2/search".to_string()
}

fn default_jql() -> String {
    "project={collection}".to_string()
}

fn default_expand() -> Option<String> {
    Some("comments".to_string())
}

fn default_user_agent() -> String {
    concat!("jira-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_checkpoint_dir() -> String {
    "checkpoints".to_string()
}
