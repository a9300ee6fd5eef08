//! HTTP transport layer
//!
//! Performs exactly one request per call and classifies the result:
//! - 2xx → `Ok` with the body
//! - 429 → `RateLimited`, carrying the parsed `Retry-After` hint
//! - 5xx → `ServerError`
//! - any other status → `ClientError` (not retried)
//! - connect/timeout/DNS/body errors → `NetworkError`

use crate::config::{ApiConfig, Credentials};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Request, RequestBuilder, StatusCode};
use std::fmt;
use std::time::Duration;

/// Connect timeout applied to every request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Classified result of a single HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// 2xx response
    Ok {
        /// Response body
        body: String,
    },

    /// HTTP 429
    RateLimited {
        /// Server-requested wait, if the header was present and parseable
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx
    ServerError {
        /// The HTTP status code
        status: u16,
    },

    /// Any non-2xx, non-429, non-5xx status
    ClientError {
        /// The HTTP status code
        status: u16,
    },

    /// The request never produced a complete response
    NetworkError {
        /// Error description
        error: String,
    },
}

impl TransportOutcome {
    /// Returns true if repeating the request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::NetworkError { .. }
        )
    }
}

impl fmt::Display for TransportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok { body } => write!(f, "ok ({} bytes)", body.len()),
            Self::RateLimited {
                retry_after: Some(wait),
            } => write!(f, "HTTP 429 (retry after {:?})", wait),
            Self::RateLimited { retry_after: None } => write!(f, "HTTP 429"),
            Self::ServerError { status } => write!(f, "HTTP {} server error", status),
            Self::ClientError { status } => write!(f, "HTTP {}", status),
            Self::NetworkError { error } => write!(f, "network error: {}", error),
        }
    }
}

/// HTTP transport shared by every worker
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    credentials: Option<Credentials>,
}

impl Transport {
    /// Builds the transport and its HTTP client
    ///
    /// # Arguments
    ///
    /// * `api` - API configuration (user agent)
    /// * `timeout` - Total timeout for a single request
    /// * `credentials` - Optional basic-auth credentials
    ///
    /// # Returns
    ///
    /// * `Ok(Transport)` - Successfully built transport
    /// * `Err(reqwest::Error)` - Failed to build the HTTP client
    pub fn new(
        api: &ApiConfig,
        timeout: Duration,
        credentials: Option<Credentials>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(api.user_agent.as_str())
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            credentials,
        })
    }

    /// Starts a GET request, with basic auth applied when configured
    pub fn get(&self, url: &str) -> RequestBuilder {
        let builder = self.client.get(url);
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.token)),
            None => builder,
        }
    }

    /// Sends one request and classifies the response
    ///
    /// The request is cloned so the caller can replay it on retry.
    pub async fn execute(&self, request: &Request) -> TransportOutcome {
        let Some(request) = request.try_clone() else {
            return TransportOutcome::NetworkError {
                error: "request body cannot be replayed".to_string(),
            };
        };

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        match classify_status(status, response.headers()) {
            Some(outcome) => outcome,
            None => match response.text().await {
                Ok(body) => TransportOutcome::Ok { body },
                Err(e) => classify_error(&e),
            },
        }
    }
}

/// Classifies a status code
///
/// Returns `None` for success statuses, whose body still has to be read.
pub fn classify_status(status: StatusCode, headers: &HeaderMap) -> Option<TransportOutcome> {
    if status.is_success() {
        return None;
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        return Some(TransportOutcome::RateLimited { retry_after });
    }

    if status.is_server_error() {
        return Some(TransportOutcome::ServerError {
            status: status.as_u16(),
        });
    }

    Some(TransportOutcome::ClientError {
        status: status.as_u16(),
    })
}

/// Parses a `Retry-After` value as delta-seconds or an HTTP-date
///
/// Dates in the past yield a zero wait.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

fn classify_error(error: &reqwest::Error) -> TransportOutcome {
    let error = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    TransportOutcome::NetworkError { error }
}
