//! Integration tests for the scraper
//!
//! These tests use wiremock to stand in for the issue search API and run
//! full collection scrapes against temporary checkpoint and output
//! directories.

use jira_harvest::checkpoint::{CheckpointStore, FileCheckpointStore};
use jira_harvest::config::{ApiConfig, Config, Credentials, OutputConfig, ScraperConfig};
use jira_harvest::scraper::{CollectionScraper, FetchOutcome, PageFetcher};
use jira_harvest::{IssueRecord, RunPhase};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEARCH_PATH: &str = "/rest/api/2/search";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &Path, page_size: u64) -> Config {
    Config {
        scraper: ScraperConfig {
            max_workers: 3,
            max_retries: 3,
            retry_backoff_ms: 5,
            max_backoff_ms: 5_000,
            rate_limit_wait_ms: 10,
            page_size,
            request_timeout_ms: 5_000,
        },
        api: ApiConfig {
            base_url: format!("{}{}", server.uri(), SEARCH_PATH),
            ..ApiConfig::default()
        },
        output: OutputConfig {
            output_dir: dir.join("output").display().to_string(),
            checkpoint_dir: dir.join("checkpoints").display().to_string(),
        },
        projects: vec!["ACE".to_string()],
    }
}

fn issue(key: &str) -> Value {
    json!({
        "key": key,
        "fields": {
            "project": { "key": "ACE" },
            "summary": format!("Summary of {}", key),
            "description": "Something is broken",
            "status": { "name": "Open" }
        }
    })
}

/// Body for a page starting at `start_at` holding `count` issues
fn page_body(start_at: u64, count: u64, total: u64) -> Value {
    let issues: Vec<Value> = (start_at + 1..=start_at + count)
        .map(|n| issue(&format!("ACE-{}", n)))
        .collect();
    json!({
        "startAt": start_at,
        "maxResults": count,
        "total": total,
        "issues": issues
    })
}

async fn mount_total(server: &MockServer, total: u64) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("maxResults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0, total.min(1), total)))
        .mount(server)
        .await;
}

/// Mock for the page starting at `start_at`, with page size 100
fn page_mock(start_at: u64) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("startAt", start_at.to_string().as_str()))
        .and(query_param("maxResults", "100"))
}

async fn mount_ok_page(server: &MockServer, start_at: u64, count: u64, total: u64, expected: u64) {
    page_mock(start_at)
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(start_at, count, total)))
        .expect(expected)
        .mount(server)
        .await;
}

fn jsonl_records(dir: &Path) -> Vec<IssueRecord> {
    let path = dir.join("output").join("ace_issues.jsonl");
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid JSONL line"))
        .collect()
}

fn checkpoint_store(dir: &Path) -> FileCheckpointStore {
    FileCheckpointStore::new(dir.join("checkpoints"))
}

#[tokio::test]
async fn test_full_scrape_completes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 250).await;
    mount_ok_page(&server, 0, 100, 250, 1).await;
    mount_ok_page(&server, 100, 100, 250, 1).await;
    mount_ok_page(&server, 200, 50, 250, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.total_records, 250);
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.checkpoint, 3);
    assert_eq!(summary.pages_completed, 3);
    assert_eq!(summary.records_written, 250);
    assert_eq!(summary.phase, RunPhase::Completed);
    assert!(summary.is_complete());
    assert_eq!(checkpoint_store(dir.path()).load("ACE", 100), 3);

    let records = jsonl_records(dir.path());
    assert_eq!(records.len(), 250);
    assert_eq!(records[0].project, "ACE");

    let aggregate = std::fs::read_to_string(dir.path().join("output").join("ace_issues.json")).unwrap();
    let aggregate: Vec<IssueRecord> = serde_json::from_str(&aggregate).unwrap();
    assert_eq!(aggregate.len(), 250);
}

#[tokio::test]
async fn test_exhausted_page_blocks_checkpoint_and_rerun_fetches_only_it() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 100);

    // First run: page 3 keeps returning 500
    mount_total(&server, 250).await;
    mount_ok_page(&server, 0, 100, 250, 1).await;
    mount_ok_page(&server, 100, 100, 250, 1).await;
    page_mock(200)
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.checkpoint, 2);
    assert_eq!(summary.phase, RunPhase::PartiallyFailed);
    assert_eq!(summary.pages_failed(), 1);
    assert_eq!(summary.failed_pages[0].page, 3);
    assert!(summary.failed_pages[0].retryable);
    assert_eq!(checkpoint_store(dir.path()).load("ACE", 100), 2);
    server.verify().await;

    // Second run: only page 3 is requested
    server.reset().await;
    mount_total(&server, 250).await;
    mount_ok_page(&server, 0, 100, 250, 0).await;
    mount_ok_page(&server, 100, 100, 250, 0).await;
    mount_ok_page(&server, 200, 50, 250, 1).await;

    let summary = scraper.scrape("ACE").await.unwrap();
    assert_eq!(summary.starting_checkpoint, 2);
    assert_eq!(summary.checkpoint, 3);
    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.phase, RunPhase::Completed);
    assert_eq!(jsonl_records(dir.path()).len(), 250);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 150).await;
    mount_ok_page(&server, 0, 100, 150, 1).await;
    mount_ok_page(&server, 100, 50, 150, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();

    let first = scraper.scrape("ACE").await.unwrap();
    assert_eq!(first.records_written, 150);

    let second = scraper.scrape("ACE").await.unwrap();
    assert_eq!(second.starting_checkpoint, 2);
    assert_eq!(second.pages_completed, 0);
    assert_eq!(second.records_written, 0);
    assert_eq!(second.phase, RunPhase::Completed);

    assert_eq!(jsonl_records(dir.path()).len(), 150);
}

#[tokio::test]
async fn test_not_found_fails_page_without_retry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 300).await;
    mount_ok_page(&server, 0, 100, 300, 1).await;
    page_mock(100)
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_ok_page(&server, 200, 100, 300, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    // Page 3 succeeded but cannot be covered while page 2 is missing
    assert_eq!(summary.checkpoint, 1);
    assert_eq!(summary.pages_completed, 2);
    assert_eq!(summary.failed_pages.len(), 1);
    assert_eq!(summary.failed_pages[0].page, 2);
    assert!(!summary.failed_pages[0].retryable);
    assert!(summary.failed_pages[0].reason.contains("404"));
}

#[tokio::test]
async fn test_refetched_pages_do_not_duplicate_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path(), 100);

    mount_total(&server, 200).await;
    page_mock(0)
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_ok_page(&server, 100, 100, 200, 1).await;

    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();
    assert_eq!(summary.checkpoint, 0);
    assert_eq!(jsonl_records(dir.path()).len(), 100);

    // Page 2 is fetched again because the checkpoint never covered it
    server.reset().await;
    mount_total(&server, 200).await;
    mount_ok_page(&server, 0, 100, 200, 1).await;
    mount_ok_page(&server, 100, 100, 200, 1).await;

    let summary = scraper.scrape("ACE").await.unwrap();
    assert_eq!(summary.checkpoint, 2);
    assert_eq!(summary.records_written, 100);

    let records = jsonl_records(dir.path());
    assert_eq!(records.len(), 200);
    let mut keys: Vec<_> = records.iter().map(|r| r.issue_key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 200);
}

#[tokio::test]
async fn test_out_of_order_completion_reaches_full_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 300).await;
    page_mock(0)
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(0, 100, 300))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_ok_page(&server, 100, 100, 300, 1).await;
    mount_ok_page(&server, 200, 100, 300, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.checkpoint, 3);
    assert_eq!(summary.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_resumes_from_saved_checkpoint() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    checkpoint_store(dir.path()).save("ACE", 2, 100).unwrap();

    mount_total(&server, 250).await;
    mount_ok_page(&server, 0, 100, 250, 0).await;
    mount_ok_page(&server, 100, 100, 250, 0).await;
    mount_ok_page(&server, 200, 50, 250, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.starting_checkpoint, 2);
    assert_eq!(summary.checkpoint, 3);
    assert_eq!(summary.records_written, 50);
}

#[tokio::test]
async fn test_page_size_change_never_skips_issues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Two pages of 50 cover issues 0..100, which is page 1 at size 100
    checkpoint_store(dir.path()).save("ACE", 2, 50).unwrap();

    mount_total(&server, 400).await;
    mount_ok_page(&server, 0, 100, 400, 0).await;
    mount_ok_page(&server, 100, 100, 400, 1).await;
    mount_ok_page(&server, 200, 100, 400, 1).await;
    mount_ok_page(&server, 300, 100, 400, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.starting_checkpoint, 1);
    assert_eq!(summary.checkpoint, 4);
    assert_eq!(summary.pages_completed, 3);
    assert!(summary.is_complete());
    assert_eq!(checkpoint_store(dir.path()).load("ACE", 100), 4);
}

#[tokio::test]
async fn test_maximal_checkpoint_does_not_crash() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    checkpoint_store(dir.path()).save("ACE", u64::MAX, 100).unwrap();

    mount_total(&server, 250).await;
    mount_ok_page(&server, 0, 100, 250, 0).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.starting_checkpoint, u64::MAX);
    assert_eq!(summary.pages_completed, 0);
    assert_eq!(summary.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_corrupt_checkpoint_restarts_from_first_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let store = checkpoint_store(dir.path());
    std::fs::create_dir_all(store.dir()).unwrap();
    std::fs::write(store.path_for("ACE"), "{\"last_page\": tru").unwrap();

    mount_total(&server, 200).await;
    mount_ok_page(&server, 0, 100, 200, 1).await;
    mount_ok_page(&server, 100, 100, 200, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.starting_checkpoint, 0);
    assert_eq!(summary.checkpoint, 2);
    assert_eq!(store.load("ACE", 100), 2);
}

#[tokio::test]
async fn test_reset_starts_over() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 100).await;
    mount_ok_page(&server, 0, 100, 100, 2).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();

    scraper.scrape("ACE").await.unwrap();
    scraper.reset("ACE").unwrap();
    assert_eq!(checkpoint_store(dir.path()).load("ACE", 100), 0);

    let summary = scraper.scrape("ACE").await.unwrap();
    assert_eq!(summary.starting_checkpoint, 0);
    assert_eq!(summary.records_written, 100);
    assert_eq!(jsonl_records(dir.path()).len(), 100);
}

#[tokio::test]
async fn test_empty_collection() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_total(&server, 0).await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let summary = scraper.scrape("ACE").await.unwrap();

    assert_eq!(summary.total_pages, 0);
    assert_eq!(summary.checkpoint, 0);
    assert_eq!(summary.phase, RunPhase::Completed);
}

#[tokio::test]
async fn test_count_forbidden_is_an_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), 100);
    let scraper = CollectionScraper::from_config(&config, None).unwrap();
    let err = scraper.scrape("ACE").await.unwrap_err();

    assert!(err.to_string().contains("ACE"));
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_rate_limit_waits_for_retry_after() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    page_mock(0)
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_ok_page(&server, 0, 100, 100, 1).await;

    let config = create_test_config(&server, dir.path(), 100);
    let fetcher = PageFetcher::from_config(&config, None).unwrap();

    let started = Instant::now();
    let outcome = fetcher.fetch_page("ACE", 1).await;

    assert!(matches!(outcome, FetchOutcome::Success(_)));
    assert!(started.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn test_page_request_parameters() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("jql", "project=ACE"))
        .and(query_param("startAt", "100"))
        .and(query_param("maxResults", "100"))
        .and(query_param("expand", "comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(100, 2, 102)))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), 100);
    let fetcher = PageFetcher::from_config(&config, None).unwrap();

    match fetcher.fetch_page("ACE", 2).await {
        FetchOutcome::Success(issues) => {
            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0]["key"], "ACE-101");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_fatal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    page_mock(0)
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), 100);
    let fetcher = PageFetcher::from_config(&config, None).unwrap();

    assert!(matches!(
        fetcher.fetch_page("ACE", 1).await,
        FetchOutcome::FatalFailure(_)
    ));
}

#[tokio::test]
async fn test_credentials_are_sent_as_basic_auth() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(header("authorization", "Basic YWxpY2U6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path(), 100);
    let credentials = Credentials {
        username: "alice".to_string(),
        token: "secret".to_string(),
    };
    let fetcher = PageFetcher::from_config(&config, Some(credentials)).unwrap();

    assert_eq!(fetcher.fetch_total("ACE").await, Ok(7));
}
