use crate::config::types::{ApiConfig, Config, OutputConfig, ScraperConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_api_config(&config.api)?;
    validate_output_config(&config.output)?;
    validate_projects(&config.projects)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.page_size < 1 || config.page_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 1000, got {}",
            config.page_size
        )));
    }

    if config.max_backoff_ms < config.retry_backoff_ms {
        return Err(ConfigError::Validation(format!(
            "max_backoff_ms ({}) must be >= retry_backoff_ms ({})",
            config.max_backoff_ms, config.retry_backoff_ms
        )));
    }

    if config.request_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_ms must be >= 100ms, got {}ms",
            config.request_timeout_ms
        )));
    }

    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.jql.contains("{collection}") {
        return Err(ConfigError::Validation(format!(
            "jql template must contain '{{collection}}', got '{}'",
            config.jql
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_dir.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the project list
///
/// Project keys become file names, so they may not contain path separators.
/// Output files are named by the lowercased key, so keys must also be
/// unique ignoring case.
pub fn validate_projects(projects: &[String]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for project in projects {
        validate_project_key(project)?;

        if !seen.insert(project.to_ascii_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Project '{}' is listed more than once",
                project
            )));
        }
    }

    Ok(())
}

/// Validates a single project key
pub fn validate_project_key(project: &str) -> Result<(), ConfigError> {
    if project.is_empty() {
        return Err(ConfigError::Validation(
            "Project key cannot be empty".to_string(),
        ));
    }

    if !project
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Project key must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            project
        )));
    }

    Ok(())
}
