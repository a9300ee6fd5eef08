//! Configuration module for Jira-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, plus reading optional credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use jira_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Page size: {}", config.scraper.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ApiConfig, Config, Credentials, OutputConfig, ScraperConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, credentials_from_env, credentials_from_vars, load_config,
    load_config_with_hash, parse_config, TOKEN_ENV, USERNAME_ENV,
};
pub use validation::validate_projects;
