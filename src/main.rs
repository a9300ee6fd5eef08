//! Jira-Harvest main entry point
//!
//! This is the command-line interface for the Jira-Harvest issue scraper.

use anyhow::{bail, Context};
use clap::Parser;
use jira_harvest::config::{
    credentials_from_env, load_config_with_hash, validate_projects, Config,
};
use jira_harvest::output::print_summary;
use jira_harvest::scraper::page::total_pages;
use jira_harvest::{CheckpointStore, CollectionScraper, FileCheckpointStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Jira-Harvest: a resumable issue-tracker scraper
///
/// Jira-Harvest pages through every issue of the configured projects,
/// fetching pages concurrently with retries, and writes JSON and JSONL
/// records. Interrupted runs resume from the last contiguous checkpoint.
#[derive(Parser, Debug)]
#[command(name = "jira-harvest")]
#[command(version)]
#[command(about = "A resumable issue-tracker scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard checkpoints and output for the selected projects first
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with = "fresh")]
    dry_run: bool,

    /// Scrape these projects instead of the configured list
    #[arg(short, long = "project", value_name = "KEY")]
    projects: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let projects = select_projects(&config, &cli.projects)?;

    if cli.dry_run {
        handle_dry_run(&config, &projects);
        return Ok(());
    }

    handle_scrape(&config, &projects, cli.fresh).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("jira_harvest=info,warn"),
            1 => EnvFilter::new("jira_harvest=debug,info"),
            2 => EnvFilter::new("jira_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Picks the projects for this run: CLI overrides win over the config list
fn select_projects(config: &Config, overrides: &[String]) -> anyhow::Result<Vec<String>> {
    let projects = if overrides.is_empty() {
        config.projects.clone()
    } else {
        validate_projects(overrides)?;
        overrides.to_vec()
    };

    if projects.is_empty() {
        bail!("no projects to scrape: set `projects` in the config or pass --project");
    }
    Ok(projects)
}

/// Handles the --dry-run mode: shows configuration and resume points
fn handle_dry_run(config: &Config, projects: &[String]) {
    println!("=== Jira-Harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Max workers: {}", config.scraper.max_workers);
    println!("  Max retries: {}", config.scraper.max_retries);
    println!("  Retry backoff: {}ms", config.scraper.retry_backoff_ms);
    println!("  Max backoff: {}ms", config.scraper.max_backoff_ms);
    println!("  Page size: {}", config.scraper.page_size);

    println!("\nAPI:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  JQL: {}", config.api.jql);
    println!(
        "  Authenticated: {}",
        if credentials_from_env().is_some() {
            "yes"
        } else {
            "no"
        }
    );

    println!("\nOutput:");
    println!("  Output dir: {}", config.output.output_dir);
    println!("  Checkpoint dir: {}", config.output.checkpoint_dir);

    let checkpoints = FileCheckpointStore::new(&config.output.checkpoint_dir);
    println!("\nProjects ({}):", projects.len());
    for project in projects {
        let last_page = checkpoints.load(project, config.scraper.page_size);
        let offset = last_page.saturating_mul(config.scraper.page_size);
        println!(
            "  - {} (resume at page {}, issue offset {})",
            project,
            last_page.saturating_add(1),
            offset
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ A 1000-issue project would take {} pages",
        total_pages(1000, config.scraper.page_size)
    );
}

/// Handles the main scrape operation
async fn handle_scrape(config: &Config, projects: &[String], fresh: bool) -> anyhow::Result<()> {
    let credentials = credentials_from_env();
    if credentials.is_some() {
        tracing::info!("Using credentials from environment");
    } else {
        tracing::info!("No credentials in environment, sending unauthenticated requests");
    }

    let scraper = CollectionScraper::from_config(config, credentials)?;

    let mut unfinished = Vec::new();
    for project in projects {
        if fresh {
            tracing::info!("Starting fresh scrape of {} (ignoring previous state)", project);
            scraper.reset(project)?;
        }

        match scraper.scrape(project).await {
            Ok(summary) => {
                print_summary(&summary);
                if !summary.is_complete() {
                    unfinished.push(project.clone());
                }
            }
            Err(e) => {
                tracing::error!("Scrape of {} failed: {}", project, e);
                unfinished.push(project.clone());
            }
        }
    }

    if !unfinished.is_empty() {
        bail!(
            "{} project(s) did not finish: {}",
            unfinished.len(),
            unfinished.join(", ")
        );
    }

    tracing::info!("All projects scraped successfully");
    Ok(())
}
