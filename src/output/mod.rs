//! Output module for scraped records and run reports
//!
//! This module handles:
//! - Appending transformed records to per-collection JSONL streams
//! - Rebuilding the aggregate JSON file for a collection
//! - Formatting run summaries for the command line

mod file_sink;
mod report;
mod traits;

pub use file_sink::FileSink;
pub use report::{format_summary, print_summary};
pub use traits::{OutputError, OutputResult, PageFailure, RecordSink, ScrapeSummary};
