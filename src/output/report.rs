//! Run report formatting
//!
//! Renders a [`ScrapeSummary`] as plain text for the command line.

use crate::output::traits::ScrapeSummary;

/// Formats a run summary
///
/// # Arguments
///
/// * `summary` - The summary returned by a collection run
///
/// # Returns
///
/// A multi-line report ending in a newline
pub fn format_summary(summary: &ScrapeSummary) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", summary.collection));
    out.push_str(&format!("  Status:            {}\n", summary.phase));
    out.push_str(&format!("  Issues reported:   {}\n", summary.total_records));
    out.push_str(&format!("  Total pages:       {}\n", summary.total_pages));
    out.push_str(&format!(
        "  Checkpoint:        {} -> {}\n",
        summary.starting_checkpoint, summary.checkpoint
    ));
    out.push_str(&format!("  Pages completed:   {}\n", summary.pages_completed));
    out.push_str(&format!("  Pages failed:      {}\n", summary.pages_failed()));
    out.push_str(&format!("  Records written:   {}\n", summary.records_written));
    out.push_str(&format!(
        "  Duration:          {:.1}s\n",
        summary.duration.as_secs_f64()
    ));

    if !summary.failed_pages.is_empty() {
        out.push_str("  Failed pages:\n");
        for failure in &summary.failed_pages {
            let hint = if failure.retryable {
                "retry later"
            } else {
                "needs attention"
            };
            out.push_str(&format!(
                "    - page {}: {} ({})\n",
                failure.page, failure.reason, hint
            ));
        }
        out.push_str("  Re-run the same project to retry only the outstanding pages.\n");
    }

    out
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &ScrapeSummary) {
    print!("{}", format_summary(summary));
}
