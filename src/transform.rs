//! Issue transformation
//!
//! Maps one raw issue object from the search API into a flat
//! [`IssueRecord`] with a combined text field and derived prompt tasks.
//! The mapping is pure and tolerant: missing or null fields become empty
//! values rather than errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of description characters quoted in the Q&A task
const QNA_DESCRIPTION_CHARS: usize = 400;

/// Assignee name used when an issue has none
const UNASSIGNED: &str = "Unassigned";

/// One normalized issue, as written to the output streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub issue_key: String,
    pub project: String,
    pub title: String,
    pub status: String,
    pub reporter: String,
    pub assignee: String,
    pub priority: String,
    pub labels: Vec<String>,
    pub created: String,
    pub updated: String,
    pub description: String,
    pub comments: Vec<String>,
    pub text: String,
    pub derived_tasks: DerivedTasks,
}

/// Prompt-style tasks derived from an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedTasks {
    pub summarization: String,
    pub classification: String,
    pub qna: String,
}

/// Converts a raw issue into an [`IssueRecord`]
pub fn transform_issue(issue: &Value) -> IssueRecord {
    let fields = &issue["fields"];

    let key = str_at(issue, &["key"]);
    let summary = str_at(fields, &["summary"]);
    let description = str_at(fields, &["description"]);

    let assignee = fields["assignee"]["displayName"]
        .as_str()
        .unwrap_or(UNASSIGNED)
        .to_string();

    let labels = fields["labels"]
        .as_array()
        .map(|labels| {
            labels
                .iter()
                .filter_map(|l| l.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let comments: Vec<String> = fields["comment"]["comments"]
        .as_array()
        .map(|comments| {
            comments
                .iter()
                .filter_map(|c| c["body"].as_str())
                .filter(|body| !body.is_empty())
                .map(|body| body.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let full_text = format!(
        "{}\n\nDescription:\n{}\n\nComments:\n{}",
        summary,
        description,
        comments.join("\n")
    );

    let qna_excerpt: String = description.chars().take(QNA_DESCRIPTION_CHARS).collect();

    let derived_tasks = DerivedTasks {
        summarization: format!("Summarize this issue: {}", full_text),
        classification: format!(
            "Classify the issue '{}' into categories like 'Bug', 'Improvement', 'Task', or 'Feature'.",
            summary
        ),
        qna: format!(
            "Q: What is the main problem described in issue {}?\nA: {}",
            key, qna_excerpt
        ),
    };

    IssueRecord {
        issue_key: key,
        project: str_at(fields, &["project", "key"]),
        title: summary,
        status: str_at(fields, &["status", "name"]),
        reporter: str_at(fields, &["reporter", "displayName"]),
        assignee,
        priority: str_at(fields, &["priority", "name"]),
        labels,
        created: str_at(fields, &["created"]),
        updated: str_at(fields, &["updated"]),
        description: description.trim().to_string(),
        comments,
        text: full_text.trim().to_string(),
        derived_tasks,
    }
}

/// Follows `path` through nested objects, returning "" for anything missing
fn str_at(value: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
