//! File-backed record sink
//!
//! Per collection it maintains:
//! - `<key>_issues.jsonl`: append-only, one record per line, synced per page
//! - `<key>_issues.json`: pretty-printed array rebuilt from the JSONL stream
//!   when a run finishes
//!
//! Issue keys already present in the stream are skipped, so pages fetched
//! again after a resume do not produce duplicate records.

use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::transform::IssueRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Indentation of the aggregate JSON file
const AGGREGATE_INDENT: &[u8] = b"    ";

/// Open append stream for one collection
struct CollectionStream {
    file: File,
    seen: HashSet<String>,
}

/// Writes JSONL and aggregate JSON files under one directory
pub struct FileSink {
    dir: PathBuf,
    streams: Mutex<HashMap<String, CollectionStream>>,
}

impl FileSink {
    /// Creates a sink writing under `dir`, created lazily
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the line-delimited stream for a collection
    pub fn jsonl_path(&self, collection: &str) -> PathBuf {
        self.dir
            .join(format!("{}_issues.jsonl", collection.to_lowercase()))
    }

    /// Path of the aggregate JSON array for a collection
    pub fn json_path(&self, collection: &str) -> PathBuf {
        self.dir
            .join(format!("{}_issues.json", collection.to_lowercase()))
    }

    fn lock_streams(&self) -> MutexGuard<'_, HashMap<String, CollectionStream>> {
        // A panicking writer leaves no partial state in the map itself
        self.streams
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_stream(&self, collection: &str) -> OutputResult<CollectionStream> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.jsonl_path(collection);

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let seen: HashSet<String> = read_records(&content, &path)
            .into_iter()
            .map(|r| r.issue_key)
            .filter(|key| !key.is_empty())
            .collect();

        // Terminate a line torn by a crash so the next record starts cleanly
        if !content.is_empty() && !content.ends_with('\n') {
            tracing::warn!(path = %path.display(), "Terminating torn trailing line");
            file.seek(SeekFrom::End(0))?;
            file.write_all(b"\n")?;
        }

        tracing::debug!(
            collection,
            existing = seen.len(),
            path = %path.display(),
            "Opened output stream"
        );

        Ok(CollectionStream { file, seen })
    }
}

impl RecordSink for FileSink {
    fn append(&self, collection: &str, records: &[IssueRecord]) -> OutputResult<usize> {
        let mut streams = self.lock_streams();

        if !streams.contains_key(collection) {
            let stream = self.open_stream(collection)?;
            streams.insert(collection.to_string(), stream);
        }
        let Some(stream) = streams.get_mut(collection) else {
            return Ok(0);
        };

        let mut buffer = String::new();
        let mut written = 0;
        let mut skipped = 0;
        for record in records {
            if !record.issue_key.is_empty() && !stream.seen.insert(record.issue_key.clone()) {
                skipped += 1;
                continue;
            }
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
            written += 1;
        }

        if skipped > 0 {
            tracing::debug!(collection, skipped, "Skipped records already in output");
        }

        if !buffer.is_empty() {
            stream.file.write_all(buffer.as_bytes())?;
            stream.file.flush()?;
            stream.file.sync_data()?;
        }

        Ok(written)
    }

    fn finish(&self, collection: &str) -> OutputResult<usize> {
        self.lock_streams().remove(collection);

        let jsonl_path = self.jsonl_path(collection);
        let records = match std::fs::read_to_string(&jsonl_path) {
            Ok(content) => read_records(&content, &jsonl_path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let json_path = self.json_path(collection);
        write_aggregate(&records, &self.dir, &json_path)?;

        tracing::info!(
            collection,
            records = records.len(),
            path = %json_path.display(),
            "Wrote aggregate output"
        );
        Ok(records.len())
    }

    fn reset(&self, collection: &str) -> OutputResult<()> {
        self.lock_streams().remove(collection);

        for path in [self.jsonl_path(collection), self.json_path(collection)] {
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::info!(path = %path.display(), "Removed output file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Parses JSONL content, skipping blank and malformed lines
fn read_records(content: &str, path: &Path) -> Vec<IssueRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(number, line)| match serde_json::from_str(line) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = number + 1,
                    error = %e,
                    "Skipping malformed output line"
                );
                None
            }
        })
        .collect()
}

/// Atomically replaces `path` with a pretty-printed JSON array
fn write_aggregate(records: &[IssueRecord], dir: &Path, path: &Path) -> OutputResult<()> {
    std::fs::create_dir_all(dir)?;

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(AGGREGATE_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;
    buffer.push(b'\n');

    let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
    temp_file.write_all(&buffer)?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| OutputError::Persist {
        path: path.display().to_string(),
        message: e.error.to_string(),
    })?;

    Ok(())
}
