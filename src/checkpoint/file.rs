//! File-backed checkpoint store
//!
//! One JSON file per collection, `<dir>/<collection>_checkpoint.json`,
//! holding `{"last_page": N, "page_size": S, "updated_at": "..."}`. Writes
//! go through a temp file in the same directory that is synced and renamed
//! over the target.
//!
//! When the configured page size changes between runs, the stored page is
//! converted to the number of whole pages at the new size that it covers,
//! rounding down so no issue is skipped.

use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Maximum checkpoint file size accepted on load
const MAX_CHECKPOINT_FILE_SIZE: u64 = 64 * 1024;

/// On-disk checkpoint document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CheckpointFile {
    last_page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Checkpoint store writing one JSON file per collection
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store rooted at `dir`
    ///
    /// The directory is created lazily on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the directory holding checkpoint files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the checkpoint file path for a collection
    pub fn path_for(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}_checkpoint.json", collection))
    }

    fn read(&self, path: &Path) -> Result<CheckpointFile, String> {
        let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(format!(
                "file is {} bytes, limit is {}",
                metadata.len(),
                MAX_CHECKPOINT_FILE_SIZE
            ));
        }

        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }
}

/// Whole pages of `page_size` covered by `last_page` pages of `stored_size`
///
/// Documents without a stored size are taken as written at `page_size`.
fn rescale(last_page: u64, stored_size: Option<u64>, page_size: u64) -> u64 {
    match stored_size {
        Some(stored) if stored != page_size && page_size > 0 => {
            let covered = u128::from(last_page) * u128::from(stored) / u128::from(page_size);
            u64::try_from(covered).unwrap_or(u64::MAX)
        }
        _ => last_page,
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, collection: &str, page_size: u64) -> u64 {
        let path = self.path_for(collection);
        if !path.exists() {
            tracing::debug!(collection, "No checkpoint found, starting from page 1");
            return 0;
        }

        match self.read(&path) {
            Ok(document) => {
                let last_page = rescale(document.last_page, document.page_size, page_size);
                if last_page != document.last_page {
                    tracing::warn!(
                        collection,
                        stored_page = document.last_page,
                        stored_page_size = ?document.page_size,
                        page_size,
                        last_page,
                        "Page size changed since the checkpoint was written, converted it"
                    );
                } else {
                    tracing::debug!(collection, last_page, "Loaded checkpoint");
                }
                last_page
            }
            Err(reason) => {
                tracing::warn!(
                    collection,
                    path = %path.display(),
                    %reason,
                    "Checkpoint is unreadable or corrupt, starting from page 1"
                );
                0
            }
        }
    }

    fn save(&self, collection: &str, last_page: u64, page_size: u64) -> CheckpointResult<()> {
        let io_err = |source: std::io::Error| CheckpointError::Io {
            collection: collection.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        let document = CheckpointFile {
            last_page,
            page_size: Some(page_size),
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&document)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(json.as_bytes()).map_err(io_err)?;
        temp_file.flush().map_err(io_err)?;
        temp_file.as_file().sync_all().map_err(io_err)?;

        let path = self.path_for(collection);
        temp_file.persist(&path).map_err(|e| io_err(e.error))?;

        // Make the rename itself durable
        if let Ok(dir) = std::fs::File::open(&self.dir) {
            let _ = dir.sync_all();
        }

        tracing::debug!(collection, last_page, "Saved checkpoint");
        Ok(())
    }

    fn clear(&self, collection: &str) -> CheckpointResult<()> {
        let path = self.path_for(collection);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(collection, "Cleared checkpoint");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io {
                collection: collection.to_string(),
                source,
            }),
        }
    }
}
