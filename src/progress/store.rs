//! Persistent state store for experiment records
//!
//! Serializes the full set of records to a single JSON document. Saves are
//! atomic from an external reader's point of view: the document is written to
//! a temporary path and renamed over the target.

use std::path::PathBuf;

use tokio::fs;
use tracing::debug;

use super::experiment::Experiment;
use super::messages::ProgressError;

/// Name of the state document inside the progress directory
pub const PROGRESS_FILENAME: &str = "progress.json";

/// Loads and saves the experiment registry in one directory
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(PROGRESS_FILENAME)
    }

    /// Load all records. A missing file is zero experiments, not an error;
    /// a file that exists but cannot be parsed is `CorruptState`.
    pub async fn load(&self) -> Result<Vec<Experiment>, ProgressError> {
        let path = self.file_path();
        if !path.exists() {
            debug!(path = %path.display(), "No progress file yet, starting empty");
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ProgressError::Persist(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content).map_err(|e| ProgressError::CorruptState(e.to_string()))
    }

    /// Save all records, replacing the document atomically
    pub async fn save(&self, experiments: &[Experiment]) -> Result<(), ProgressError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ProgressError::Persist(format!("{}: {}", self.dir.display(), e)))?;

        let json = serde_json::to_string_pretty(experiments).map_err(|e| ProgressError::Persist(e.to_string()))?;

        let path = self.file_path();
        let tmp_path = self.dir.join(format!("{}.tmp", PROGRESS_FILENAME));

        fs::write(&tmp_path, json)
            .await
            .map_err(|e| ProgressError::Persist(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ProgressError::Persist(format!("{}: {}", path.display(), e)))?;

        debug!(count = experiments.len(), path = %path.display(), "Progress state saved");
        Ok(())
    }
}
