//! Experiment directory watcher
//!
//! Polls the experiments directory and emits a file handle whenever a
//! regular file appears or its modification time moves forward. Deciding
//! whether a file actually needs (re)processing is the driver's job.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Handle to a discovered experiment definition file
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentFile {
    /// Name relative to the experiments directory, the experiment's identity
    pub filename: String,
    /// Last modification time, used for staleness comparison against a
    /// finished run's stamp
    pub modified: DateTime<Utc>,
}

/// Polling watcher over the experiments directory
pub struct DirWatcher {
    dir: PathBuf,
    poll_interval: Duration,
    files_tx: mpsc::Sender<ExperimentFile>,
    seen: HashMap<String, DateTime<Utc>>,
}

impl DirWatcher {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration, files_tx: mpsc::Sender<ExperimentFile>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
            files_tx,
            seen: HashMap::new(),
        }
    }

    /// Scan the directory once, queueing new or changed files
    ///
    /// Returns how many files were queued. Fails when the files channel is
    /// closed; a missing directory is the caller's problem and surfaces as an
    /// I/O error.
    pub async fn scan_once(&mut self) -> Result<usize> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut sent = 0;

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str().map(String::from) else {
                debug!(name = ?entry.file_name(), "Skipping non-UTF-8 filename");
                continue;
            };
            let modified: DateTime<Utc> = meta.modified()?.into();

            let changed = match self.seen.get(&filename) {
                Some(last) => modified > *last,
                None => true,
            };
            if !changed {
                continue;
            }

            debug!(%filename, %modified, "Queueing experiment file");
            let file = ExperimentFile {
                filename: filename.clone(),
                modified,
            };
            if self.files_tx.send(file).await.is_err() {
                return Err(eyre!("experiment files channel closed"));
            }
            self.seen.insert(filename, modified);
            sent += 1;
        }

        Ok(sent)
    }

    /// Run the watcher loop until a shutdown signal arrives or the files
    /// channel closes
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            dir = %self.dir.display(),
            interval_secs = self.poll_interval.as_secs_f64(),
            "Experiment watcher started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    match self.scan_once().await {
                        Ok(0) => {}
                        Ok(n) => debug!(count = n, "Queued experiment files"),
                        Err(e) => {
                            // Directory may not exist yet; a closed channel
                            // means the driver is gone
                            if self.files_tx.is_closed() {
                                break;
                            }
                            warn!(error = %e, "Error scanning experiments directory");
                        }
                    }
                }
            }
        }

        info!("Experiment watcher stopped");
    }
}
