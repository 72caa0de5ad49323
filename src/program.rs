//! Driver loop
//!
//! Consumes discovered experiment files, decides whether each needs
//! (re)processing, and routes the engine's callbacks through a per-experiment
//! reporter. Engine failures are data, not faults: they become Failure
//! records and the loop moves on. Only progress-monitor failures (disk
//! trouble) surface as errors.

use std::sync::Arc;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::engine::ExperimentEngine;
use crate::progress::{ExperimentReporter, Monitor};
use crate::watcher::ExperimentFile;

/// Drives experiment files through the processing engine
pub struct Program {
    config: Config,
    monitor: Monitor,
    engine: Arc<dyn ExperimentEngine>,
}

impl Program {
    pub fn new(config: Config, monitor: Monitor, engine: Arc<dyn ExperimentEngine>) -> Self {
        Self {
            config,
            monitor,
            engine,
        }
    }

    /// Try to process one experiment file
    ///
    /// Returns an error only when reporting to the progress monitor fails,
    /// not when the experiment itself cannot be loaded or processed.
    pub async fn process_file(&self, file: &ExperimentFile) -> Result<()> {
        let path = self.config.experiments_dir.join(&file.filename);

        let details = match self.engine.load(&path).await {
            Ok(details) => details,
            Err(e) => {
                error!(file = %file.filename, error = %e, "Can't load experiment");
                self.monitor.report_load_error(&file.filename, &e).await?;
                return Ok(());
            }
        };

        // A successfully finished run is only redone when the file changed
        // after the recorded stamp
        let (finished, stamp) = self.monitor.finish_stamp(&file.filename).await?;
        if finished && file.modified <= stamp {
            debug!(file = %file.filename, "Experiment already processed");
            return Ok(());
        }

        if finished {
            // The file changed after a successful run; its record starts the
            // lifecycle over instead of showing the stale success
            self.monitor
                .requeue_experiment(&file.filename, &details.title, &details.tags, &details.category)
                .await?;
        } else {
            self.monitor
                .add_experiment(&file.filename, &details.title, &details.tags, &details.category)
                .await?;
        }
        let reporter = ExperimentReporter::new(self.monitor.clone(), &file.filename).await?;

        info!(file = %file.filename, "Processing experiment");
        if let Err(e) = self.engine.process(&path, &reporter).await {
            error!(file = %file.filename, error = %e, "Error processing experiment");
            self.monitor.report_error(&file.filename, &e).await?;
            return Ok(());
        }

        info!(file = %file.filename, "Successfully processed experiment");
        self.monitor.report_success(&file.filename).await?;
        Ok(())
    }

    /// Run until a shutdown signal arrives or the files channel closes
    ///
    /// An in-flight experiment always runs to completion; only new work is
    /// refused once shutdown begins.
    pub async fn run(self, mut files_rx: mpsc::Receiver<ExperimentFile>, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Driver started, waiting for experiments to process");

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    break;
                }
                file = files_rx.recv() => {
                    let Some(file) = file else {
                        break;
                    };
                    if let Err(e) = self.process_file(&file).await {
                        // Structural failure in the monitor/store, not a bad
                        // experiment
                        error!(file = %file.filename, error = %e, "Progress monitor failure");
                    }
                }
            }
        }

        info!("Driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExperimentDetails;
    use crate::progress::Status;
    use crate::render::RenderCmd;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Engine double with scriptable load/process outcomes. Records the
    /// tracked status of each experiment at the moment processing starts.
    struct FakeEngine {
        fail_load: bool,
        fail_process: bool,
        processed: AtomicUsize,
        monitor: Mutex<Option<Monitor>>,
        statuses_at_start: Mutex<Vec<Status>>,
    }

    impl FakeEngine {
        fn ok() -> Self {
            Self {
                fail_load: false,
                fail_process: false,
                processed: AtomicUsize::new(0),
                monitor: Mutex::new(None),
                statuses_at_start: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExperimentEngine for FakeEngine {
        async fn load(&self, _path: &Path) -> Result<ExperimentDetails> {
            if self.fail_load {
                return Err(eyre::eyre!("open csv/bank.csv: no such file or directory"));
            }
            Ok(ExperimentDetails {
                title: "Test experiment".to_string(),
                tags: vec!["test".to_string()],
                category: "bank".to_string(),
            })
        }

        async fn process(&self, _path: &Path, reporter: &ExperimentReporter) -> Result<()> {
            let monitor = self.monitor.lock().unwrap().clone();
            if let Some(monitor) = monitor {
                let experiments = monitor.experiments().await?;
                if let Some(e) = experiments.iter().find(|e| e.filename == reporter.filename()) {
                    self.statuses_at_start.lock().unwrap().push(e.status);
                }
            }
            self.processed.fetch_add(1, Ordering::SeqCst);
            reporter.report_progress("Assessing rules", 0.5).await?;
            if self.fail_process {
                return Err(eyre::eyre!("rule assessment blew up"));
            }
            Ok(())
        }
    }

    async fn setup(engine: FakeEngine) -> (Program, Arc<FakeEngine>, Monitor, tempfile::TempDir) {
        let temp = tempdir().unwrap();
        let config = Config {
            experiments_dir: temp.path().join("experiments"),
            progress_dir: temp.path().join("progress"),
            reports_dir: temp.path().join("reports"),
            poll_interval_secs: 1,
        };
        let (render_tx, _render_rx) = mpsc::channel::<RenderCmd>(64);
        let monitor = Monitor::spawn(&config.progress_dir, render_tx).await.unwrap();
        let engine = Arc::new(engine);
        *engine.monitor.lock().unwrap() = Some(monitor.clone());
        let program = Program::new(config, monitor.clone(), engine.clone());
        (program, engine, monitor, temp)
    }

    fn file(filename: &str) -> ExperimentFile {
        ExperimentFile {
            filename: filename.to_string(),
            modified: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_process_file_success() {
        let (program, engine, monitor, _temp) = setup(FakeEngine::ok()).await;

        program.process_file(&file("bank-tiny.json")).await.unwrap();

        let experiments = monitor.experiments().await.unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].status, Status::Success);
        assert_eq!(experiments[0].title, "Test experiment");
        assert_eq!(engine.processed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_process_file_load_failure() {
        let (program, engine, monitor, _temp) = setup(FakeEngine {
            fail_load: true,
            ..FakeEngine::ok()
        })
        .await;

        program.process_file(&file("bank-bad.json")).await.unwrap();

        let experiments = monitor.experiments().await.unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].status, Status::Failure);
        assert!(experiments[0].msg.contains("Couldn't load experiment file"));
        assert_eq!(engine.processed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_process_file_engine_failure() {
        let (program, _engine, monitor, _temp) = setup(FakeEngine {
            fail_process: true,
            ..FakeEngine::ok()
        })
        .await;

        program.process_file(&file("bank-divorced.json")).await.unwrap();

        let experiments = monitor.experiments().await.unwrap();
        assert_eq!(experiments[0].status, Status::Failure);
        assert!(experiments[0].msg.contains("rule assessment blew up"));
    }

    #[tokio::test]
    async fn test_finished_file_not_reprocessed() {
        let (program, engine, _monitor, _temp) = setup(FakeEngine::ok()).await;

        let handle = file("bank-tiny.json");
        program.process_file(&handle).await.unwrap();
        assert_eq!(engine.processed.load(Ordering::SeqCst), 1);

        // Same mtime: already finished, skipped
        program.process_file(&handle).await.unwrap();
        assert_eq!(engine.processed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_file_reprocessed() {
        let (program, engine, _monitor, _temp) = setup(FakeEngine::ok()).await;

        let handle = file("bank-tiny.json");
        program.process_file(&handle).await.unwrap();

        // Content changed after the success stamp
        let newer = ExperimentFile {
            filename: handle.filename.clone(),
            modified: Utc::now() + Duration::seconds(30),
        };
        program.process_file(&newer).await.unwrap();
        assert_eq!(engine.processed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_changed_file_requeued_before_reprocessing() {
        let (program, engine, _monitor, _temp) = setup(FakeEngine::ok()).await;

        let handle = file("bank-tiny.json");
        program.process_file(&handle).await.unwrap();

        let newer = ExperimentFile {
            filename: handle.filename.clone(),
            modified: Utc::now() + Duration::seconds(30),
        };
        program.process_file(&newer).await.unwrap();

        // Both runs start from a freshly queued record; the second run must
        // not still show the stale success from the first
        let statuses = engine.statuses_at_start.lock().unwrap().clone();
        assert_eq!(statuses, vec![Status::Waiting, Status::Waiting]);
    }

    #[tokio::test]
    async fn test_failed_file_retried() {
        let (program, engine, monitor, _temp) = setup(FakeEngine {
            fail_process: true,
            ..FakeEngine::ok()
        })
        .await;

        let handle = file("bank-divorced.json");
        program.process_file(&handle).await.unwrap();
        program.process_file(&handle).await.unwrap();

        // A Failure record is not terminal for the driver's gate
        assert_eq!(engine.processed.load(Ordering::SeqCst), 2);
        let experiments = monitor.experiments().await.unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].status, Status::Failure);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (program, _engine, _monitor, _temp) = setup(FakeEngine::ok()).await;
        let (_files_tx, files_rx) = mpsc::channel(10);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(program.run(files_rx, shutdown_rx));
        shutdown_tx.send(()).await.unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_files_channel_closes() {
        let (program, engine, monitor, _temp) = setup(FakeEngine::ok()).await;
        let (files_tx, files_rx) = mpsc::channel(10);
        let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);

        files_tx.send(file("bank-tiny.json")).await.unwrap();
        drop(files_tx);

        tokio::time::timeout(std::time::Duration::from_secs(5), program.run(files_rx, shutdown_rx))
            .await
            .unwrap();

        assert_eq!(engine.processed.load(Ordering::SeqCst), 1);
        let experiments = monitor.experiments().await.unwrap();
        assert_eq!(experiments[0].status, Status::Success);
    }
}
