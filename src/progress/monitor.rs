//! Monitor - actor that owns the experiment registry
//!
//! The single source of truth for experiment state. A cloneable handle sends
//! commands over a channel to one actor task that owns the in-memory registry
//! and the on-disk document, so every read-modify-persist-notify sequence is
//! serialized and atomic end to end. Render notifications go out over a
//! separate channel; the actor never calls into the renderer itself.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::render::RenderCmd;

use super::experiment::{Experiment, SUCCESS_MSG, Status, WAITING_MSG};
use super::messages::{ProgressCommand, ProgressError, ProgressResponse};
use super::store::ProgressStore;

const COMMAND_QUEUE_SIZE: usize = 256;

/// Handle to send commands to the Monitor actor
#[derive(Clone, Debug)]
pub struct Monitor {
    tx: mpsc::Sender<ProgressCommand>,
}

impl Monitor {
    /// Load existing state from `dir` and spawn the Monitor actor
    ///
    /// Fails with `CorruptState` when the state document exists but cannot
    /// be parsed. Render notifications are sent to `render_tx`.
    pub async fn spawn(dir: impl AsRef<Path>, render_tx: mpsc::Sender<RenderCmd>) -> ProgressResponse<Self> {
        let store = ProgressStore::new(dir.as_ref());
        let experiments = store.load().await?;
        info!(
            count = experiments.len(),
            dir = %dir.as_ref().display(),
            "Progress monitor loaded state"
        );

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let registry = Registry {
            experiments,
            store,
            render_tx,
        };
        tokio::spawn(actor_loop(registry, rx));

        Ok(Self { tx })
    }

    /// Snapshot of all known experiments, most-recently-updated first
    ///
    /// Returns copies; callers can never mutate monitor-owned state through
    /// the returned records.
    pub async fn experiments(&self) -> ProgressResponse<Vec<Experiment>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::GetExperiments { reply: reply_tx })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)
    }

    /// Whether `filename` finished successfully, and the stamp to compare
    /// staleness against
    ///
    /// `(true, stamp)` for a Success record; `(false, stamp)` for an existing
    /// record in any other state; `(false, now)` for an unknown filename (the
    /// stamp is a sentinel in that case).
    pub async fn finish_stamp(&self, filename: &str) -> ProgressResponse<(bool, DateTime<Utc>)> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::GetFinishStamp {
                filename: filename.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)
    }

    /// Whether a record exists for `filename`
    pub async fn contains(&self, filename: &str) -> ProgressResponse<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::Contains {
                filename: filename.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)
    }

    /// Register an experiment, creating it as `Waiting` or re-queuing an
    /// existing record
    ///
    /// A record that already finished successfully keeps its status, stamp
    /// and message; only title/tags/category are refreshed. Callers gate on
    /// [`Monitor::finish_stamp`] to avoid re-registering finished runs.
    pub async fn add_experiment(
        &self,
        filename: &str,
        title: &str,
        tags: &[String],
        category: &str,
    ) -> ProgressResponse<()> {
        debug!(%filename, "add_experiment: called");
        self.register(filename, title, tags, category, false).await
    }

    /// Re-queue an experiment whose definition file changed after a
    /// successful run, resetting it to `Waiting` with a fresh stamp
    pub async fn requeue_experiment(
        &self,
        filename: &str,
        title: &str,
        tags: &[String],
        category: &str,
    ) -> ProgressResponse<()> {
        debug!(%filename, "requeue_experiment: called");
        self.register(filename, title, tags, category, true).await
    }

    async fn register(
        &self,
        filename: &str,
        title: &str,
        tags: &[String],
        category: &str,
        requeue: bool,
    ) -> ProgressResponse<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::AddExperiment {
                filename: filename.to_string(),
                title: title.to_string(),
                tags: tags.to_vec(),
                category: category.to_string(),
                requeue,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Record that an experiment file could not be loaded
    ///
    /// Unlike the other report operations this does not require a prior
    /// `add_experiment`; a Failure record is created on the spot if needed.
    pub async fn report_load_error(&self, filename: &str, err: impl std::fmt::Display) -> ProgressResponse<()> {
        debug!(%filename, "report_load_error: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::ReportLoadError {
                filename: filename.to_string(),
                msg: format!("Couldn't load experiment file: {}", err),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Mark an experiment as failed with a message derived from `err`
    pub async fn report_error(&self, filename: &str, err: impl std::fmt::Display) -> ProgressResponse<()> {
        debug!(%filename, "report_error: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::ReportError {
                filename: filename.to_string(),
                msg: err.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Mark an experiment as finished successfully
    pub async fn report_success(&self, filename: &str) -> ProgressResponse<()> {
        debug!(%filename, "report_success: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::ReportSuccess {
                filename: filename.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Record an intermediate progress tick for an in-flight experiment
    pub async fn report_progress(&self, filename: &str, msg: &str, percent: f64) -> ProgressResponse<()> {
        debug!(%filename, %msg, percent, "report_progress: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::ReportProgress {
                filename: filename.to_string(),
                msg: msg.to_string(),
                percent,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Update an experiment's title and tags without changing its lifecycle
    /// state
    pub async fn update_details(&self, filename: &str, title: &str, tags: &[String]) -> ProgressResponse<()> {
        debug!(%filename, %title, "update_details: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProgressCommand::UpdateDetails {
                filename: filename.to_string(),
                title: title.to_string(),
                tags: tags.to_vec(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| ProgressError::Channel)?;
        reply_rx.await.map_err(|_| ProgressError::Channel)?
    }

    /// Shut down the Monitor actor
    pub async fn shutdown(&self) -> ProgressResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(ProgressCommand::Shutdown)
            .await
            .map_err(|_| ProgressError::Channel)
    }
}

/// Actor-owned registry plus its collaborators
struct Registry {
    experiments: Vec<Experiment>,
    store: ProgressStore,
    render_tx: mpsc::Sender<RenderCmd>,
}

impl Registry {
    fn find_mut(&mut self, filename: &str) -> Option<&mut Experiment> {
        self.experiments.iter_mut().find(|e| e.filename == filename)
    }

    fn find(&self, filename: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.filename == filename)
    }

    /// Cloned records in reverse-chronological order, the canonical order
    /// for both queries and the on-disk document
    fn snapshot(&self) -> Vec<Experiment> {
        let mut experiments = self.experiments.clone();
        experiments.sort_by(|a, b| b.stamp.cmp(&a.stamp));
        experiments
    }

    fn finish_stamp(&self, filename: &str) -> (bool, DateTime<Utc>) {
        match self.find(filename) {
            Some(e) if e.status == Status::Success => (true, e.stamp),
            Some(e) => (false, e.stamp),
            None => (false, Utc::now()),
        }
    }

    /// Persist the registry, rolling the in-memory state back to `previous`
    /// if the write fails so memory never diverges durably from disk
    async fn commit(&mut self, previous: Vec<Experiment>) -> ProgressResponse<()> {
        let ordered = self.snapshot();
        if let Err(e) = self.store.save(&ordered).await {
            warn!(error = %e, "Persist failed, rolling back in-memory update");
            self.experiments = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Progress notifications are frequent and individually low-value; drop
    /// them rather than block when the dispatcher falls behind
    fn notify_progress(&self) {
        if let Err(e) = self.render_tx.try_send(RenderCmd::Progress) {
            debug!(error = %e, "Dropped progress render notification");
        }
    }

    /// Reports notifications are rare and must not be lost. The send runs in
    /// its own task: it waits for channel capacity as long as it takes, but a
    /// full channel never stalls the actor itself.
    fn notify_reports(&self) {
        let render_tx = self.render_tx.clone();
        tokio::spawn(async move {
            if render_tx.send(RenderCmd::Reports).await.is_err() {
                warn!("Render channel closed, reports notification lost");
            }
        });
    }

    async fn add_experiment(
        &mut self,
        filename: String,
        title: String,
        tags: Vec<String>,
        category: String,
        requeue: bool,
    ) -> ProgressResponse<()> {
        let previous = self.experiments.clone();
        match self.find_mut(&filename) {
            Some(e) if e.status == Status::Success && !requeue => {
                // Re-registering a finished run never clobbers its success
                e.title = title;
                e.tags = tags;
                e.category = category;
            }
            Some(e) => {
                e.title = title;
                e.tags = tags;
                e.category = category;
                e.status = Status::Waiting;
                e.msg = WAITING_MSG.to_string();
                e.percent = 0.0;
                e.touch();
            }
            None => {
                self.experiments.push(Experiment::waiting(filename, title, tags, category));
            }
        }
        self.commit(previous).await?;
        self.notify_progress();
        Ok(())
    }

    async fn record_failure(&mut self, filename: String, msg: String) -> ProgressResponse<()> {
        let previous = self.experiments.clone();
        match self.find_mut(&filename) {
            Some(e) => {
                e.status = Status::Failure;
                e.msg = msg;
                e.percent = 0.0;
                e.touch();
            }
            None => {
                let mut e = Experiment::waiting(filename, "", Vec::new(), "");
                e.status = Status::Failure;
                e.msg = msg;
                self.experiments.push(e);
            }
        }
        self.commit(previous).await?;
        self.notify_progress();
        Ok(())
    }

    async fn report_success(&mut self, filename: String) -> ProgressResponse<()> {
        let previous = self.experiments.clone();
        let Some(e) = self.find_mut(&filename) else {
            return Err(ProgressError::NotFound(filename));
        };
        e.status = Status::Success;
        e.msg = SUCCESS_MSG.to_string();
        e.percent = 0.0;
        e.touch();

        self.commit(previous).await?;
        self.notify_progress();
        self.notify_reports();
        Ok(())
    }

    async fn report_progress(&mut self, filename: String, msg: String, percent: f64) -> ProgressResponse<()> {
        let previous = self.experiments.clone();
        let Some(e) = self.find_mut(&filename) else {
            return Err(ProgressError::NotFound(filename));
        };
        e.status = Status::Processing;
        e.msg = msg;
        e.percent = percent;
        e.touch();

        self.commit(previous).await?;
        self.notify_progress();
        Ok(())
    }

    async fn update_details(&mut self, filename: String, title: String, tags: Vec<String>) -> ProgressResponse<()> {
        let previous = self.experiments.clone();
        let Some(e) = self.find_mut(&filename) else {
            return Err(ProgressError::NotFound(filename));
        };
        e.title = title;
        e.tags = tags;
        // A terminal record keeps its stamp; details are metadata, not a
        // lifecycle transition
        if !e.status.is_terminal() {
            e.touch();
        }

        self.commit(previous).await?;
        self.notify_progress();
        Ok(())
    }
}

/// The actor loop that owns the registry and processes commands
async fn actor_loop(mut registry: Registry, mut rx: mpsc::Receiver<ProgressCommand>) {
    debug!("Progress monitor actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            ProgressCommand::GetExperiments { reply } => {
                let _ = reply.send(registry.snapshot());
            }

            ProgressCommand::GetFinishStamp { filename, reply } => {
                let _ = reply.send(registry.finish_stamp(&filename));
            }

            ProgressCommand::Contains { filename, reply } => {
                let _ = reply.send(registry.find(&filename).is_some());
            }

            ProgressCommand::AddExperiment {
                filename,
                title,
                tags,
                category,
                requeue,
                reply,
            } => {
                let result = registry.add_experiment(filename, title, tags, category, requeue).await;
                let _ = reply.send(result);
            }

            ProgressCommand::ReportLoadError { filename, msg, reply } => {
                let result = registry.record_failure(filename, msg).await;
                let _ = reply.send(result);
            }

            ProgressCommand::ReportError { filename, msg, reply } => {
                let result = registry.record_failure(filename, msg).await;
                let _ = reply.send(result);
            }

            ProgressCommand::ReportSuccess { filename, reply } => {
                let result = registry.report_success(filename).await;
                let _ = reply.send(result);
            }

            ProgressCommand::ReportProgress {
                filename,
                msg,
                percent,
                reply,
            } => {
                let result = registry.report_progress(filename, msg, percent).await;
                let _ = reply.send(result);
            }

            ProgressCommand::UpdateDetails {
                filename,
                title,
                tags,
                reply,
            } => {
                let result = registry.update_details(filename, title, tags).await;
                let _ = reply.send(result);
            }

            ProgressCommand::Shutdown => {
                info!("Progress monitor shutting down");
                break;
            }
        }
    }

    debug!("Progress monitor actor stopped");
}
