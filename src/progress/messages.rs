//! Progress monitor messages
//!
//! Commands and responses for the actor pattern, plus the error taxonomy.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::oneshot;

use super::experiment::Experiment;

/// Errors from progress operations
#[derive(Debug, Error)]
pub enum ProgressError {
    /// The on-disk state document exists but cannot be parsed. Fatal to
    /// monitor construction; never silently recovered.
    #[error("corrupt progress state: {0}")]
    CorruptState(String),

    /// A disk write failed while persisting an update. The in-memory
    /// mutation has been rolled back.
    #[error("failed to persist progress state: {0}")]
    Persist(String),

    /// Reporter construction against a filename the monitor has never seen
    #[error("no experiment registered for: {0}")]
    NotFound(String),

    /// The monitor actor is gone
    #[error("progress monitor channel closed")]
    Channel,
}

/// Response from progress operations
pub type ProgressResponse<T> = Result<T, ProgressError>;

/// Commands sent to the Monitor actor
#[derive(Debug)]
pub enum ProgressCommand {
    GetExperiments {
        reply: oneshot::Sender<Vec<Experiment>>,
    },
    GetFinishStamp {
        filename: String,
        reply: oneshot::Sender<(bool, DateTime<Utc>)>,
    },
    Contains {
        filename: String,
        reply: oneshot::Sender<bool>,
    },
    AddExperiment {
        filename: String,
        title: String,
        tags: Vec<String>,
        category: String,
        /// Reset an existing Success record to Waiting instead of
        /// preserving it
        requeue: bool,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    ReportLoadError {
        filename: String,
        msg: String,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    ReportError {
        filename: String,
        msg: String,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    ReportSuccess {
        filename: String,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    ReportProgress {
        filename: String,
        msg: String,
        percent: f64,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    UpdateDetails {
        filename: String,
        title: String,
        tags: Vec<String>,
        reply: oneshot::Sender<ProgressResponse<()>>,
    },
    Shutdown,
}
