//! Per-experiment progress reporter
//!
//! A thin capability handle bound to one filename, handed to the processing
//! engine so it can push updates without re-threading identity through every
//! callback. Holds only the filename and a Monitor handle, never a private
//! copy of the record.

use super::messages::{ProgressError, ProgressResponse};
use super::monitor::Monitor;

/// Short-lived handle for reporting progress on one in-flight experiment
#[derive(Debug)]
pub struct ExperimentReporter {
    monitor: Monitor,
    filename: String,
}

impl ExperimentReporter {
    /// Bind a reporter to `filename`
    ///
    /// Fails with `NotFound` when the monitor has no record for the file;
    /// register it with [`Monitor::add_experiment`] first.
    pub async fn new(monitor: Monitor, filename: impl Into<String>) -> ProgressResponse<Self> {
        let filename = filename.into();
        if !monitor.contains(&filename).await? {
            return Err(ProgressError::NotFound(filename));
        }
        Ok(Self { monitor, filename })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub async fn report_progress(&self, msg: &str, percent: f64) -> ProgressResponse<()> {
        self.monitor.report_progress(&self.filename, msg, percent).await
    }

    pub async fn report_error(&self, err: impl std::fmt::Display) -> ProgressResponse<()> {
        self.monitor.report_error(&self.filename, err).await
    }

    pub async fn report_success(&self) -> ProgressResponse<()> {
        self.monitor.report_success(&self.filename).await
    }

    pub async fn update_details(&self, title: &str, tags: &[String]) -> ProgressResponse<()> {
        self.monitor.update_details(&self.filename, title, tags).await
    }
}
