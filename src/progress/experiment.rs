//! Experiment records and their lifecycle status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message set when an experiment is first registered or re-queued
pub const WAITING_MSG: &str = "Waiting to be processed";

/// Message set when an experiment finishes successfully
pub const SUCCESS_MSG: &str = "Finished processing successfully";

/// Lifecycle state of a tracked experiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Registered, not yet picked up by the processing engine
    #[default]
    Waiting,
    /// Currently being processed
    Processing,
    /// Finished successfully (terminal)
    Success,
    /// Finished with an error (terminal)
    Failure,
}

impl Status {
    /// Whether this status is terminal (no further automatic transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Waiting => write!(f, "waiting"),
            Status::Processing => write!(f, "processing"),
            Status::Success => write!(f, "success"),
            Status::Failure => write!(f, "failure"),
        }
    }
}

/// One record per distinct experiment file ever seen
///
/// `filename` is the unique key. `stamp` marks the last mutation and is
/// monotonically non-decreasing across successive updates for one filename.
/// `percent` is only meaningful while `status` is [`Status::Processing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub filename: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    pub stamp: DateTime<Utc>,
    pub status: Status,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub percent: f64,
}

impl Experiment {
    /// Create a fresh record in the `Waiting` state
    pub fn waiting(filename: impl Into<String>, title: impl Into<String>, tags: Vec<String>, category: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            title: title.into(),
            tags,
            category: category.into(),
            stamp: Utc::now(),
            status: Status::Waiting,
            msg: WAITING_MSG.to_string(),
            percent: 0.0,
        }
    }

    /// Advance the stamp, never moving it backwards
    pub fn touch(&mut self) {
        self.stamp = Utc::now().max(self.stamp);
    }
}
