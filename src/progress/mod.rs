//! Progress tracking and run coordination
//!
//! The authoritative registry of every experiment ever seen, its durable
//! persistence, and the per-experiment reporting handles.

mod experiment;
mod messages;
mod monitor;
mod reporter;
mod store;

pub use experiment::{Experiment, SUCCESS_MSG, Status, WAITING_MSG};
pub use messages::{ProgressCommand, ProgressError, ProgressResponse};
pub use monitor::Monitor;
pub use reporter::ExperimentReporter;
pub use store::{PROGRESS_FILENAME, ProgressStore};
