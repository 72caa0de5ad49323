//! labwatch - experiment watcher and progress tracker
//!
//! labwatch watches a directory for experiment definition files, drives each
//! through a pluggable processing engine, and tracks the lifecycle of every
//! run in a durable registry. State changes fan out over a channel to a
//! report regenerator so slow rendering I/O never sits inside the update
//! path.
//!
//! # Core Concepts
//!
//! - **One record per file, forever**: every experiment ever seen keeps a
//!   record; a successful run is only redone when the file itself changes
//! - **Single writer**: all state mutation routes through the [`progress`]
//!   monitor actor, which persists synchronously before acknowledging
//! - **Decoupled side effects**: report regeneration happens in its own
//!   consumer task fed by notifications, never inline with an update
//!
//! # Modules
//!
//! - [`progress`] - monitor, reporter, and persistent state store (the core)
//! - [`render`] - render commands, dispatcher, and the snapshot sink
//! - [`watcher`] - polling discovery of experiment definition files
//! - [`engine`] - processing engine contract
//! - [`program`] - driver loop tying discovery to processing
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod engine;
pub mod program;
pub mod progress;
pub mod render;
pub mod watcher;

// Re-export commonly used types
pub use config::Config;
pub use engine::{DefinitionEngine, ExperimentDetails, ExperimentEngine};
pub use program::Program;
pub use progress::{Experiment, ExperimentReporter, Monitor, ProgressError, ProgressResponse, Status};
pub use render::{RenderCmd, RenderDispatcher, ReportRenderer, SnapshotRenderer, render_channel};
pub use watcher::{DirWatcher, ExperimentFile};
