//! Report regeneration plumbing
//!
//! Channel-based fan-out between the progress monitor and the report
//! renderer, keeping slow rendering I/O out of the locked update path.

mod cmd;
mod dispatcher;
mod snapshot;

pub use cmd::RenderCmd;
pub use dispatcher::{RENDER_QUEUE_SIZE, RenderDispatcher, ReportRenderer, render_channel};
pub use snapshot::SnapshotRenderer;
