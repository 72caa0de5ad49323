//! Render dispatcher
//!
//! Single consumer that decouples state persistence from report
//! regeneration. Receives render commands over a channel and invokes the
//! renderer once per command; rendering errors are logged, never propagated
//! back into the monitor's update path.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::cmd::RenderCmd;

/// Capacity of the render notification channel
pub const RENDER_QUEUE_SIZE: usize = 64;

/// External report regeneration collaborator
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, cmd: RenderCmd) -> eyre::Result<()>;
}

/// Create the render notification channel the Monitor and dispatcher share
pub fn render_channel() -> (mpsc::Sender<RenderCmd>, mpsc::Receiver<RenderCmd>) {
    mpsc::channel(RENDER_QUEUE_SIZE)
}

/// Consumes render commands until the channel closes
pub struct RenderDispatcher {
    rx: mpsc::Receiver<RenderCmd>,
    renderer: Arc<dyn ReportRenderer>,
}

impl RenderDispatcher {
    pub fn new(rx: mpsc::Receiver<RenderCmd>, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { rx, renderer }
    }

    /// Run until every sender is dropped, draining buffered commands before
    /// exiting
    pub async fn run(mut self) {
        info!("Render dispatcher started");

        while let Some(cmd) = self.rx.recv().await {
            debug!(%cmd, "Render command received");
            if let Err(e) = self.renderer.render(cmd).await {
                error!(%cmd, error = %e, "Report rendering failed");
            }
        }

        info!("Render dispatcher stopped");
    }
}
