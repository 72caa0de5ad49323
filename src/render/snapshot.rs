//! Snapshot renderer
//!
//! Writes the current experiment registry as a JSON document under the
//! reports directory, the data a static report site is generated from.
//! Template markup is someone else's job; this sink only materializes the
//! report data on each notification.
//!
//! The renderer reads the persisted state document rather than querying the
//! monitor. Updates persist before they notify, so the document is always at
//! least as fresh as the notification being handled, and commands drained
//! during shutdown still render after the monitor has stopped.

use std::path::PathBuf;

use async_trait::async_trait;
use eyre::{Context, Result};
use tokio::fs;
use tracing::debug;

use crate::progress::ProgressStore;

use super::cmd::RenderCmd;
use super::dispatcher::ReportRenderer;

/// Renders report data by snapshotting the persisted registry into
/// `reports_dir`
pub struct SnapshotRenderer {
    store: ProgressStore,
    reports_dir: PathBuf,
}

impl SnapshotRenderer {
    pub fn new(progress_dir: impl Into<PathBuf>, reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: ProgressStore::new(progress_dir),
            reports_dir: reports_dir.into(),
        }
    }

    async fn write_snapshot(&self, filename: &str) -> Result<()> {
        let experiments = self.store.load().await?;
        let json = serde_json::to_string_pretty(&experiments)?;

        fs::create_dir_all(&self.reports_dir)
            .await
            .context("Failed to create reports directory")?;
        let path = self.reports_dir.join(filename);
        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!(path = %path.display(), count = experiments.len(), "Report snapshot written");
        Ok(())
    }
}

#[async_trait]
impl ReportRenderer for SnapshotRenderer {
    async fn render(&self, cmd: RenderCmd) -> Result<()> {
        match cmd {
            RenderCmd::Progress => self.write_snapshot("activity.json").await,
            RenderCmd::Reports => self.write_snapshot("reports.json").await,
            RenderCmd::All => {
                self.write_snapshot("activity.json").await?;
                self.write_snapshot("reports.json").await
            }
            // Nothing buffered by this renderer
            RenderCmd::Flush => Ok(()),
        }
    }
}
