//! labwatch - experiment watcher and progress tracker
//!
//! CLI entry point wiring the monitor, watcher, driver, and render
//! dispatcher together.

use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use labwatch::cli::{Cli, Command, OutputFormat};
use labwatch::config::Config;
use labwatch::engine::{DefinitionEngine, ExperimentEngine};
use labwatch::program::Program;
use labwatch::progress::Monitor;
use labwatch::render::{RenderCmd, RenderDispatcher, SnapshotRenderer, render_channel};
use labwatch::watcher::DirWatcher;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Status { format }) => cmd_status(&config, format).await,
        Some(Command::Run) | None => cmd_run(&config).await,
    }
}

/// Print the tracked experiments and their current state
async fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let (render_tx, _render_rx) = render_channel();
    let monitor = Monitor::spawn(&config.progress_dir, render_tx).await?;
    let experiments = monitor.experiments().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&experiments)?);
        }
        OutputFormat::Text => {
            if experiments.is_empty() {
                println!("No experiments tracked yet.");
            }
            for e in &experiments {
                println!("{:<10} {:<30} {}", e.status.to_string(), e.filename, e.msg);
            }
        }
    }

    let _ = monitor.shutdown().await;
    Ok(())
}

/// Run the daemon in the foreground
async fn cmd_run(config: &Config) -> Result<()> {
    config.validate()?;
    info!(
        experiments = %config.experiments_dir.display(),
        progress = %config.progress_dir.display(),
        reports = %config.reports_dir.display(),
        "labwatch starting"
    );

    // Monitor plus the render channel it notifies on
    let (render_tx, render_rx) = render_channel();
    let monitor = Monitor::spawn(&config.progress_dir, render_tx.clone()).await?;

    // Render dispatcher consumes notifications, regenerating report data
    // from the persisted state document
    let renderer = Arc::new(SnapshotRenderer::new(&config.progress_dir, &config.reports_dir));
    let dispatcher_handle = tokio::spawn(RenderDispatcher::new(render_rx, renderer).run());

    // Full regeneration once at startup
    if render_tx.send(RenderCmd::All).await.is_err() {
        warn!("Render channel closed before startup regeneration");
    }

    // Watcher feeds discovered files to the driver
    let (files_tx, files_rx) = mpsc::channel(100);
    let watcher = DirWatcher::new(&config.experiments_dir, config.poll_interval(), files_tx);
    let (watcher_shutdown_tx, watcher_shutdown_rx) = mpsc::channel::<()>(1);
    let watcher_handle = tokio::spawn(watcher.run(watcher_shutdown_rx));

    let engine: Arc<dyn ExperimentEngine> = Arc::new(DefinitionEngine::new());
    let program = Program::new(config.clone(), monitor.clone(), engine);
    let (driver_shutdown_tx, driver_shutdown_rx) = mpsc::channel::<()>(1);
    let driver_handle = tokio::spawn(program.run(files_rx, driver_shutdown_rx));

    info!("labwatch running. Press Ctrl+C to stop.");

    wait_for_shutdown_signal().await?;

    info!("labwatch shutting down...");

    // Stop discovery first, then let the driver finish in-flight work
    let _ = watcher_shutdown_tx.send(()).await;
    let _ = driver_shutdown_tx.send(()).await;
    let _ = watcher_handle.await;
    let _ = driver_handle.await;

    // Stopping the monitor releases its render sender; once ours drops too
    // the dispatcher drains buffered commands and exits. Drained commands
    // still render correctly: the snapshot renderer reads the state document
    // on disk, not the stopped monitor.
    let _ = monitor.shutdown().await;
    drop(render_tx);
    let _ = dispatcher_handle.await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {
            warn!("SIGINT received");
        }
        _ = sigterm.recv() => {
            warn!("SIGTERM received");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
