//! CLI execution: wires config, store, renderer, and engine together

use crate::cli::Args;
use crate::error::{RelayError, Result};
use crate::output::OutputManager;
use crate::progress::{ProgressUpdate, StatusRenderer, TerminalStatus, TerminalUpdate};
use crate::storage::gofile::GofileStore;
use crate::transfer::coordinator::RelayEngine;
use crate::transfer::local::LocalFileSource;
use crate::transfer::FileSource;
use async_trait::async_trait;
use std::sync::Arc;

/// Renders progress and terminal statuses to the console.
pub struct ConsoleRenderer {
    output: OutputManager,
}

impl ConsoleRenderer {
    pub fn new(output: OutputManager) -> Self {
        Self { output }
    }
}

#[async_trait]
impl StatusRenderer for ConsoleRenderer {
    async fn render_progress(&self, update: &ProgressUpdate) -> Result<()> {
        let eta = match update.metrics.eta {
            Some(eta) => self.output.format_duration(eta),
            None => "--".to_string(),
        };
        self.output.info(&format!(
            "{} {}: {} {:.2}% | {} | ETA: {}",
            update.phase,
            update.file_name,
            self.output.progress_bar(update.metrics.percentage),
            update.metrics.percentage,
            self.output.format_speed(update.metrics.speed as u64),
            eta
        ));
        Ok(())
    }

    async fn render_terminal(&self, update: &TerminalUpdate) -> Result<()> {
        match &update.status {
            TerminalStatus::Completed { link } => {
                self.output.success(&format!(
                    "Upload complete: {} ({}) -> {}",
                    update.file_name,
                    self.output.format_size(update.total_bytes),
                    link
                ));
            }
            TerminalStatus::Cancelled => {
                self.output
                    .info(&format!("Operation cancelled: {}", update.file_name));
            }
            TerminalStatus::Failed { reason } => {
                self.output
                    .error(&format!("Operation failed: {}: {}", update.file_name, reason));
            }
        }
        Ok(())
    }
}

pub async fn run(args: Args) -> Result<()> {
    args.validate().map_err(RelayError::Validation)?;
    let config = args.to_config();
    config.validate()?;

    let output = OutputManager::new(config.verbose);
    let store = Arc::new(GofileStore::from_config(&config)?);
    let renderer = Arc::new(ConsoleRenderer::new(output.clone()));
    let engine = Arc::new(RelayEngine::new(config, store, renderer, output.clone()));

    let mut handles = Vec::new();
    let mut request_ids = Vec::new();
    for path in &args.files {
        let source: Arc<dyn FileSource> = Arc::new(LocalFileSource::new(path).await?);
        let (request_id, handle) = engine.spawn(source);
        request_ids.push(request_id);
        handles.push(handle);
    }

    // Ctrl-C signals every active transfer through the registry; transfers
    // wind down at their next checkpoint.
    {
        let engine = Arc::clone(&engine);
        let output = output.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                output.warning("Cancelling active transfers...");
                for request_id in request_ids {
                    engine.cancel(request_id);
                }
            }
        });
    }

    let mut failed = 0usize;
    for handle in handles {
        match handle.await {
            Ok(update) => {
                if matches!(update.status, TerminalStatus::Failed { .. }) {
                    failed += 1;
                }
            }
            Err(e) => {
                output.error(&format!("Transfer task failed to complete: {}", e));
                failed += 1;
            }
        }
    }

    let stats = engine.stats();
    output.info(&format!(
        "Downloads: {} | Uploads: {} | Data transferred: {}",
        stats.downloads,
        stats.uploads,
        output.format_size(stats.total_bytes)
    ));

    if failed > 0 {
        return Err(RelayError::Upload(format!(
            "{} transfer(s) did not complete",
            failed
        )));
    }
    Ok(())
}
