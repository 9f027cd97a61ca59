//! Transfer orchestration
//!
//! The [`RelayEngine`] accepts transfer requests and drives each one through
//! size check, fetch, publish, stats update, and cleanup. Every terminal
//! path removes the staged bytes and releases the cancellation token exactly
//! once, then emits a single terminal status.

use crate::cancel::{CancelToken, CancellationRegistry, SignalOutcome};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::output::OutputManager;
use crate::progress::{
    ProgressReporter, StatusRenderer, TerminalStatus, TerminalUpdate, TransferPhase,
};
use crate::stats::{RelayStats, StatsSnapshot};
use crate::storage::ObjectStore;
use crate::transfer::{check_size, FileSource, TransferRequest, TransferState};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Entry point for the control layer: submit transfers, cancel them by
/// request id, and read the stats snapshot.
///
/// Clones share the same stats, registry, store, and renderer.
#[derive(Clone)]
pub struct RelayEngine {
    config: RelayConfig,
    stats: Arc<RelayStats>,
    registry: Arc<CancellationRegistry>,
    store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn StatusRenderer>,
    output: OutputManager,
}

impl RelayEngine {
    pub fn new(
        config: RelayConfig,
        store: Arc<dyn ObjectStore>,
        renderer: Arc<dyn StatusRenderer>,
        output: OutputManager,
    ) -> Self {
        Self {
            config,
            stats: Arc::new(RelayStats::new()),
            registry: Arc::new(CancellationRegistry::new()),
            store,
            renderer,
            output,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Signal cancellation for an active request. Reports `NotFound` when no
    /// active request matches the id, so the caller can render "no active
    /// operation".
    pub fn cancel(&self, request_id: Uuid) -> SignalOutcome {
        self.registry.signal(request_id)
    }

    /// Run one transfer to its terminal state.
    pub async fn relay(&self, source: &dyn FileSource) -> TerminalUpdate {
        let request =
            TransferRequest::new(source.file_name().to_string(), source.declared_size());
        self.run(request, source).await
    }

    /// Submit a transfer as an independent task, returning its request id
    /// for cancellation and a handle to the terminal status.
    pub fn spawn(&self, source: Arc<dyn FileSource>) -> (Uuid, JoinHandle<TerminalUpdate>) {
        let request =
            TransferRequest::new(source.file_name().to_string(), source.declared_size());
        let request_id = request.id;
        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.run(request, source.as_ref()).await });
        (request_id, handle)
    }

    async fn run(&self, mut request: TransferRequest, source: &dyn FileSource) -> TerminalUpdate {
        self.output.info(&format!(
            "Processing {} ({})",
            request.file_name,
            self.output.format_size(request.declared_size)
        ));

        // Size guard runs in Pending: a rejection never registers a token
        // and never touches the stats.
        if let Err(e) = check_size(request.declared_size, self.config.size_limit) {
            request.state = TransferState::Failed;
            return self.finish(&request, TerminalStatus::Failed {
                reason: e.to_string(),
            })
            .await;
        }

        let token = self.registry.register(request.id);
        request.state = TransferState::Downloading;
        request.started_at = Some(Instant::now());
        // Bytes are credited up front from the declared size, at download
        // start. Cancelled and failed transfers keep the credit.
        self.stats.record_download(request.declared_size);

        let staging = self.staging_path(&request);
        let outcome = self.drive(&mut request, source, &token, &staging).await;

        let status = match outcome {
            Ok(link) => {
                request.state = TransferState::Completed;
                TerminalStatus::Completed { link }
            }
            Err(RelayError::Cancelled) => {
                request.state = TransferState::Cancelled;
                TerminalStatus::Cancelled
            }
            Err(e) => {
                request.state = TransferState::Failed;
                TerminalStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.remove_staged(&staging).await;
        self.registry.release(request.id);
        self.finish(&request, status).await
    }

    async fn drive(
        &self,
        request: &mut TransferRequest,
        source: &dyn FileSource,
        token: &CancelToken,
        staging: &Path,
    ) -> Result<String> {
        self.fetch(request, source, token, staging).await?;
        request.state = TransferState::Uploading;
        self.publish(request, token, staging).await
    }

    /// Fetch phase: stream source bytes into staging storage with a
    /// progress/cancellation checkpoint after every chunk.
    async fn fetch(
        &self,
        request: &TransferRequest,
        source: &dyn FileSource,
        token: &CancelToken,
        staging: &Path,
    ) -> Result<()> {
        if let Some(parent) = staging.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut reporter = self.reporter(request, TransferPhase::Fetching, token);
        let mut stream = source.open().await?;
        let mut file = tokio::fs::File::create(staging).await?;
        let mut current: u64 = 0;

        // The first observation is always emitted and doubles as the
        // pre-read cancellation checkpoint.
        reporter.observe(current).await?;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RelayError::Io(e.to_string()))?;
            file.write_all(&chunk).await?;
            current += chunk.len() as u64;
            reporter.observe(current).await?;
        }
        file.flush().await?;
        Ok(())
    }

    /// Publish phase: resolve a destination from a fresh pool, then stream
    /// the staged bytes to it. The upload counter moves only on success.
    async fn publish(
        &self,
        request: &TransferRequest,
        token: &CancelToken,
        staging: &Path,
    ) -> Result<String> {
        let mut reporter = self.reporter(request, TransferPhase::Publishing, token);
        reporter.observe(0).await?;

        let destination = self.store.resolve().await?;
        self.output.detail(&format!(
            "Publishing {} to {}",
            request.file_name, destination.endpoint
        ));
        if token.is_signaled() {
            return Err(RelayError::Cancelled);
        }

        let link = self
            .store
            .publish(&destination, staging, &request.file_name, token)
            .await?;
        if token.is_signaled() {
            return Err(RelayError::Cancelled);
        }

        self.stats.record_upload();
        Ok(link)
    }

    fn reporter(
        &self,
        request: &TransferRequest,
        phase: TransferPhase,
        token: &CancelToken,
    ) -> ProgressReporter {
        ProgressReporter::new(
            request.id,
            request.file_name.clone(),
            request.declared_size,
            phase,
            self.config.progress_interval(),
            token.clone(),
            Arc::clone(&self.renderer),
            self.output.clone(),
        )
    }

    fn staging_path(&self, request: &TransferRequest) -> PathBuf {
        self.config
            .staging_dir
            .join(format!("{}_{}", request.id, sanitize_file_name(&request.file_name)))
    }

    async fn remove_staged(&self, staging: &Path) {
        if let Err(e) = tokio::fs::remove_file(staging).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.output.warning(&format!(
                    "Failed to remove staged file {}: {}",
                    staging.display(),
                    e
                ));
            }
        }
    }

    /// Emit the single terminal status for the request. Render failures are
    /// logged and swallowed here as well.
    async fn finish(&self, request: &TransferRequest, status: TerminalStatus) -> TerminalUpdate {
        let update = TerminalUpdate {
            request_id: request.id,
            file_name: request.file_name.clone(),
            total_bytes: request.declared_size,
            status,
        };

        match &update.status {
            TerminalStatus::Completed { link } => {
                self.output
                    .success(&format!("{} relayed: {}", request.file_name, link));
            }
            TerminalStatus::Cancelled => {
                self.output
                    .info(&format!("{} cancelled by user", request.file_name));
            }
            TerminalStatus::Failed { reason } => {
                self.output
                    .error(&format!("{} failed: {}", request.file_name, reason));
            }
        }

        if let Err(e) = self.renderer.render_terminal(&update).await {
            self.output
                .detail(&format!("Terminal status update failed: {}", e));
        }
        update
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .replace('/', "_")
        .replace('\\', "_")
        .replace(':', "_")
}
