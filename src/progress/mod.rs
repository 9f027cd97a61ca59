//! Throttled progress reporting
//!
//! The [`ProgressReporter`] owns a request-scoped [`ProgressSample`], decides
//! whether an update is due, and polls the request's cancellation token on
//! every observation. Long-running reads and writes observe cancellation
//! here, since the underlying transfer primitives do not abort mid-stream on
//! their own.

use crate::cancel::CancelToken;
use crate::error::{RelayError, Result};
use crate::output::OutputManager;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Guards the speed division on the very first sample.
const MIN_ELAPSED_SECS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Fetching,
    Publishing,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Fetching => write!(f, "Downloading"),
            TransferPhase::Publishing => write!(f, "Uploading"),
        }
    }
}

/// Derived metrics for one progress observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressMetrics {
    /// Completion percentage in `[0, 100]`
    pub percentage: f64,
    /// Bytes per second since the transfer started
    pub speed: f64,
    /// Estimated remaining time; `None` while the speed is still zero
    pub eta: Option<Duration>,
}

/// Compute percentage, speed, and ETA from byte counters.
pub fn compute_metrics(current: u64, total: u64, elapsed: Duration) -> ProgressMetrics {
    let secs = elapsed.as_secs_f64().max(MIN_ELAPSED_SECS);
    let speed = current as f64 / secs;
    let percentage = if total == 0 {
        100.0
    } else {
        (current as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
    };
    let eta = if speed > 0.0 {
        Some(Duration::from_secs_f64(
            total.saturating_sub(current) as f64 / speed,
        ))
    } else {
        None
    };
    ProgressMetrics {
        percentage,
        speed,
        eta,
    }
}

/// Throttling decision: the first call for a request has no prior emit and
/// is always due.
pub fn should_emit(now: Instant, last_emit: Option<Instant>, min_interval: Duration) -> bool {
    match last_emit {
        None => true,
        Some(last) => now.duration_since(last) >= min_interval,
    }
}

/// Byte counters for one request, scoped to that request and discarded with
/// it. `current` never exceeds `total`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSample {
    pub current: u64,
    pub total: u64,
    pub phase: TransferPhase,
    pub last_emit: Option<Instant>,
}

impl ProgressSample {
    pub fn new(total: u64, phase: TransferPhase) -> Self {
        Self {
            current: 0,
            total,
            phase,
            last_emit: None,
        }
    }

    pub fn advance(&mut self, current: u64) {
        self.current = current.min(self.total);
    }
}

/// In-progress status payload handed to the renderer.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub request_id: Uuid,
    pub file_name: String,
    pub current_bytes: u64,
    pub total_bytes: u64,
    pub phase: TransferPhase,
    pub metrics: ProgressMetrics,
}

/// Terminal outcome of a transfer; exactly one is emitted per request and
/// each is distinct from every in-progress update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Completed { link: String },
    Cancelled,
    Failed { reason: String },
}

/// Terminal status payload handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalUpdate {
    pub request_id: Uuid,
    pub file_name: String,
    pub total_bytes: u64,
    pub status: TerminalStatus,
}

/// Rendering seam for the external control/display layer. Render failures
/// are logged and swallowed by the caller; they never fail a transfer.
#[async_trait]
pub trait StatusRenderer: Send + Sync {
    async fn render_progress(&self, update: &ProgressUpdate) -> Result<()>;
    async fn render_terminal(&self, update: &TerminalUpdate) -> Result<()>;
}

/// Per-request throttled reporter with a built-in cancellation checkpoint.
pub struct ProgressReporter {
    request_id: Uuid,
    file_name: String,
    sample: ProgressSample,
    started_at: Instant,
    min_interval: Duration,
    token: CancelToken,
    renderer: Arc<dyn StatusRenderer>,
    output: OutputManager,
}

impl ProgressReporter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: Uuid,
        file_name: String,
        total: u64,
        phase: TransferPhase,
        min_interval: Duration,
        token: CancelToken,
        renderer: Arc<dyn StatusRenderer>,
        output: OutputManager,
    ) -> Self {
        Self {
            request_id,
            file_name,
            sample: ProgressSample::new(total, phase),
            started_at: Instant::now(),
            min_interval,
            token,
            renderer,
            output,
        }
    }

    /// Record the current byte count, poll the cancellation token, and emit
    /// a throttled update when one is due.
    ///
    /// Returns `Err(RelayError::Cancelled)` once the token is signaled; this
    /// is the primary point where long-running I/O observes cancellation.
    pub async fn observe(&mut self, current: u64) -> Result<()> {
        self.sample.advance(current);
        let now = Instant::now();
        let due = should_emit(now, self.sample.last_emit, self.min_interval);
        if due {
            self.sample.last_emit = Some(now);
        }

        if self.token.is_signaled() {
            return Err(RelayError::Cancelled);
        }

        if due {
            let metrics = compute_metrics(
                self.sample.current,
                self.sample.total,
                now.duration_since(self.started_at),
            );
            let update = ProgressUpdate {
                request_id: self.request_id,
                file_name: self.file_name.clone(),
                current_bytes: self.sample.current,
                total_bytes: self.sample.total,
                phase: self.sample.phase,
                metrics,
            };
            if let Err(e) = self.renderer.render_progress(&update).await {
                self.output.detail(&format!("Progress update failed: {}", e));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    #[async_trait]
    impl StatusRenderer for RecordingRenderer {
        async fn render_progress(&self, update: &ProgressUpdate) -> Result<()> {
            self.updates.lock().unwrap().push(update.clone());
            Ok(())
        }

        async fn render_terminal(&self, _update: &TerminalUpdate) -> Result<()> {
            Ok(())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl StatusRenderer for FailingRenderer {
        async fn render_progress(&self, _update: &ProgressUpdate) -> Result<()> {
            Err(RelayError::Network("message edit failed".to_string()))
        }

        async fn render_terminal(&self, _update: &TerminalUpdate) -> Result<()> {
            Ok(())
        }
    }

    fn reporter(
        min_interval: Duration,
        token: CancelToken,
        renderer: Arc<dyn StatusRenderer>,
    ) -> ProgressReporter {
        ProgressReporter::new(
            Uuid::new_v4(),
            "video.mkv".to_string(),
            100,
            TransferPhase::Fetching,
            min_interval,
            token,
            renderer,
            OutputManager::new_quiet(),
        )
    }

    #[test]
    fn test_compute_metrics_reference_values() {
        let metrics = compute_metrics(50, 100, Duration::from_secs(10));
        assert_eq!(metrics.percentage, 50.0);
        assert_eq!(metrics.speed, 5.0);
        assert_eq!(metrics.eta, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_compute_metrics_zero_elapsed_has_finite_speed() {
        let metrics = compute_metrics(100, 100, Duration::ZERO);
        assert!(metrics.speed.is_finite());
        assert!(metrics.speed > 0.0);
        assert_eq!(metrics.percentage, 100.0);
    }

    #[test]
    fn test_compute_metrics_zero_speed_has_no_eta() {
        let metrics = compute_metrics(0, 100, Duration::from_secs(10));
        assert_eq!(metrics.speed, 0.0);
        assert_eq!(metrics.eta, None);
        assert_eq!(metrics.percentage, 0.0);
    }

    #[test]
    fn test_first_call_is_always_due() {
        assert!(should_emit(Instant::now(), None, Duration::from_secs(5)));
    }

    #[test]
    fn test_throttle_blocks_until_interval_elapses() {
        let interval = Duration::from_secs(5);
        let last = Instant::now();
        assert!(!should_emit(
            last + Duration::from_secs(2),
            Some(last),
            interval
        ));
        assert!(should_emit(
            last + Duration::from_secs(5),
            Some(last),
            interval
        ));
    }

    #[test]
    fn test_sample_current_never_exceeds_total() {
        let mut sample = ProgressSample::new(100, TransferPhase::Fetching);
        sample.advance(250);
        assert_eq!(sample.current, 100);
    }

    #[tokio::test]
    async fn test_observe_emits_first_and_throttles_rest() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut reporter = reporter(
            Duration::from_secs(3600),
            CancelToken::new(),
            renderer.clone(),
        );

        for current in [10, 20, 30, 40] {
            reporter.observe(current).await.unwrap();
        }

        let updates = renderer.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].current_bytes, 10);
    }

    #[tokio::test]
    async fn test_observe_detects_cancellation() {
        let token = CancelToken::new();
        let mut reporter = reporter(
            Duration::from_secs(3600),
            token.clone(),
            Arc::new(RecordingRenderer::default()),
        );

        reporter.observe(10).await.unwrap();
        token.signal();
        assert!(matches!(
            reporter.observe(20).await,
            Err(RelayError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_render_failures_are_swallowed() {
        let mut reporter = reporter(
            Duration::from_secs(3600),
            CancelToken::new(),
            Arc::new(FailingRenderer),
        );
        assert!(reporter.observe(10).await.is_ok());
    }
}
