//! Transfer requests, lifecycle states, and the inbound source seam

pub mod coordinator;
pub mod local;

use crate::error::{RelayError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Chunked byte stream produced by a [`FileSource`].
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Inbound side of the relay: something that can hand over a named file of
/// known size as a byte stream. The messaging client lives behind this seam.
#[async_trait]
pub trait FileSource: Send + Sync {
    fn file_name(&self) -> &str;
    fn declared_size(&self) -> u64;
    async fn open(&self) -> Result<ByteStream>;
}

/// Reject oversized inputs before any work starts.
///
/// Pure and synchronous; runs before token registration and before any
/// Stats mutation. Exactly-at-limit is allowed.
pub fn check_size(declared_size: u64, limit: u64) -> Result<()> {
    if declared_size > limit {
        return Err(RelayError::SizeLimitExceeded {
            size: declared_size,
            limit,
        });
    }
    Ok(())
}

/// Lifecycle of one transfer. `Completed`, `Cancelled`, and `Failed` are
/// terminal; `Downloading` and `Uploading` can exit to either of the last
/// two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    Downloading,
    Uploading,
    Completed,
    Cancelled,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Cancelled | TransferState::Failed
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Pending => "pending",
            TransferState::Downloading => "downloading",
            TransferState::Uploading => "uploading",
            TransferState::Completed => "completed",
            TransferState::Cancelled => "cancelled",
            TransferState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// One accepted transfer. Mutated only by the coordinator that owns it and
/// destroyed when it reaches a terminal state.
#[derive(Debug)]
pub struct TransferRequest {
    pub id: Uuid,
    pub file_name: String,
    pub declared_size: u64,
    pub state: TransferState,
    pub started_at: Option<Instant>,
}

impl TransferRequest {
    pub fn new(file_name: String, declared_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name,
            declared_size,
            state: TransferState::Pending,
            started_at: None,
        }
    }
}
