//! Process-wide transfer statistics

use std::sync::Mutex;

#[derive(Debug, Default)]
struct Counters {
    downloads: u64,
    uploads: u64,
    total_bytes: u64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub downloads: u64,
    pub uploads: u64,
    pub total_bytes: u64,
}

/// Counters shared by all transfers for the process lifetime.
///
/// The download count and cumulative bytes move together under one lock so a
/// snapshot can never observe one half of the pair.
#[derive(Debug, Default)]
pub struct RelayStats {
    inner: Mutex<Counters>,
}

impl RelayStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a started download and credit its bytes.
    pub fn record_download(&self, bytes: u64) {
        let mut counters = self.inner.lock().unwrap();
        counters.downloads += 1;
        counters.total_bytes += bytes;
    }

    /// Count a completed upload.
    pub fn record_upload(&self) {
        self.inner.lock().unwrap().uploads += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let counters = self.inner.lock().unwrap();
        StatsSnapshot {
            downloads: counters.downloads,
            uploads: counters.uploads,
            total_bytes: counters.total_bytes,
        }
    }
}
