//! File Relay Library
//!
//! Relays files from an inbound source to a remote object-storage service:
//! a two-phase fetch-then-publish transfer with throttled progress
//! reporting, cooperative cancellation, and process-wide statistics.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;
pub mod stats;
pub mod storage;
pub mod transfer;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use output::OutputManager;
pub use stats::{RelayStats, StatsSnapshot};
pub use transfer::coordinator::RelayEngine;
