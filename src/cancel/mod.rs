//! Cooperative per-request cancellation
//!
//! Each accepted transfer owns a [`CancelToken`] registered here under its
//! request id. The control path signals by id only; it never owns the token.
//! Signaling is edge-triggered and observed at the transfer's own
//! checkpoints, not a preemptive interrupt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Per-request cancellation flag with an at-most-once unsignaled → signaled
/// transition, readable by any number of checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a control-path signal attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Signaled,
    /// No active request matched the id; callers render "no active
    /// operation" from this, it is not an error.
    NotFound,
}

/// Tokens for all in-flight requests, keyed by request id.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<Uuid, CancelToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a fresh token for the request. The returned clone
    /// shares the flag with the registry entry, so a signal arriving through
    /// the registry immediately after registration is never missed.
    pub fn register(&self, request_id: Uuid) -> CancelToken {
        let token = CancelToken::new();
        self.tokens
            .lock()
            .unwrap()
            .insert(request_id, token.clone());
        token
    }

    pub fn signal(&self, request_id: Uuid) -> SignalOutcome {
        match self.tokens.lock().unwrap().get(&request_id) {
            Some(token) => {
                token.signal();
                SignalOutcome::Signaled
            }
            None => SignalOutcome::NotFound,
        }
    }

    /// Remove the request's token. Safe to call when the id is already
    /// absent.
    pub fn release(&self, request_id: Uuid) {
        self.tokens.lock().unwrap().remove(&request_id);
    }

    pub fn active(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_signal_unknown_id_reports_not_found() {
        let registry = CancellationRegistry::new();
        assert_eq!(registry.signal(Uuid::new_v4()), SignalOutcome::NotFound);
    }

    #[test]
    fn test_registered_token_observes_signal() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let token = registry.register(id);

        assert!(!token.is_signaled());
        assert_eq!(registry.signal(id), SignalOutcome::Signaled);
        assert!(token.is_signaled());
    }

    #[test]
    fn test_release_then_signal_reports_not_found() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let _token = registry.register(id);

        registry.release(id);
        assert_eq!(registry.signal(id), SignalOutcome::NotFound);
        // Releasing an already-absent id is a no-op.
        registry.release(id);
        assert_eq!(registry.active(), 0);
    }

    #[test]
    fn test_signal_is_idempotent() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let token = registry.register(id);

        assert_eq!(registry.signal(id), SignalOutcome::Signaled);
        assert_eq!(registry.signal(id), SignalOutcome::Signaled);
        assert!(token.is_signaled());
    }

    #[test]
    fn test_independent_requests_do_not_interfere() {
        let registry = Arc::new(CancellationRegistry::new());
        let ids: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();
        let tokens: Vec<CancelToken> = ids.iter().map(|id| registry.register(*id)).collect();

        let mut handles = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let registry = Arc::clone(&registry);
            let id = *id;
            if i % 2 == 0 {
                handles.push(std::thread::spawn(move || {
                    assert_eq!(registry.signal(id), SignalOutcome::Signaled);
                }));
            } else {
                handles.push(std::thread::spawn(move || {
                    registry.release(id);
                }));
            }
        }
        for handle in handles {
            handle.join().unwrap();
        }

        for (i, token) in tokens.iter().enumerate() {
            if i % 2 == 0 {
                assert!(token.is_signaled());
            } else {
                assert!(!token.is_signaled());
            }
        }
    }
}
