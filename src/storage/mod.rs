//! Destination resolution and object-storage publishing

pub mod gofile;

use crate::cancel::CancelToken;
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::path::Path;

/// A chosen publish endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub endpoint: String,
}

/// Candidate endpoints fetched fresh per transfer from the directory
/// service. Read-only once fetched; discarded after selection.
#[derive(Debug, Clone, Default)]
pub struct DestinationPool {
    endpoints: Vec<String>,
}

impl DestinationPool {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Uniform-random selection among the candidates. No stickiness, no
    /// health checks; a failed publish against the choice is surfaced as a
    /// publish failure, not retried against another endpoint.
    pub fn choose(&self) -> Result<Destination> {
        self.endpoints
            .choose(&mut rand::rng())
            .map(|endpoint| Destination {
                endpoint: endpoint.clone(),
            })
            .ok_or(RelayError::EmptyPool)
    }
}

/// Remote object-storage seam used by the publish phase.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a fresh destination pool and select one endpoint.
    async fn resolve(&self) -> Result<Destination>;

    /// Stream the staged file to the destination, returning the public
    /// link. Implementations poll `token` between chunks so a signal aborts
    /// the stream rather than waiting for the response.
    async fn publish(
        &self,
        destination: &Destination,
        staged: &Path,
        file_name: &str,
        token: &CancelToken,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_choose_fails() {
        let pool = DestinationPool::new(Vec::new());
        assert!(matches!(pool.choose(), Err(RelayError::EmptyPool)));
    }

    #[test]
    fn test_choose_returns_a_pool_member() {
        let pool = DestinationPool::new(vec![
            "store1".to_string(),
            "store2".to_string(),
            "store3".to_string(),
        ]);
        for _ in 0..16 {
            let destination = pool.choose().unwrap();
            assert!(["store1", "store2", "store3"].contains(&destination.endpoint.as_str()));
        }
    }

    #[test]
    fn test_single_candidate_is_always_chosen() {
        let pool = DestinationPool::new(vec!["only".to_string()]);
        assert_eq!(pool.choose().unwrap().endpoint, "only");
    }
}
