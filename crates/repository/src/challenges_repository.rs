//! Thin adapter over the registry's shelter-challenge operations.

use std::sync::Arc;

use registry::{Challenge, Registry};

use crate::error::Result;

pub struct ChallengesRepository {
    registry: Arc<dyn Registry>,
}

impl ChallengesRepository {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Open challenges, in registry order.
    pub async fn ongoing_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self.registry.ongoing_challenges().await?)
    }

    /// Resolve a challenge, returning the resolution transaction hash.
    pub async fn resolve_challenge(&self, challenge_id: &str) -> Result<String> {
        Ok(self.registry.resolve_challenge(challenge_id).await?)
    }

    /// The sheltering expiration the chain records for a bundle.
    pub async fn sheltering_expiration_date(&self, bundle_id: &str) -> Result<u64> {
        Ok(self.registry.sheltering_expiration_date(bundle_id).await?)
    }
}
