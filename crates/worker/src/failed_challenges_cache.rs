//! Negative cache for challenges that recently failed to resolve.
//!
//! Owned by a single challenge worker; plain map, no locking, no
//! persistence. Entries expire after the strategy's retry timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct FailedChallengesCache {
    failures: HashMap<String, Instant>,
}

impl FailedChallengesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, valid for `ttl` from now. Last write wins.
    pub fn remember_failed_challenge(&mut self, challenge_id: &str, ttl: Duration) {
        self.failures
            .insert(challenge_id.to_string(), Instant::now() + ttl);
    }

    pub fn did_challenge_fail_recently(&self, challenge_id: &str) -> bool {
        self.failures
            .get(challenge_id)
            .is_some_and(|expire_at| *expire_at > Instant::now())
    }

    /// Drop every entry whose ttl has elapsed.
    pub fn clear_outdated_challenges(&mut self) {
        let now = Instant::now();
        self.failures.retain(|_, expire_at| *expire_at > now);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}
