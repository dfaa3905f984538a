//! Worker strategies.
//!
//! The workers are generic control loops; every policy decision (when to
//! bundle, which challenges to take, how long to back off) lives behind
//! these traits, so a node role is a strategy choice, not a code path.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use engine::BundleCandidate;
use entities::Bundle;
use registry::Challenge;

#[async_trait]
pub trait UploadStrategy: Send + Sync {
    /// Delay between upload worker ticks.
    fn worker_interval(&self) -> Duration;

    /// Sheltering duration requested for each upload.
    fn storage_periods(&self) -> u32;

    /// Whether the assembled candidate is worth committing on chain.
    async fn should_bundle(&self, candidate: &BundleCandidate) -> bool;

    /// Called after a successful commit.
    async fn bundling_succeeded(&self);
}

#[async_trait]
pub trait ChallengeStrategy: Send + Sync {
    /// Delay between challenge worker ticks.
    fn worker_interval(&self) -> Duration;

    /// How long a failed challenge stays negatively cached.
    fn retry_timeout(&self) -> Duration;

    /// Whether to download the bundle behind a challenge at all.
    async fn should_fetch_bundle(&self, challenge: &Challenge) -> bool;

    /// Whether to resolve the challenge after seeing the bundle.
    async fn should_resolve_challenge(&self, bundle: &Bundle) -> bool;

    /// Called after a successful resolution.
    async fn after_challenge_resolution(&self, bundle: &Bundle);
}

/// Bundle on every tick that has anything to bundle.
pub struct RegularUploadStrategy {
    worker_interval: Duration,
    storage_periods: u32,
}

impl RegularUploadStrategy {
    pub fn new(worker_interval: Duration, storage_periods: u32) -> Self {
        Self {
            worker_interval,
            storage_periods,
        }
    }
}

#[async_trait]
impl UploadStrategy for RegularUploadStrategy {
    fn worker_interval(&self) -> Duration {
        self.worker_interval
    }

    fn storage_periods(&self) -> u32 {
        self.storage_periods
    }

    async fn should_bundle(&self, candidate: &BundleCandidate) -> bool {
        candidate.entry_count() > 0
    }

    async fn bundling_succeeded(&self) {
        debug!("bundling round succeeded");
    }
}

/// Take every challenge this node can serve.
pub struct ResolveAllChallengesStrategy {
    worker_interval: Duration,
    retry_timeout: Duration,
}

impl ResolveAllChallengesStrategy {
    pub fn new(worker_interval: Duration, retry_timeout: Duration) -> Self {
        Self {
            worker_interval,
            retry_timeout,
        }
    }
}

#[async_trait]
impl ChallengeStrategy for ResolveAllChallengesStrategy {
    fn worker_interval(&self) -> Duration {
        self.worker_interval
    }

    fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    async fn should_fetch_bundle(&self, _challenge: &Challenge) -> bool {
        true
    }

    async fn should_resolve_challenge(&self, _bundle: &Bundle) -> bool {
        true
    }

    async fn after_challenge_resolution(&self, bundle: &Bundle) {
        debug!(bundle_id = %bundle.bundle_id, "took over sheltering");
    }
}
