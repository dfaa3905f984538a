//! The challenge worker.
//!
//! Each tick reads the on-chain challenge feed and tries challenges in
//! order until one resolves; at most one resolution happens per tick.
//! Anything that goes wrong with a single challenge is negatively cached
//! for the strategy's retry timeout and never aborts the tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use engine::DataModelEngine;
use registry::Challenge;
use repository::ChallengesRepository;

use crate::error::Result;
use crate::failed_challenges_cache::FailedChallengesCache;
use crate::logger::WorkerLogger;
use crate::periodic::PeriodicTask;
use crate::strategy::ChallengeStrategy;

pub struct ChallengeWorker {
    engine: Arc<DataModelEngine>,
    challenges_repository: Arc<ChallengesRepository>,
    strategy: Box<dyn ChallengeStrategy>,
    cache: FailedChallengesCache,
    logger: WorkerLogger,
}

impl ChallengeWorker {
    pub fn new(
        engine: Arc<DataModelEngine>,
        challenges_repository: Arc<ChallengesRepository>,
        strategy: Box<dyn ChallengeStrategy>,
        logger: WorkerLogger,
    ) -> Self {
        Self {
            engine,
            challenges_repository,
            strategy,
            cache: FailedChallengesCache::new(),
            logger,
        }
    }

    /// Returns true when the challenge was resolved. Failures are cached
    /// and reported, never propagated.
    async fn try_with_challenge(&mut self, challenge: &Challenge) -> bool {
        if self.cache.did_challenge_fail_recently(&challenge.challenge_id) {
            return false;
        }
        match self.try_to_resolve(challenge).await {
            Ok(resolved) => resolved,
            Err(error) => {
                self.cache
                    .remember_failed_challenge(&challenge.challenge_id, self.strategy.retry_timeout());
                self.logger
                    .error(
                        "Failed to resolve challenge",
                        json!({
                            "challengeId": challenge.challenge_id,
                            "bundleId": challenge.bundle_id,
                            "error": format!("{error:?}"),
                        }),
                    )
                    .await;
                false
            }
        }
    }

    async fn try_to_resolve(&self, challenge: &Challenge) -> Result<bool> {
        if !self.strategy.should_fetch_bundle(challenge).await {
            self.logger
                .info(
                    "Decided not to download bundle",
                    json!({"challengeId": challenge.challenge_id}),
                )
                .await;
            return Ok(false);
        }

        let bundle = self
            .engine
            .download_bundle(&challenge.bundle_id, &challenge.shelterer_id)
            .await?;

        if !self.strategy.should_resolve_challenge(&bundle).await {
            self.logger
                .info(
                    "Challenge resolution cancelled",
                    json!({"challengeId": challenge.challenge_id}),
                )
                .await;
            return Ok(false);
        }

        self.challenges_repository
            .resolve_challenge(&challenge.challenge_id)
            .await?;
        self.engine
            .update_sheltering_expiration_date(&bundle.bundle_id)
            .await?;
        self.strategy.after_challenge_resolution(&bundle).await;
        self.logger
            .info(
                "Resolved challenge and took over sheltering",
                json!({
                    "challengeId": challenge.challenge_id,
                    "bundleId": bundle.bundle_id,
                }),
            )
            .await;
        Ok(true)
    }
}

#[async_trait]
impl PeriodicTask for ChallengeWorker {
    fn name(&self) -> &'static str {
        "challenge-worker"
    }

    fn interval(&self) -> Duration {
        self.strategy.worker_interval()
    }

    async fn tick(&mut self) -> Result<()> {
        let challenges = self.challenges_repository.ongoing_challenges().await?;
        self.logger
            .info(
                "Challenges detected",
                json!({"count": challenges.len()}),
            )
            .await;

        for challenge in &challenges {
            if self.try_with_challenge(challenge).await {
                break;
            }
        }

        self.cache.clear_outdated_challenges();
        Ok(())
    }
}
