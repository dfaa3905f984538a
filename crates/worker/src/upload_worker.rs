//! The upload worker.
//!
//! Each tick checks funding, runs the retry sweep for bundles that never
//! made it on chain, claims and assembles a new bundle, and commits it if
//! the strategy agrees. The sequence number only advances on a successful
//! commit, so a failed upload retries under the same stub next tick.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use engine::DataModelEngine;
use repository::UploadRepository;

use crate::error::Result;
use crate::logger::WorkerLogger;
use crate::periodic::PeriodicTask;
use crate::strategy::UploadStrategy;

pub struct UploadWorker {
    engine: Arc<DataModelEngine>,
    upload_repository: Arc<UploadRepository>,
    strategy: Box<dyn UploadStrategy>,
    logger: WorkerLogger,
    retry_period: u32,
    sequence_number: u64,
    since_last_retry: u32,
}

impl UploadWorker {
    pub fn new(
        engine: Arc<DataModelEngine>,
        upload_repository: Arc<UploadRepository>,
        strategy: Box<dyn UploadStrategy>,
        logger: WorkerLogger,
        retry_period: u32,
    ) -> Self {
        Self {
            engine,
            upload_repository,
            strategy,
            logger,
            retry_period,
            sequence_number: 0,
            // Start at the threshold so the very first tick sweeps for
            // bundles a previous run left unregistered.
            since_last_retry: retry_period,
        }
    }

    async fn retry_upload_if_necessary(&mut self, storage_periods: u32) -> Result<()> {
        self.since_last_retry += 1;
        if self.since_last_retry >= self.retry_period {
            let bundles = self
                .engine
                .upload_not_registered_bundles(storage_periods)
                .await?;
            if !bundles.is_empty() {
                self.logger
                    .info(
                        "Uploaded bundles waiting for chain registration",
                        json!({"count": bundles.len()}),
                    )
                    .await;
                self.since_last_retry = 0;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for UploadWorker {
    fn name(&self) -> &'static str {
        "upload-worker"
    }

    fn interval(&self) -> Duration {
        self.strategy.worker_interval()
    }

    async fn tick(&mut self) -> Result<()> {
        let storage_periods = self.strategy.storage_periods();

        if !self
            .upload_repository
            .check_if_enough_funds_for_upload(storage_periods)
            .await?
        {
            self.logger
                .warn("Insufficient funds to upload bundle", json!({}))
                .await;
            return Ok(());
        }

        self.retry_upload_if_necessary(storage_periods).await?;

        let items_count_limit = self.upload_repository.bundle_items_count_limit().await?;
        let candidate = self
            .engine
            .initialise_bundling(self.sequence_number, items_count_limit)
            .await?;

        if self.strategy.should_bundle(&candidate).await {
            match self.engine.finalise_bundling(&candidate, storage_periods).await? {
                Some(bundle) => {
                    self.logger
                        .info(
                            "Bundle successfully uploaded",
                            json!({"bundleId": bundle.bundle_id}),
                        )
                        .await;
                    self.strategy.bundling_succeeded().await;
                    self.sequence_number += 1;
                }
                None => {
                    self.logger
                        .warn(
                            "Bundle upload failed",
                            json!({"bundleId": candidate.bundle.bundle_id}),
                        )
                        .await;
                }
            }
        } else {
            self.engine.cancel_bundling(self.sequence_number).await?;
            self.logger.info("Bundling process canceled", json!({})).await;
        }
        Ok(())
    }
}
