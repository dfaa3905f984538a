//! The data-model engine.
//!
//! Orchestrates the validator, the repositories, and the registry: entity
//! ingress, the bundling lifecycle the upload worker drives, and the bundle
//! download path the challenge worker drives.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use entities::builder::{assemble_bundle, stamp_upload_timestamp};
use entities::{
    Asset, Bundle, EntityValidator, Event, FindAssetsParams, FindEventsParams,
};
use registry::Registry;
use repository::entity_repository::FindResult;
use repository::{ChallengesRepository, EntityRepository, UploadRepository, BUNDLE_STUB_PREFIX};

use crate::download::BundleDownloader;
use crate::error::{EngineError, Result};

/// An assembled bundle whose entities are still claimed under a stub id.
#[derive(Debug, Clone)]
pub struct BundleCandidate {
    pub bundle: Bundle,
    pub stub_id: String,
}

impl BundleCandidate {
    pub fn entry_count(&self) -> usize {
        self.bundle.content.entries.len()
    }
}

pub struct DataModelEngine {
    validator: EntityValidator,
    repository: Arc<EntityRepository>,
    upload_repository: Arc<UploadRepository>,
    challenges_repository: Arc<ChallengesRepository>,
    registry: Arc<dyn Registry>,
    downloader: Arc<dyn BundleDownloader>,
    upload_secret: String,
    node_address: String,
    boot_time: u64,
}

impl DataModelEngine {
    pub fn new(
        validator: EntityValidator,
        repository: Arc<EntityRepository>,
        upload_repository: Arc<UploadRepository>,
        challenges_repository: Arc<ChallengesRepository>,
        registry: Arc<dyn Registry>,
        downloader: Arc<dyn BundleDownloader>,
        upload_secret: String,
    ) -> Result<Self> {
        let node_address = identity::address_from_secret(&upload_secret)?;
        Ok(Self {
            validator,
            repository,
            upload_repository,
            challenges_repository,
            registry,
            downloader,
            upload_secret,
            node_address,
            boot_time: now_seconds(),
        })
    }

    pub fn node_address(&self) -> &str {
        &self.node_address
    }

    // ===== Ingress =====

    /// Validate and persist an incoming asset document.
    pub async fn add_asset(&self, value: &Value) -> Result<Asset> {
        let asset = self.validator.validate_asset(value)?;
        self.repository.store_asset(&asset).await?;
        debug!(asset_id = %asset.asset_id, "asset stored");
        Ok(asset)
    }

    /// Validate, stamp, and persist an incoming event document.
    pub async fn add_event(&self, value: &Value) -> Result<Event> {
        let event = self.validator.validate_event(value)?;
        let event = stamp_upload_timestamp(&event);
        self.repository.store_event(&event).await?;
        debug!(event_id = %event.event_id, "event stored");
        Ok(event)
    }

    pub async fn get_asset(&self, asset_id: &str) -> Result<Option<Asset>> {
        Ok(self.repository.get_asset(asset_id).await?)
    }

    pub async fn get_event(&self, event_id: &str, access_level: u32) -> Result<Option<Event>> {
        Ok(self.repository.get_event(event_id, access_level).await?)
    }

    pub async fn find_assets(&self, params: &FindAssetsParams) -> Result<FindResult<Asset>> {
        Ok(self.repository.find_assets(params).await?)
    }

    pub async fn find_events(
        &self,
        params: &FindEventsParams,
        access_level: u32,
    ) -> Result<FindResult<Event>> {
        Ok(self.repository.find_events(params, access_level).await?)
    }

    pub async fn get_bundle(&self, bundle_id: &str) -> Result<Option<Bundle>> {
        Ok(self.repository.get_bundle(bundle_id).await?)
    }

    // ===== Bundling =====

    /// Claim free entities under this round's stub and assemble the bundle
    /// candidate from them.
    pub async fn initialise_bundling(
        &self,
        sequence_number: u64,
        items_count_limit: usize,
    ) -> Result<BundleCandidate> {
        let stub_id = self.bundle_stub_id(sequence_number);
        let (assets, events) = self
            .repository
            .begin_bundle(&stub_id, Some(items_count_limit))
            .await?;
        let bundle = assemble_bundle(&assets, &events, now_seconds(), &self.upload_secret)?;
        Ok(BundleCandidate { bundle, stub_id })
    }

    /// Commit a candidate: upload the proof on chain, then rename the claim
    /// to the real bundle id and stamp the proof metadata.
    ///
    /// A failed chain upload is recoverable: nothing is persisted, the stub
    /// claim survives, and the same sequence number retries next tick.
    /// Returns `None` in that case.
    pub async fn finalise_bundling(
        &self,
        candidate: &BundleCandidate,
        storage_periods: u32,
    ) -> Result<Option<Bundle>> {
        let bundle_id = &candidate.bundle.bundle_id;
        let receipt = match self
            .upload_repository
            .upload_bundle(bundle_id, storage_periods)
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(%bundle_id, %error, "bundle upload failed");
                return Ok(None);
            }
        };

        self.repository.store_bundle(&candidate.bundle).await?;
        self.repository.end_bundle(&candidate.stub_id, bundle_id).await?;
        self.repository
            .store_bundle_proof_metadata(bundle_id, receipt.block_number, &receipt.transaction_hash)
            .await?;

        info!(
            %bundle_id,
            block = receipt.block_number,
            tx = %receipt.transaction_hash,
            "bundle committed on chain"
        );
        self.get_bundle(bundle_id)
            .await?
            .ok_or_else(|| EngineError::Repository(repository::RepositoryError::Corrupted(
                format!("bundle {bundle_id} vanished after commit"),
            )))
            .map(Some)
    }

    /// Abort the current round and free its claim.
    pub async fn cancel_bundling(&self, sequence_number: u64) -> Result<()> {
        let stub_id = self.bundle_stub_id(sequence_number);
        self.repository.cancel_bundle(&stub_id).await?;
        Ok(())
    }

    /// Re-upload every stored bundle that has no proof on chain yet.
    ///
    /// Per-bundle failures are logged and skipped; the sweep returns the
    /// bundles whose proof landed.
    pub async fn upload_not_registered_bundles(
        &self,
        storage_periods: u32,
    ) -> Result<Vec<Bundle>> {
        let mut registered = Vec::new();
        for bundle in self.repository.find_bundles_without_upload_proof().await? {
            let bundle_id = bundle.bundle_id.clone();
            match self
                .upload_repository
                .upload_bundle(&bundle_id, storage_periods)
                .await
            {
                Ok(receipt) => {
                    self.repository
                        .store_bundle_proof_metadata(
                            &bundle_id,
                            receipt.block_number,
                            &receipt.transaction_hash,
                        )
                        .await?;
                    registered.push(bundle);
                }
                Err(error) => {
                    warn!(%bundle_id, %error, "re-upload of unregistered bundle failed");
                }
            }
        }
        Ok(registered)
    }

    /// Release claims left behind by earlier worker generations. Runs once
    /// at startup, before the upload worker takes its first tick.
    pub async fn release_stale_bundle_claims(&self) -> Result<u64> {
        let released = self.repository.release_stale_bundle_claims().await?;
        if released > 0 {
            info!(released, "released stale bundle claims");
        }
        Ok(released)
    }

    // ===== Sheltering =====

    /// Fetch a bundle from a peer shelterer, validate it, and store it.
    pub async fn download_bundle(&self, bundle_id: &str, shelterer_id: &str) -> Result<Bundle> {
        let node_url = self.registry.node_url(shelterer_id).await?;
        let document = self.downloader.fetch_bundle(&node_url, bundle_id).await?;
        let bundle = self.validator.validate_bundle(&document)?;
        if bundle.bundle_id != bundle_id {
            return Err(EngineError::BundleIdMismatch {
                expected: bundle_id.to_string(),
                actual: bundle.bundle_id,
            });
        }
        self.repository.store_bundle(&bundle).await?;
        debug!(%bundle_id, %shelterer_id, "bundle downloaded and stored");
        Ok(bundle)
    }

    /// Record the on-chain sheltering expiration on the stored bundle.
    pub async fn update_sheltering_expiration_date(&self, bundle_id: &str) -> Result<()> {
        let expires_at = self
            .challenges_repository
            .sheltering_expiration_date(bundle_id)
            .await?;
        self.repository
            .store_bundle_sheltering_expiration(bundle_id, expires_at)
            .await?;
        Ok(())
    }

    /// Stub ids are worker-local: the node address scopes them to this node,
    /// the boot time guarantees a restart never reuses one.
    fn bundle_stub_id(&self, sequence_number: u64) -> String {
        format!(
            "{BUNDLE_STUB_PREFIX}{}:{}:{}",
            self.node_address, self.boot_time, sequence_number
        )
    }
}

pub(crate) fn now_seconds() -> u64 {
    let now = chrono::Utc::now().timestamp();
    u64::try_from(now).unwrap_or(0)
}
