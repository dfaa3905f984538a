//! Thin adapter over the registry for bundle uploads and funding checks.

use std::sync::Arc;

use tracing::debug;

use registry::{Registry, UploadReceipt};

use crate::error::Result;

pub struct UploadRepository {
    registry: Arc<dyn Registry>,
}

impl UploadRepository {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Whether the node account can pay for one more upload at the given
    /// sheltering duration.
    pub async fn check_if_enough_funds_for_upload(&self, storage_periods: u32) -> Result<bool> {
        let fee = self.registry.upload_fee(storage_periods).await?;
        let balance = self.registry.balance().await?;
        debug!(fee, balance, "upload funding check");
        Ok(balance >= fee)
    }

    /// Commit a bundle proof on chain.
    pub async fn upload_bundle(
        &self,
        bundle_id: &str,
        storage_periods: u32,
    ) -> Result<UploadReceipt> {
        Ok(self
            .registry
            .store_bundle_proof(bundle_id, storage_periods)
            .await?)
    }

    /// On-chain limit on entities per bundle.
    pub async fn bundle_items_count_limit(&self) -> Result<usize> {
        Ok(self.registry.bundle_items_count_limit().await?)
    }
}
