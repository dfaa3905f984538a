//! On-chain registry abstraction.
//!
//! The `Registry` trait is the single seam between the node and the
//! blockchain: funding and fee queries, bundle-proof commitment, the shelter
//! challenge feed, and node lookups all go through it. The in-memory
//! implementation in [`memory`] backs local runs and tests; a real chain
//! client implements the same trait over RPC.

use async_trait::async_trait;

pub mod error;
pub mod memory;
pub mod sync;
pub mod types;

pub use error::{RegistryError, Result};
pub use memory::MemoryRegistry;
pub use sync::wait_for_chain_sync;
pub use types::{Challenge, SyncStatus, UploadReceipt};

#[async_trait]
pub trait Registry: Send + Sync {
    /// The address this node is registered under.
    fn node_address(&self) -> String;

    /// Current chain synchronization state.
    async fn is_syncing(&self) -> Result<SyncStatus>;

    /// Balance of the node account, in wei.
    async fn balance(&self) -> Result<u128>;

    /// Fee for uploading one bundle sheltered for the given number of
    /// storage periods, in wei.
    async fn upload_fee(&self, storage_periods: u32) -> Result<u128>;

    /// On-chain limit on the number of entities per bundle.
    async fn bundle_items_count_limit(&self) -> Result<usize>;

    /// Commit a bundle proof on chain, paying the upload fee.
    async fn store_bundle_proof(
        &self,
        bundle_id: &str,
        storage_periods: u32,
    ) -> Result<UploadReceipt>;

    /// Open challenges, in the order the registry reports them.
    async fn ongoing_challenges(&self) -> Result<Vec<Challenge>>;

    /// Resolve a challenge this node can serve. Returns the transaction
    /// hash of the resolution.
    async fn resolve_challenge(&self, challenge_id: &str) -> Result<String>;

    /// The on-chain sheltering expiration for a bundle, in seconds.
    async fn sheltering_expiration_date(&self, bundle_id: &str) -> Result<u64>;

    /// Resolve the URL a registered node serves bundles from.
    async fn node_url(&self, address: &str) -> Result<String>;
}
