//! In-memory registry.
//!
//! Backs local single-node runs and every test that would otherwise need a
//! chain. State is scriptable: balances, fees, the challenge feed, sync
//! progress, and upload failures can all be staged from the outside.

use std::collections::{HashMap, VecDeque};

use tokio::sync::Mutex;

use crate::error::{RegistryError, Result};
use crate::types::{Challenge, SyncStatus, UploadReceipt};
use crate::Registry;

use async_trait::async_trait;

const DEFAULT_BALANCE: u128 = 1_000_000_000_000_000_000; // 1 ether
const DEFAULT_FEE_PER_STORAGE_PERIOD: u128 = 10_000_000_000_000_000; // 0.01 ether
const DEFAULT_BUNDLE_ITEMS_COUNT_LIMIT: usize = 1000;
const DEFAULT_SHELTERING_PERIOD_SECS: u64 = 13 * 7 * 24 * 60 * 60; // 13 weeks

#[derive(Debug, Default)]
struct MemoryRegistryState {
    balance: u128,
    fee_per_storage_period: u128,
    bundle_items_count_limit: usize,
    challenges: Vec<Challenge>,
    resolved_challenges: Vec<String>,
    uploaded_proofs: HashMap<String, UploadReceipt>,
    sync_plan: VecDeque<SyncStatus>,
    sync_polls: u64,
    node_urls: HashMap<String, String>,
    sheltering_expirations: HashMap<String, u64>,
    pending_upload_failures: u32,
    current_block: u64,
    transaction_counter: u64,
}

pub struct MemoryRegistry {
    node_address: String,
    state: Mutex<MemoryRegistryState>,
}

impl MemoryRegistry {
    pub fn new(node_address: impl Into<String>) -> Self {
        Self {
            node_address: node_address.into(),
            state: Mutex::new(MemoryRegistryState {
                balance: DEFAULT_BALANCE,
                fee_per_storage_period: DEFAULT_FEE_PER_STORAGE_PERIOD,
                bundle_items_count_limit: DEFAULT_BUNDLE_ITEMS_COUNT_LIMIT,
                ..MemoryRegistryState::default()
            }),
        }
    }

    pub async fn set_balance(&self, balance: u128) {
        self.state.lock().await.balance = balance;
    }

    pub async fn set_fee_per_storage_period(&self, fee: u128) {
        self.state.lock().await.fee_per_storage_period = fee;
    }

    pub async fn set_bundle_items_count_limit(&self, limit: usize) {
        self.state.lock().await.bundle_items_count_limit = limit;
    }

    /// Append a challenge to the ongoing feed.
    pub async fn add_challenge(&self, challenge: Challenge) {
        self.state.lock().await.challenges.push(challenge);
    }

    /// Register a node URL for shelterer lookups.
    pub async fn register_node(&self, address: impl Into<String>, url: impl Into<String>) {
        self.state
            .lock()
            .await
            .node_urls
            .insert(address.into(), url.into());
    }

    pub async fn set_sheltering_expiration(&self, bundle_id: impl Into<String>, expires_at: u64) {
        self.state
            .lock()
            .await
            .sheltering_expirations
            .insert(bundle_id.into(), expires_at);
    }

    /// Queue a sync status for the next `is_syncing` poll. Once the queue is
    /// drained the registry reports in-sync.
    pub async fn push_sync_status(&self, status: SyncStatus) {
        self.state.lock().await.sync_plan.push_back(status);
    }

    /// Make the next `count` proof uploads fail.
    pub async fn fail_next_uploads(&self, count: u32) {
        self.state.lock().await.pending_upload_failures = count;
    }

    pub async fn sync_poll_count(&self) -> u64 {
        self.state.lock().await.sync_polls
    }

    pub async fn resolved_challenges(&self) -> Vec<String> {
        self.state.lock().await.resolved_challenges.clone()
    }

    pub async fn uploaded_proof(&self, bundle_id: &str) -> Option<UploadReceipt> {
        self.state.lock().await.uploaded_proofs.get(bundle_id).cloned()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    fn node_address(&self) -> String {
        self.node_address.clone()
    }

    async fn is_syncing(&self) -> Result<SyncStatus> {
        let mut state = self.state.lock().await;
        state.sync_polls += 1;
        Ok(state.sync_plan.pop_front().unwrap_or(SyncStatus::InSync))
    }

    async fn balance(&self) -> Result<u128> {
        Ok(self.state.lock().await.balance)
    }

    async fn upload_fee(&self, storage_periods: u32) -> Result<u128> {
        let state = self.state.lock().await;
        Ok(state.fee_per_storage_period * u128::from(storage_periods))
    }

    async fn bundle_items_count_limit(&self) -> Result<usize> {
        Ok(self.state.lock().await.bundle_items_count_limit)
    }

    async fn store_bundle_proof(
        &self,
        bundle_id: &str,
        storage_periods: u32,
    ) -> Result<UploadReceipt> {
        let mut state = self.state.lock().await;
        if state.pending_upload_failures > 0 {
            state.pending_upload_failures -= 1;
            return Err(RegistryError::UploadRejected(
                "staged upload failure".to_string(),
            ));
        }
        let fee = state.fee_per_storage_period * u128::from(storage_periods);
        if state.balance < fee {
            return Err(RegistryError::UploadRejected(format!(
                "insufficient funds: fee {fee}, balance {}",
                state.balance
            )));
        }
        state.balance -= fee;
        state.current_block += 1;
        state.transaction_counter += 1;
        let receipt = UploadReceipt {
            block_number: state.current_block,
            transaction_hash: format!("0x{:064x}", state.transaction_counter),
        };
        state
            .uploaded_proofs
            .insert(bundle_id.to_string(), receipt.clone());
        Ok(receipt)
    }

    async fn ongoing_challenges(&self) -> Result<Vec<Challenge>> {
        Ok(self.state.lock().await.challenges.clone())
    }

    async fn resolve_challenge(&self, challenge_id: &str) -> Result<String> {
        let mut state = self.state.lock().await;
        let position = state
            .challenges
            .iter()
            .position(|c| c.challenge_id == challenge_id)
            .ok_or_else(|| RegistryError::UnknownChallenge(challenge_id.to_string()))?;
        state.challenges.remove(position);
        state.resolved_challenges.push(challenge_id.to_string());
        state.transaction_counter += 1;
        Ok(format!("0x{:064x}", state.transaction_counter))
    }

    async fn sheltering_expiration_date(&self, bundle_id: &str) -> Result<u64> {
        let state = self.state.lock().await;
        Ok(state
            .sheltering_expirations
            .get(bundle_id)
            .copied()
            .unwrap_or(DEFAULT_SHELTERING_PERIOD_SECS))
    }

    async fn node_url(&self, address: &str) -> Result<String> {
        self.state
            .lock()
            .await
            .node_urls
            .get(address)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownNode(address.to_string()))
    }
}
