use serde::{Deserialize, Serialize};

/// Chain synchronization state as reported by the registry client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    InSync,
    Syncing { current_block: u64, highest_block: u64 },
}

impl SyncStatus {
    /// A node is usable once the client stops reporting sync progress or
    /// reports having caught up.
    pub fn is_synced(&self) -> bool {
        match self {
            SyncStatus::InSync => true,
            SyncStatus::Syncing {
                current_block,
                highest_block,
            } => current_block >= highest_block,
        }
    }
}

/// An open shelter challenge observed on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub challenge_id: String,
    pub shelterer_id: String,
    pub bundle_id: String,
    /// Number of shelterer slots still open on this challenge.
    pub count: u32,
}

/// Result of committing a bundle proof on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub block_number: u64,
    pub transaction_hash: String,
}
