//! The canonical entity shapes: assets, events, bundles.
//!
//! Entities are JSON documents on the wire and in storage; these structs are
//! their typed form. `deny_unknown_fields` enforces the closed shape at
//! every level, and all server-side metadata is optional so an entity
//! serializes back to exactly what was ingested plus whatever the lifecycle
//! has stamped on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Asset {
    pub asset_id: String,
    pub content: AssetContent,
    #[serde(default)]
    pub metadata: AssetMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetContent {
    pub id_data: AssetIdData,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetIdData {
    pub created_by: String,
    pub timestamp: u64,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssetMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Event {
    pub event_id: String,
    pub content: EventContent,
    #[serde(default)]
    pub metadata: EventMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventContent {
    pub id_data: EventIdData,
    /// Absent on events redacted for publication or for a low-access read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventIdData {
    pub asset_id: String,
    pub created_by: String,
    pub timestamp: u64,
    pub data_hash: String,
    pub access_level: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_upload_timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Bundle {
    pub bundle_id: String,
    pub content: BundleContent,
    #[serde(default)]
    pub metadata: BundleMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleContent {
    pub id_data: BundleIdData,
    pub signature: String,
    /// Assets and publication-redacted events, deduplicated by id.
    pub entries: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleIdData {
    pub created_by: String,
    pub timestamp: u64,
    pub entries_hash: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheltering_expiration_date: Option<u64>,
}

/// Entities that carry bundling metadata. The bundling lifecycle treats
/// assets and events uniformly through this.
pub trait BundleMember: Clone {
    fn entity_id(&self) -> &str;
    fn bundle_id(&self) -> Option<&str>;
    fn set_bundle_id(&mut self, bundle_id: Option<String>);
}

impl BundleMember for Asset {
    fn entity_id(&self) -> &str {
        &self.asset_id
    }

    fn bundle_id(&self) -> Option<&str> {
        self.metadata.bundle_id.as_deref()
    }

    fn set_bundle_id(&mut self, bundle_id: Option<String>) {
        self.metadata.bundle_id = bundle_id;
    }
}

impl BundleMember for Event {
    fn entity_id(&self) -> &str {
        &self.event_id
    }

    fn bundle_id(&self) -> Option<&str> {
        self.metadata.bundle_id.as_deref()
    }

    fn set_bundle_id(&mut self, bundle_id: Option<String>) {
        self.metadata.bundle_id = bundle_id;
    }
}
