//! Bundle retrieval from peer shelterers.
//!
//! The transport is a seam: the engine only needs "give me the bundle
//! document this node serves". The static source backs tests and local
//! runs; an HTTP client implements the same trait in a full deployment.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Bundle {bundle_id} is not available from {node_url}")]
    NotAvailable { node_url: String, bundle_id: String },

    #[error("Bundle download failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait BundleDownloader: Send + Sync {
    /// Fetch the raw bundle document a peer serves under the given id.
    async fn fetch_bundle(
        &self,
        node_url: &str,
        bundle_id: &str,
    ) -> std::result::Result<Value, DownloadError>;
}

/// In-memory bundle source keyed by bundle id.
#[derive(Default)]
pub struct StaticBundleSource {
    bundles: RwLock<HashMap<String, Value>>,
}

impl StaticBundleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_bundle(&self, bundle_id: impl Into<String>, document: Value) {
        self.bundles.write().await.insert(bundle_id.into(), document);
    }
}

#[async_trait]
impl BundleDownloader for StaticBundleSource {
    async fn fetch_bundle(
        &self,
        node_url: &str,
        bundle_id: &str,
    ) -> std::result::Result<Value, DownloadError> {
        self.bundles
            .read()
            .await
            .get(bundle_id)
            .cloned()
            .ok_or_else(|| DownloadError::NotAvailable {
                node_url: node_url.to_string(),
                bundle_id: bundle_id.to_string(),
            })
    }
}
