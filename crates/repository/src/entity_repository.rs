//! Durable entity storage and the bundling state machine.
//!
//! Entities are persisted verbatim as JSON documents across three
//! collections. Reads apply access-level redaction; the begin/end bundle
//! transition claims entities through a filter-conditioned bulk update, so
//! concurrent claims with different stub ids always observe disjoint sets.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use docstore::{Collection, Query};
use entities::builder::strip_data_if_restricted;
use entities::{Asset, Bundle, Event, FindAssetsParams, FindEventsParams};

use crate::error::{RepositoryError, Result};
use crate::query::{assemble_assets_query, assemble_events_query};

/// Stub ids carry this prefix so in-progress claims are recognizable and
/// can never collide with a real (hex) bundle id.
pub const BUNDLE_STUB_PREFIX: &str = "bundle_stub:";

const BUNDLE_ID_PATH: &str = "metadata.bundleId";

/// A page of find results plus the unpaginated match count.
#[derive(Debug, Clone)]
pub struct FindResult<T> {
    pub results: Vec<T>,
    pub result_count: u64,
}

pub struct EntityRepository {
    assets: Arc<dyn Collection>,
    events: Arc<dyn Collection>,
    bundles: Arc<dyn Collection>,
}

impl EntityRepository {
    pub fn new(
        assets: Arc<dyn Collection>,
        events: Arc<dyn Collection>,
        bundles: Arc<dyn Collection>,
    ) -> Self {
        Self {
            assets,
            events,
            bundles,
        }
    }

    pub async fn store_asset(&self, asset: &Asset) -> Result<()> {
        self.assets.insert(to_document(asset)?).await?;
        Ok(())
    }

    pub async fn get_asset(&self, asset_id: &str) -> Result<Option<Asset>> {
        match self.assets.find_by_id(asset_id).await? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    pub async fn store_event(&self, event: &Event) -> Result<()> {
        self.events.insert(to_document(event)?).await?;
        Ok(())
    }

    /// Fetch an event, redacting its data when the reader's access level is
    /// below the event's.
    pub async fn get_event(&self, event_id: &str, access_level: u32) -> Result<Option<Event>> {
        match self.events.find_by_id(event_id).await? {
            Some(document) => {
                let event: Event = from_document(document)?;
                Ok(Some(strip_data_if_restricted(&event, access_level)))
            }
            None => Ok(None),
        }
    }

    /// Newest-first page of events matching the params, redacted per result.
    pub async fn find_events(
        &self,
        params: &FindEventsParams,
        access_level: u32,
    ) -> Result<FindResult<Event>> {
        let query = assemble_events_query(params, access_level);
        let result_count = self.events.count(&query.filter).await?;
        let mut results = Vec::new();
        for document in self.events.find(&query).await? {
            let event: Event = from_document(document)?;
            results.push(strip_data_if_restricted(&event, access_level));
        }
        Ok(FindResult {
            results,
            result_count,
        })
    }

    /// Newest-first page of assets matching the params.
    pub async fn find_assets(&self, params: &FindAssetsParams) -> Result<FindResult<Asset>> {
        let query = assemble_assets_query(params);
        let result_count = self.assets.count(&query.filter).await?;
        let mut results = Vec::new();
        for document in self.assets.find(&query).await? {
            results.push(from_document(document)?);
        }
        Ok(FindResult {
            results,
            result_count,
        })
    }

    pub async fn store_bundle(&self, bundle: &Bundle) -> Result<()> {
        self.bundles.insert(to_document(bundle)?).await?;
        Ok(())
    }

    pub async fn get_bundle(&self, bundle_id: &str) -> Result<Option<Bundle>> {
        match self.bundles.find_by_id(bundle_id).await? {
            Some(document) => Ok(Some(from_document(document)?)),
            None => Ok(None),
        }
    }

    /// Atomically claim currently-unbundled entities for an in-progress
    /// bundle and return them.
    ///
    /// The claim is a filtered update that sets `metadata.bundleId` only
    /// where it is currently unset; the returned set is the read-back of the
    /// update's postcondition, never a prior read. A concurrent call with a
    /// different stub observes no free entities. Re-running with the same
    /// stub also returns entities claimed by an earlier, unfinished round.
    pub async fn begin_bundle(
        &self,
        stub_id: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<Asset>, Vec<Event>)> {
        let free = json!({(BUNDLE_ID_PATH): null});
        let claim = json!({"$set": {(BUNDLE_ID_PATH): stub_id}});

        let claimed_assets = self.assets.update_many(&free, &claim, limit).await?;
        let remaining = limit.map(|max| max.saturating_sub(claimed_assets as usize));
        if remaining != Some(0) {
            self.events.update_many(&free, &claim, remaining).await?;
        }

        let claimed = Query::filter(json!({(BUNDLE_ID_PATH): stub_id}));
        let mut assets = Vec::new();
        for document in self.assets.find(&claimed).await? {
            assets.push(from_document(document)?);
        }
        let mut events = Vec::new();
        for document in self.events.find(&claimed).await? {
            events.push(from_document(document)?);
        }
        debug!(
            stub_id,
            assets = assets.len(),
            events = events.len(),
            "claimed entities for bundling"
        );
        Ok((assets, events))
    }

    /// Commit a claim: rewrite the stub id to the real bundle id on every
    /// claimed entity. Idempotent for a given `(stub_id, bundle_id)` pair.
    pub async fn end_bundle(&self, stub_id: &str, bundle_id: &str) -> Result<()> {
        let claimed = json!({(BUNDLE_ID_PATH): stub_id});
        let commit = json!({"$set": {(BUNDLE_ID_PATH): bundle_id}});
        self.assets.update_many(&claimed, &commit, None).await?;
        self.events.update_many(&claimed, &commit, None).await?;
        Ok(())
    }

    /// Release a claim from a cancelled bundling round.
    pub async fn cancel_bundle(&self, stub_id: &str) -> Result<()> {
        let claimed = json!({(BUNDLE_ID_PATH): stub_id});
        let release = json!({"$unset": {(BUNDLE_ID_PATH): ""}});
        self.assets.update_many(&claimed, &release, None).await?;
        self.events.update_many(&claimed, &release, None).await?;
        Ok(())
    }

    /// Free every entity still claimed by a stub, whatever worker generation
    /// left it behind. Runs once at startup, before any new claim exists.
    pub async fn release_stale_bundle_claims(&self) -> Result<u64> {
        let stale = json!({(BUNDLE_ID_PATH): {"$regex": format!("^{BUNDLE_STUB_PREFIX}")}});
        let release = json!({"$unset": {(BUNDLE_ID_PATH): ""}});
        let mut released = self.assets.update_many(&stale, &release, None).await?;
        released += self.events.update_many(&stale, &release, None).await?;
        Ok(released)
    }

    /// Stamp the on-chain proof on a bundle and propagate the transaction
    /// hash to every entity the bundle contains.
    pub async fn store_bundle_proof_metadata(
        &self,
        bundle_id: &str,
        proof_block: u64,
        transaction_hash: &str,
    ) -> Result<()> {
        self.bundles
            .update_many(
                &json!({"bundleId": bundle_id}),
                &json!({"$set": {
                    "metadata.proofBlock": proof_block,
                    "metadata.bundleTransactionHash": transaction_hash,
                }}),
                None,
            )
            .await?;

        let members = json!({(BUNDLE_ID_PATH): bundle_id});
        let stamp = json!({"$set": {"metadata.bundleTransactionHash": transaction_hash}});
        self.assets.update_many(&members, &stamp, None).await?;
        self.events.update_many(&members, &stamp, None).await?;
        Ok(())
    }

    pub async fn store_bundle_sheltering_expiration(
        &self,
        bundle_id: &str,
        expires_at: u64,
    ) -> Result<()> {
        self.bundles
            .update_many(
                &json!({"bundleId": bundle_id}),
                &json!({"$set": {"metadata.shelteringExpirationDate": expires_at}}),
                None,
            )
            .await?;
        Ok(())
    }

    /// Bundles stored locally that never made it on chain, oldest first.
    pub async fn find_bundles_without_upload_proof(&self) -> Result<Vec<Bundle>> {
        let query = Query::filter(json!({"metadata.bundleTransactionHash": null}))
            .sort_asc("content.idData.timestamp");
        let mut bundles = Vec::new();
        for document in self.bundles.find(&query).await? {
            bundles.push(from_document(document)?);
        }
        Ok(bundles)
    }
}

fn to_document<T: Serialize>(entity: &T) -> Result<Value> {
    serde_json::to_value(entity).map_err(|e| RepositoryError::Corrupted(e.to_string()))
}

fn from_document<T: DeserializeOwned>(document: Value) -> Result<T> {
    serde_json::from_value(document).map_err(|e| RepositoryError::Corrupted(e.to_string()))
}
