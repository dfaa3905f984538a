use std::sync::Arc;

use serde_json::json;

use docstore::MemoryCollection;
use engine::{DataModelEngine, StaticBundleSource};
use entities::builder::assemble_bundle;
use entities::fixtures::{
    signed_asset_value, signed_event, signed_event_value, test_address, TEST_SECRET,
};
use entities::{EntityValidator, ValidationError, DEFAULT_TIMESTAMP_LIMIT_SECS};
use registry::MemoryRegistry;
use repository::{ChallengesRepository, EntityRepository, UploadRepository};

const SHELTERER: &str = "0x00000000000000000000000000000000000000aa";

struct TestNode {
    engine: DataModelEngine,
    repository: Arc<EntityRepository>,
    registry: Arc<MemoryRegistry>,
    downloader: Arc<StaticBundleSource>,
}

fn test_node() -> TestNode {
    let repository = Arc::new(EntityRepository::new(
        Arc::new(MemoryCollection::new("assetId")),
        Arc::new(MemoryCollection::new("eventId")),
        Arc::new(MemoryCollection::new("bundleId")),
    ));
    let registry = Arc::new(MemoryRegistry::new(test_address()));
    let downloader = Arc::new(StaticBundleSource::new());
    let engine = DataModelEngine::new(
        EntityValidator::new(DEFAULT_TIMESTAMP_LIMIT_SECS),
        repository.clone(),
        Arc::new(UploadRepository::new(registry.clone())),
        Arc::new(ChallengesRepository::new(registry.clone())),
        registry.clone(),
        downloader.clone(),
        TEST_SECRET.to_string(),
    )
    .unwrap();
    TestNode {
        engine,
        repository,
        registry,
        downloader,
    }
}

fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

#[tokio::test]
async fn asset_ingress_round_trip() {
    let node = test_node();
    let value = signed_asset_value(TEST_SECRET, now(), 0);
    let stored = node.engine.add_asset(&value).await.unwrap();

    let fetched = node.engine.get_asset(&stored.asset_id).await.unwrap().unwrap();
    assert_eq!(fetched, stored);
    assert!(node.engine.get_asset("0x33333").await.unwrap().is_none());
}

#[tokio::test]
async fn tampered_asset_is_rejected_and_not_stored() {
    let node = test_node();
    let mut value = signed_asset_value(TEST_SECRET, now(), 0);
    value["content"]["idData"]["sequenceNumber"] = json!(99);
    let asset_id = value["assetId"].as_str().unwrap().to_string();

    let err = node.engine.add_asset(&value).await.unwrap_err();
    assert!(matches!(
        err,
        engine::EngineError::Validation(ValidationError::HashMismatch { .. })
    ));
    assert!(node.engine.get_asset(&asset_id).await.unwrap().is_none());
}

#[tokio::test]
async fn event_ingress_stamps_the_upload_timestamp() {
    let node = test_node();
    let asset = node
        .engine
        .add_asset(&signed_asset_value(TEST_SECRET, now(), 0))
        .await
        .unwrap();
    let value = signed_event_value(
        TEST_SECRET,
        &asset.asset_id,
        now(),
        0,
        vec![json!({"type": "custom"})],
    );
    let stored = node.engine.add_event(&value).await.unwrap();

    let upload_ts = stored.metadata.entity_upload_timestamp.unwrap();
    assert!(now() - upload_ts < 5);
    let fetched = node.engine.get_event(&stored.event_id, 0).await.unwrap().unwrap();
    assert_eq!(fetched.metadata.entity_upload_timestamp, Some(upload_ts));
}

#[tokio::test]
async fn bundling_lifecycle_commits_and_stamps_everything() {
    let node = test_node();
    let asset = node
        .engine
        .add_asset(&signed_asset_value(TEST_SECRET, now(), 0))
        .await
        .unwrap();
    let public = node
        .engine
        .add_event(&signed_event_value(
            TEST_SECRET,
            &asset.asset_id,
            now(),
            0,
            vec![json!({"type": "custom"})],
        ))
        .await
        .unwrap();
    let restricted = node
        .engine
        .add_event(&signed_event_value(
            TEST_SECRET,
            &asset.asset_id,
            now(),
            3,
            vec![json!({"type": "custom"})],
        ))
        .await
        .unwrap();

    let candidate = node.engine.initialise_bundling(0, 10).await.unwrap();
    assert_eq!(candidate.entry_count(), 3);

    // Restricted events enter the bundle without their data.
    let restricted_entry = candidate
        .bundle
        .content
        .entries
        .iter()
        .find(|e| e["eventId"] == json!(restricted.event_id.clone()))
        .unwrap();
    assert!(restricted_entry["content"].get("data").is_none());
    let public_entry = candidate
        .bundle
        .content
        .entries
        .iter()
        .find(|e| e["eventId"] == json!(public.event_id.clone()))
        .unwrap();
    assert!(public_entry["content"].get("data").is_some());

    let committed = node.engine.finalise_bundling(&candidate, 2).await.unwrap().unwrap();
    assert!(committed.metadata.proof_block.is_some());
    let tx = committed.metadata.bundle_transaction_hash.clone().unwrap();

    let stored_asset = node.engine.get_asset(&asset.asset_id).await.unwrap().unwrap();
    assert_eq!(stored_asset.metadata.bundle_id.as_deref(), Some(committed.bundle_id.as_str()));
    assert_eq!(stored_asset.metadata.bundle_transaction_hash.as_deref(), Some(tx.as_str()));

    assert!(node.registry.uploaded_proof(&committed.bundle_id).await.is_some());

    // Everything is bundled; the next round claims nothing.
    let next = node.engine.initialise_bundling(1, 10).await.unwrap();
    assert_eq!(next.entry_count(), 0);
}

#[tokio::test]
async fn failed_upload_keeps_the_claim_and_the_next_round_retries() {
    let node = test_node();
    let asset = node
        .engine
        .add_asset(&signed_asset_value(TEST_SECRET, now(), 0))
        .await
        .unwrap();

    node.registry.fail_next_uploads(1).await;
    let candidate = node.engine.initialise_bundling(0, 10).await.unwrap();
    let result = node.engine.finalise_bundling(&candidate, 2).await.unwrap();
    assert!(result.is_none());

    // Nothing was persisted, the claim survives under the stub.
    assert!(node.engine.get_bundle(&candidate.bundle.bundle_id).await.unwrap().is_none());
    let claimed = node.engine.get_asset(&asset.asset_id).await.unwrap().unwrap();
    assert!(claimed.metadata.bundle_id.unwrap().starts_with("bundle_stub:"));

    // The same sequence number re-claims the same entities.
    let retry = node.engine.initialise_bundling(0, 10).await.unwrap();
    assert_eq!(retry.entry_count(), 1);
    let committed = node.engine.finalise_bundling(&retry, 2).await.unwrap();
    assert!(committed.is_some());
}

#[tokio::test]
async fn cancelled_bundling_frees_the_entities() {
    let node = test_node();
    node.engine
        .add_asset(&signed_asset_value(TEST_SECRET, now(), 0))
        .await
        .unwrap();

    let candidate = node.engine.initialise_bundling(0, 10).await.unwrap();
    assert_eq!(candidate.entry_count(), 1);
    node.engine.cancel_bundling(0).await.unwrap();

    let next = node.engine.initialise_bundling(1, 10).await.unwrap();
    assert_eq!(next.entry_count(), 1);
}

#[tokio::test]
async fn sweep_re_uploads_unregistered_bundles() {
    let node = test_node();
    // A bundle stored without proof metadata, as a crash between commit and
    // proof stamping would leave it.
    let orphan = assemble_bundle(&[], &[signed_event(TEST_SECRET, "0xa", now(), 0, vec![json!({"type": "t"})])], now(), TEST_SECRET).unwrap();
    node.repository.store_bundle(&orphan).await.unwrap();

    let registered = node.engine.upload_not_registered_bundles(2).await.unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].bundle_id, orphan.bundle_id);

    let proved = node.engine.get_bundle(&orphan.bundle_id).await.unwrap().unwrap();
    assert!(proved.metadata.bundle_transaction_hash.is_some());

    // A second sweep finds nothing left.
    let registered = node.engine.upload_not_registered_bundles(2).await.unwrap();
    assert!(registered.is_empty());
}

#[tokio::test]
async fn sweep_skips_bundles_the_chain_rejects() {
    let node = test_node();
    let orphan = assemble_bundle(&[], &[], now(), TEST_SECRET).unwrap();
    node.repository.store_bundle(&orphan).await.unwrap();

    node.registry.fail_next_uploads(1).await;
    let registered = node.engine.upload_not_registered_bundles(2).await.unwrap();
    assert!(registered.is_empty());

    // Still discoverable for the next window.
    let registered = node.engine.upload_not_registered_bundles(2).await.unwrap();
    assert_eq!(registered.len(), 1);
}

#[tokio::test]
async fn download_bundle_validates_and_stores() {
    let node = test_node();
    let bundle = assemble_bundle(
        &[],
        &[signed_event(TEST_SECRET, "0xa", now(), 1, vec![json!({"type": "t"})])],
        now(),
        TEST_SECRET,
    )
    .unwrap();
    node.registry.register_node(SHELTERER, "https://peer.example").await;
    node.downloader
        .put_bundle(bundle.bundle_id.clone(), serde_json::to_value(&bundle).unwrap())
        .await;

    let downloaded = node.engine.download_bundle(&bundle.bundle_id, SHELTERER).await.unwrap();
    assert_eq!(downloaded.bundle_id, bundle.bundle_id);
    assert!(node.engine.get_bundle(&bundle.bundle_id).await.unwrap().is_some());
}

#[tokio::test]
async fn download_bundle_rejects_tampered_documents() {
    let node = test_node();
    let bundle = assemble_bundle(&[], &[], now(), TEST_SECRET).unwrap();
    let mut document = serde_json::to_value(&bundle).unwrap();
    document["content"]["idData"]["timestamp"] = json!(0);

    node.registry.register_node(SHELTERER, "https://peer.example").await;
    node.downloader.put_bundle(bundle.bundle_id.clone(), document).await;

    let err = node.engine.download_bundle(&bundle.bundle_id, SHELTERER).await.unwrap_err();
    assert!(matches!(
        err,
        engine::EngineError::Validation(ValidationError::HashMismatch { .. })
    ));
    assert!(node.engine.get_bundle(&bundle.bundle_id).await.unwrap().is_none());
}

#[tokio::test]
async fn download_bundle_rejects_a_valid_bundle_served_under_the_wrong_id() {
    let node = test_node();
    let bundle = assemble_bundle(&[], &[], now(), TEST_SECRET).unwrap();
    let wanted = format!("0x{}", "ab".repeat(32));
    node.registry.register_node(SHELTERER, "https://peer.example").await;
    node.downloader
        .put_bundle(wanted.clone(), serde_json::to_value(&bundle).unwrap())
        .await;

    let err = node.engine.download_bundle(&wanted, SHELTERER).await.unwrap_err();
    assert!(matches!(err, engine::EngineError::BundleIdMismatch { .. }));
}

#[tokio::test]
async fn download_from_unknown_shelterer_fails() {
    let node = test_node();
    let err = node.engine.download_bundle("0xb1", SHELTERER).await.unwrap_err();
    assert!(matches!(err, engine::EngineError::Registry(_)));
}

#[tokio::test]
async fn sheltering_expiration_is_read_from_chain_and_stored() {
    let node = test_node();
    let bundle = assemble_bundle(&[], &[], now(), TEST_SECRET).unwrap();
    node.repository.store_bundle(&bundle).await.unwrap();
    node.registry
        .set_sheltering_expiration(bundle.bundle_id.clone(), 123_456)
        .await;

    node.engine
        .update_sheltering_expiration_date(&bundle.bundle_id)
        .await
        .unwrap();
    let stored = node.engine.get_bundle(&bundle.bundle_id).await.unwrap().unwrap();
    assert_eq!(stored.metadata.sheltering_expiration_date, Some(123_456));
}

#[tokio::test]
async fn stale_claims_from_previous_boots_are_released() {
    let node = test_node();
    let asset = node
        .engine
        .add_asset(&signed_asset_value(TEST_SECRET, now(), 0))
        .await
        .unwrap();
    node.engine.initialise_bundling(0, 10).await.unwrap();

    let released = node.engine.release_stale_bundle_claims().await.unwrap();
    assert_eq!(released, 1);
    let freed = node.engine.get_asset(&asset.asset_id).await.unwrap().unwrap();
    assert_eq!(freed.metadata.bundle_id, None);
}
