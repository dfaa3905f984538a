//! Entity construction and transformation.
//!
//! Pure functions over the entity shapes: bundling metadata edits, upload
//! timestamping, access-level redaction, and bundle assembly. Redaction has
//! exactly one implementation here and is used both when publishing a bundle
//! and when serving an event to a reader.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::types::{Asset, Bundle, BundleContent, BundleIdData, BundleMember, Event};

/// Copy of an entity with `metadata.bundleId` set.
pub fn set_bundle<E: BundleMember>(entity: &E, bundle_id: &str) -> E {
    let mut entity = entity.clone();
    entity.set_bundle_id(Some(bundle_id.to_string()));
    entity
}

/// Copy of an entity with `metadata.bundleId` stripped. Inverse of
/// [`set_bundle`]; all other metadata is preserved.
pub fn remove_bundle<E: BundleMember>(entity: &E) -> E {
    let mut entity = entity.clone();
    entity.set_bundle_id(None);
    entity
}

/// Copy of an event stamped with the current ingress time, in seconds.
pub fn stamp_upload_timestamp(event: &Event) -> Event {
    let mut event = event.clone();
    event.metadata.entity_upload_timestamp = Some(now_seconds());
    event
}

/// The one redaction predicate: an event discloses its data only to readers
/// at or above its access level.
pub fn strip_data_if_restricted(event: &Event, access_level: u32) -> Event {
    let mut event = event.clone();
    if event.content.id_data.access_level > access_level {
        event.content.data = None;
    }
    event
}

/// Redaction as applied when an event enters a published bundle: everything
/// above access level zero loses its data.
pub fn prepare_event_for_bundle_publication(event: &Event) -> Event {
    strip_data_if_restricted(event, 0)
}

/// Compose and sign a bundle from claimed entities.
///
/// Entities enter the bundle without their `bundleId` claim, events are
/// redacted for publication, and duplicates (by id) are dropped. The bundle
/// id is the hash of the signed content.
pub fn assemble_bundle(
    assets: &[Asset],
    events: &[Event],
    timestamp: u64,
    secret: &str,
) -> Result<Bundle> {
    let mut entries: Vec<Value> = Vec::with_capacity(assets.len() + events.len());
    let mut seen_ids: Vec<String> = Vec::new();

    for asset in assets {
        if seen_ids.iter().any(|id| id == &asset.asset_id) {
            continue;
        }
        seen_ids.push(asset.asset_id.clone());
        entries.push(entity_value(&remove_bundle(asset))?);
    }
    for event in events {
        if seen_ids.iter().any(|id| id == &event.event_id) {
            continue;
        }
        seen_ids.push(event.event_id.clone());
        let published = prepare_event_for_bundle_publication(&remove_bundle(event));
        entries.push(entity_value(&published)?);
    }

    let entries_hash = identity::calculate_hash(&Value::Array(entries.clone()));
    let id_data = BundleIdData {
        created_by: identity::address_from_secret(secret)?,
        timestamp,
        entries_hash,
    };
    let signature = identity::sign(secret, &entity_value(&id_data)?)?;
    let content = BundleContent {
        id_data,
        signature,
        entries,
    };
    let bundle_id = identity::calculate_hash(&entity_value(&content)?);

    Ok(Bundle {
        bundle_id,
        content,
        metadata: Default::default(),
    })
}

pub(crate) fn entity_value<T: Serialize>(entity: &T) -> Result<Value> {
    serde_json::to_value(entity).map_err(|e| ValidationError::Shape(e.to_string()))
}

pub(crate) fn now_seconds() -> u64 {
    let now = chrono::Utc::now().timestamp();
    u64::try_from(now).unwrap_or(0)
}
