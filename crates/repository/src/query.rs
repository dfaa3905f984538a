//! Event and asset query assembly.
//!
//! Queries are built as an ordered `$and` conjunction. The order is fixed:
//! access level first, then data predicates, then the geospatial predicate,
//! then assetId, createdBy, fromTimestamp, toTimestamp. Query plans and the
//! golden tests over the composed filter both depend on it staying stable.

use serde_json::{json, Map, Value};

use docstore::Query;
use entities::{FindAssetsParams, FindEventsParams};

const TIMESTAMP_PATH: &str = "content.idData.timestamp";

/// Prepend the access-level conjunct unless it is already present.
///
/// Idempotent: applying it a second time with the same level is a no-op.
pub fn add_access_level_conjunct(conjuncts: &mut Vec<Value>, access_level: u32) {
    let conjunct = json!({"content.idData.accessLevel": {"$lte": access_level}});
    if !conjuncts.contains(&conjunct) {
        conjuncts.insert(0, conjunct);
    }
}

/// Translate validated event find-params into a document-store query.
pub fn assemble_events_query(params: &FindEventsParams, access_level: u32) -> Query {
    let mut conjuncts: Vec<Value> = Vec::new();
    add_access_level_conjunct(&mut conjuncts, access_level);

    for (key, value) in &params.data {
        let mut element = Map::new();
        element.insert(key.clone(), value.clone());
        conjuncts.push(json!({"content.data": {"$elemMatch": Value::Object(element)}}));
    }
    if let Some(geo) = &params.geo {
        conjuncts.push(json!({"content.data.geoJson": {"$near": {
            "$geometry": {"type": "Point", "coordinates": [geo.longitude, geo.latitude]},
            "$maxDistance": geo.max_distance,
        }}}));
    }
    if let Some(asset_id) = &params.asset_id {
        conjuncts.push(json!({"content.idData.assetId": asset_id}));
    }
    if let Some(created_by) = &params.created_by {
        conjuncts.push(json!({"content.idData.createdBy": created_by}));
    }
    if let Some(from) = params.from_timestamp {
        conjuncts.push(json!({(TIMESTAMP_PATH): {"$gte": from}}));
    }
    if let Some(to) = params.to_timestamp {
        conjuncts.push(json!({(TIMESTAMP_PATH): {"$lte": to}}));
    }

    Query::filter(json!({"$and": conjuncts}))
        .sort_desc(TIMESTAMP_PATH)
        .skip((params.page * params.per_page) as usize)
        .limit(params.per_page as usize)
}

/// Translate validated asset find-params into a document-store query.
pub fn assemble_assets_query(params: &FindAssetsParams) -> Query {
    let mut conjuncts: Vec<Value> = Vec::new();
    if let Some(created_by) = &params.created_by {
        conjuncts.push(json!({"content.idData.createdBy": created_by}));
    }
    if let Some(from) = params.from_timestamp {
        conjuncts.push(json!({(TIMESTAMP_PATH): {"$gte": from}}));
    }
    if let Some(to) = params.to_timestamp {
        conjuncts.push(json!({(TIMESTAMP_PATH): {"$lte": to}}));
    }

    Query::filter(json!({"$and": conjuncts}))
        .sort_desc(TIMESTAMP_PATH)
        .skip((params.page * params.per_page) as usize)
        .limit(params.per_page as usize)
}
