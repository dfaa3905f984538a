//! Signed entity fixtures for tests.
//!
//! Building a valid entity by hand means hashing and signing in the right
//! order; these helpers do that once for every test suite in the workspace.

use serde_json::{json, Value};

use crate::types::{Asset, Event};

pub const TEST_SECRET: &str = "0x4d5db4107d237df6a3d58ee5f70ae63d73d7658d4026f2eefd2f204c81682cb7";
pub const OTHER_SECRET: &str = "0x1234567890123456789012345678901234567890123456789012345678901234";

pub fn test_address() -> String {
    identity::address_from_secret(TEST_SECRET).expect("fixture secret is valid")
}

/// A correctly hashed and signed asset document.
pub fn signed_asset_value(secret: &str, timestamp: u64, sequence_number: u64) -> Value {
    let created_by = identity::address_from_secret(secret).expect("fixture secret is valid");
    let id_data = json!({
        "createdBy": created_by,
        "timestamp": timestamp,
        "sequenceNumber": sequence_number,
    });
    let signature = identity::sign(secret, &id_data).expect("fixture secret signs");
    let content = json!({"idData": id_data, "signature": signature});
    let asset_id = identity::calculate_hash(&content);
    json!({"assetId": asset_id, "content": content})
}

/// A correctly hashed and signed event document.
pub fn signed_event_value(
    secret: &str,
    asset_id: &str,
    timestamp: u64,
    access_level: u32,
    data: Vec<Value>,
) -> Value {
    let created_by = identity::address_from_secret(secret).expect("fixture secret is valid");
    let data = Value::Array(data);
    let id_data = json!({
        "assetId": asset_id,
        "createdBy": created_by,
        "timestamp": timestamp,
        "dataHash": identity::calculate_hash(&data),
        "accessLevel": access_level,
    });
    let signature = identity::sign(secret, &id_data).expect("fixture secret signs");
    let content = json!({"idData": id_data, "data": data, "signature": signature});
    let event_id = identity::calculate_hash(&content);
    json!({"eventId": event_id, "content": content})
}

pub fn signed_asset(secret: &str, timestamp: u64, sequence_number: u64) -> Asset {
    serde_json::from_value(signed_asset_value(secret, timestamp, sequence_number))
        .expect("fixture asset deserializes")
}

pub fn signed_event(
    secret: &str,
    asset_id: &str,
    timestamp: u64,
    access_level: u32,
    data: Vec<Value>,
) -> Event {
    serde_json::from_value(signed_event_value(secret, asset_id, timestamp, access_level, data))
        .expect("fixture event deserializes")
}
