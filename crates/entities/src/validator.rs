//! Ingress validation.
//!
//! Every entity entering the node passes through here. The check order is
//! fixed and observable: shape first, then content hashes, then the
//! signature, then the timestamp window. Callers can rely on the class of
//! the first failure.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{JsonValidationError, Result, SchemaViolation, ValidationError};
use crate::type_schemas::TypeSchemaRegistry;
use crate::types::{Asset, Bundle, Event};

/// Default ingress timestamp tolerance: one day in either direction.
pub const DEFAULT_TIMESTAMP_LIMIT_SECS: u64 = 24 * 60 * 60;

pub(crate) static ADDRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^0x[0-9a-fA-F]{40}$").expect("static pattern compiles")
});

pub struct EntityValidator {
    timestamp_limit: u64,
    schemas: TypeSchemaRegistry,
}

impl EntityValidator {
    pub fn new(timestamp_limit: u64) -> Self {
        Self {
            timestamp_limit,
            schemas: TypeSchemaRegistry::standard(),
        }
    }

    pub fn with_schemas(timestamp_limit: u64, schemas: TypeSchemaRegistry) -> Self {
        Self {
            timestamp_limit,
            schemas,
        }
    }

    /// Validate an incoming asset document and return its typed form.
    pub fn validate_asset(&self, value: &Value) -> Result<Asset> {
        let root = ensure_shape(value, "asset", &["assetId", "content"], &[])?;
        let asset_id = require_string(root, "asset", "assetId")?;
        let content = ensure_shape(&root["content"], "content", &["idData", "signature"], &[])?;
        let signature = require_string(content, "content", "signature")?;
        let id_data = ensure_shape(
            &content["idData"],
            "idData",
            &["createdBy", "timestamp", "sequenceNumber"],
            &[],
        )?;
        let created_by = require_address(id_data, "idData", "createdBy")?;
        let timestamp = require_non_negative_int(id_data, "idData", "timestamp")?;
        require_non_negative_int(id_data, "idData", "sequenceNumber")?;

        if !identity::check_hash_matches(asset_id, &root["content"]) {
            return Err(ValidationError::HashMismatch {
                field: "assetId".to_string(),
            });
        }

        identity::validate_signature(created_by, signature, &content["idData"])
            .map_err(|e| ValidationError::Signature(e.to_string()))?;

        self.ensure_timestamp_within_limit(timestamp)?;

        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Shape(e.to_string()))
    }

    /// Validate an incoming event document and return its typed form.
    pub fn validate_event(&self, value: &Value) -> Result<Event> {
        let root = ensure_shape(value, "event", &["eventId", "content"], &[])?;
        let event_id = require_string(root, "event", "eventId")?;
        let content = ensure_shape(
            &root["content"],
            "content",
            &["idData", "data", "signature"],
            &[],
        )?;
        let signature = require_string(content, "content", "signature")?;
        let data = require_array(content, "content", "data")?;
        let id_data = ensure_shape(
            &content["idData"],
            "idData",
            &["assetId", "createdBy", "timestamp", "dataHash", "accessLevel"],
            &[],
        )?;
        require_string(id_data, "idData", "assetId")?;
        let created_by = require_address(id_data, "idData", "createdBy")?;
        let timestamp = require_non_negative_int(id_data, "idData", "timestamp")?;
        let data_hash = require_string(id_data, "idData", "dataHash")?;
        require_non_negative_int(id_data, "idData", "accessLevel")?;

        let mut violations: Vec<SchemaViolation> = Vec::new();
        for (index, entry) in data.iter().enumerate() {
            violations.extend(self.schemas.validate_entry(entry, index));
        }
        if !violations.is_empty() {
            return Err(JsonValidationError { errors: violations }.into());
        }

        if !identity::check_hash_matches(event_id, &root["content"]) {
            return Err(ValidationError::HashMismatch {
                field: "eventId".to_string(),
            });
        }
        if !identity::check_hash_matches(data_hash, &content["data"]) {
            return Err(ValidationError::HashMismatch {
                field: "dataHash".to_string(),
            });
        }

        identity::validate_signature(created_by, signature, &content["idData"])
            .map_err(|e| ValidationError::Signature(e.to_string()))?;

        self.ensure_timestamp_within_limit(timestamp)?;

        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Shape(e.to_string()))
    }

    /// Validate a bundle document, typically downloaded from a peer.
    ///
    /// Bundles may carry metadata, and their timestamps are historical, so
    /// no ingress window applies.
    pub fn validate_bundle(&self, value: &Value) -> Result<Bundle> {
        let root = ensure_shape(value, "bundle", &["bundleId", "content"], &["metadata"])?;
        let bundle_id = require_string(root, "bundle", "bundleId")?;
        let content = ensure_shape(
            &root["content"],
            "content",
            &["idData", "signature", "entries"],
            &[],
        )?;
        let signature = require_string(content, "content", "signature")?;
        require_array(content, "content", "entries")?;
        let id_data = ensure_shape(
            &content["idData"],
            "idData",
            &["createdBy", "timestamp", "entriesHash"],
            &[],
        )?;
        let created_by = require_address(id_data, "idData", "createdBy")?;
        require_non_negative_int(id_data, "idData", "timestamp")?;
        let entries_hash = require_string(id_data, "idData", "entriesHash")?;

        if !identity::check_hash_matches(bundle_id, &root["content"]) {
            return Err(ValidationError::HashMismatch {
                field: "bundleId".to_string(),
            });
        }
        if !identity::check_hash_matches(entries_hash, &content["entries"]) {
            return Err(ValidationError::HashMismatch {
                field: "entriesHash".to_string(),
            });
        }

        identity::validate_signature(created_by, signature, &content["idData"])
            .map_err(|e| ValidationError::Signature(e.to_string()))?;

        serde_json::from_value(value.clone()).map_err(|e| ValidationError::Shape(e.to_string()))
    }

    fn ensure_timestamp_within_limit(&self, timestamp: u64) -> Result<()> {
        if !is_timestamp_within_limit(timestamp, crate::builder::now_seconds(), self.timestamp_limit)
        {
            return Err(ValidationError::TimestampOutsideLimit {
                timestamp,
                limit: self.timestamp_limit,
            });
        }
        Ok(())
    }
}

/// Whether a timestamp falls inside `now ± limit`, both bounds inclusive.
pub fn is_timestamp_within_limit(timestamp: u64, now: u64, limit: u64) -> bool {
    let delta = (timestamp as i64) - (now as i64);
    delta.unsigned_abs() <= limit
}

fn ensure_shape<'a>(
    value: &'a Value,
    path: &str,
    required: &[&str],
    optional: &[&str],
) -> Result<&'a Map<String, Value>> {
    let Some(fields) = value.as_object() else {
        return Err(ValidationError::Shape(format!("'{path}' must be an object")));
    };
    for name in required {
        if !fields.contains_key(*name) {
            return Err(ValidationError::Shape(format!(
                "missing required field '{name}' in {path}"
            )));
        }
    }
    for name in fields.keys() {
        if !required.contains(&name.as_str()) && !optional.contains(&name.as_str()) {
            return Err(ValidationError::Shape(format!(
                "unknown field '{name}' in {path}"
            )));
        }
    }
    Ok(fields)
}

fn require_string<'a>(fields: &'a Map<String, Value>, path: &str, name: &str) -> Result<&'a str> {
    fields[name]
        .as_str()
        .ok_or_else(|| ValidationError::Shape(format!("'{path}.{name}' must be a string")))
}

fn require_address<'a>(fields: &'a Map<String, Value>, path: &str, name: &str) -> Result<&'a str> {
    let address = require_string(fields, path, name)?;
    if !ADDRESS_REGEX.is_match(address) {
        return Err(ValidationError::Shape(format!(
            "'{path}.{name}' must be a hex-prefixed address"
        )));
    }
    Ok(address)
}

fn require_non_negative_int(fields: &Map<String, Value>, path: &str, name: &str) -> Result<u64> {
    fields[name].as_u64().ok_or_else(|| {
        ValidationError::Shape(format!("'{path}.{name}' must be a non-negative integer"))
    })
}

fn require_array<'a>(
    fields: &'a Map<String, Value>,
    path: &str,
    name: &str,
) -> Result<&'a Vec<Value>> {
    fields[name]
        .as_array()
        .ok_or_else(|| ValidationError::Shape(format!("'{path}.{name}' must be an array")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{assemble_bundle, entity_value, now_seconds};
    use crate::fixtures::{signed_asset, signed_asset_value, signed_event, signed_event_value, TEST_SECRET};
    use serde_json::json;

    fn validator() -> EntityValidator {
        EntityValidator::new(DEFAULT_TIMESTAMP_LIMIT_SECS)
    }

    #[test]
    fn accepts_a_well_formed_asset() {
        let value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        let asset = validator().validate_asset(&value).unwrap();
        assert_eq!(asset.content.id_data.sequence_number, 0);
    }

    #[test]
    fn rejects_unknown_root_field() {
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        value["metadata"] = json!({"bundleId": "0xb"});
        let err = validator().validate_asset(&value).unwrap_err();
        assert!(matches!(err, ValidationError::Shape(_)), "got {err:?}");
    }

    #[test]
    fn rejects_unknown_content_field() {
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        value["content"]["extra"] = json!(1);
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::Shape(_)
        ));
    }

    #[test]
    fn shape_failure_wins_over_hash_failure() {
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        value["assetId"] = json!("0xwrong");
        value["unknown"] = json!(true);
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::Shape(_)
        ));
    }

    #[test]
    fn hash_failure_wins_over_signature_failure() {
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        value["content"]["signature"] = json!(format!("0x{}", "11".repeat(65)));
        value["assetId"] = json!(format!("0x{}", "22".repeat(32)));
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::HashMismatch { .. }
        ));
    }

    #[test]
    fn detects_tampered_content() {
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        value["content"]["idData"]["sequenceNumber"] = json!(7);
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::HashMismatch { .. }
        ));
    }

    #[test]
    fn detects_foreign_signature() {
        // Re-sign the idData with a different key and fix up the hash, so
        // only the signature check can catch it.
        let mut value = signed_asset_value(TEST_SECRET, now_seconds(), 0);
        let other = "0x1234567890123456789012345678901234567890123456789012345678901234";
        let signature = identity::sign(other, &value["content"]["idData"]).unwrap();
        value["content"]["signature"] = json!(signature);
        value["assetId"] = json!(identity::calculate_hash(&value["content"]));
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::Signature(_)
        ));
    }

    #[test]
    fn timestamp_window_boundaries() {
        assert!(is_timestamp_within_limit(1_000_000, 1_000_000, 0));
        let now = 1_000_000;
        let limit = DEFAULT_TIMESTAMP_LIMIT_SECS;
        assert!(is_timestamp_within_limit(now + limit, now, limit));
        assert!(is_timestamp_within_limit(now - limit, now, limit));
        assert!(!is_timestamp_within_limit(now + limit + 1, now, limit));
        assert!(!is_timestamp_within_limit(now - limit - 1, now, limit));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let stale = now_seconds() - DEFAULT_TIMESTAMP_LIMIT_SECS - 100;
        let value = signed_asset_value(TEST_SECRET, stale, 0);
        assert!(matches!(
            validator().validate_asset(&value).unwrap_err(),
            ValidationError::TimestampOutsideLimit { .. }
        ));
    }

    #[test]
    fn accepts_a_well_formed_event() {
        let data = vec![json!({"type": "ambrosus.event.location", "city": "Zug"})];
        let value = signed_event_value(TEST_SECRET, "0xa1", now_seconds(), 2, data);
        let event = validator().validate_event(&value).unwrap();
        assert_eq!(event.content.id_data.access_level, 2);
    }

    #[test]
    fn event_schema_failures_are_structured_and_ordered() {
        let data = vec![
            json!({"type": "ambrosus.event.location",
                   "geoJson": {"type": "Point", "coordinates": [200.0, 0.0]}}),
            json!({"no_type_here": true}),
        ];
        let value = signed_event_value(TEST_SECRET, "0xa1", now_seconds(), 0, data);
        let err = validator().validate_event(&value).unwrap_err();
        let ValidationError::JsonValidation(json_err) = err else {
            panic!("expected JsonValidation, got {err:?}");
        };
        assert_eq!(json_err.errors.len(), 2);
        assert_eq!(json_err.errors[0].data_path, "[0].geoJson.coordinates[0]");
        assert_eq!(json_err.errors[1].data_path, "[1]");
    }

    #[test]
    fn event_data_hash_is_checked() {
        let data = vec![json!({"type": "custom"})];
        let mut value = signed_event_value(TEST_SECRET, "0xa1", now_seconds(), 0, data);
        value["content"]["data"][0]["tampered"] = json!(true);
        // Fix the outer hash so the dataHash check is the one that fires.
        value["eventId"] = json!(identity::calculate_hash(&value["content"]));
        let err = validator().validate_event(&value).unwrap_err();
        assert!(
            matches!(err, ValidationError::HashMismatch { ref field } if field == "dataHash"),
            "got {err:?}"
        );
    }

    #[test]
    fn validates_an_assembled_bundle() {
        let asset = signed_asset(TEST_SECRET, now_seconds(), 0);
        let public = signed_event(TEST_SECRET, &asset.asset_id, now_seconds(), 0, vec![json!({"type": "t"})]);
        let restricted =
            signed_event(TEST_SECRET, &asset.asset_id, now_seconds(), 1, vec![json!({"type": "t"})]);
        let bundle =
            assemble_bundle(&[asset], &[public, restricted], now_seconds(), TEST_SECRET).unwrap();
        let value = entity_value(&bundle).unwrap();
        validator().validate_bundle(&value).unwrap();
    }

    #[test]
    fn bundle_with_tampered_entries_fails_on_entries_hash() {
        let asset = signed_asset(TEST_SECRET, now_seconds(), 0);
        let bundle = assemble_bundle(&[asset], &[], now_seconds(), TEST_SECRET).unwrap();
        let mut value = entity_value(&bundle).unwrap();
        value["content"]["entries"].as_array_mut().unwrap().pop();
        value["bundleId"] = json!(identity::calculate_hash(&value["content"]));
        let err = validator().validate_bundle(&value).unwrap_err();
        assert!(
            matches!(err, ValidationError::HashMismatch { ref field } if field == "entriesHash")
        );
    }
}
