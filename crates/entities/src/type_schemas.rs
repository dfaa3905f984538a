//! Registry of per-type entry schemas.
//!
//! Event data entries carry a `type` string. Types registered here get their
//! payload validated against the corresponding schema document; unrecognized
//! types only need the shared entry shape (an object with a `type` string).

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::SchemaViolation;
use crate::schema;

#[derive(Debug, Clone, Default)]
pub struct TypeSchemaRegistry {
    schemas: HashMap<String, Value>,
}

impl TypeSchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry with all predefined entry types.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("ambrosus.asset.identifiers", identifiers_schema());
        registry.register("ambrosus.event.identifiers", identifiers_schema());
        registry.register("ambrosus.asset.location", location_schema());
        registry.register("ambrosus.event.location", location_schema());
        registry.register("ambrosus.asset.info", info_schema());
        registry
    }

    pub fn register(&mut self, type_name: impl Into<String>, schema: Value) {
        self.schemas.insert(type_name.into(), schema);
    }

    pub fn get(&self, type_name: &str) -> Option<&Value> {
        self.schemas.get(type_name)
    }

    /// Validate one data entry at its index. The shared shape (`type`
    /// required, entry is an object) applies to every entry; the registered
    /// schema additionally applies when the type is known.
    pub fn validate_entry(&self, entry: &Value, index: usize) -> Vec<SchemaViolation> {
        let path = format!("[{index}]");
        let mut violations = Vec::new();

        let Some(fields) = entry.as_object() else {
            violations.push(SchemaViolation {
                data_path: path,
                message: "should be object".to_string(),
            });
            return violations;
        };
        match fields.get("type").and_then(Value::as_str) {
            None => {
                violations.push(SchemaViolation {
                    data_path: path,
                    message: "should have required string property 'type'".to_string(),
                });
                return violations;
            }
            Some(type_name) => {
                if let Some(type_schema) = self.get(type_name) {
                    schema::validate(entry, type_schema, &path, &mut violations);
                }
            }
        }
        violations
    }
}

fn identifiers_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type", "identifiers"],
        "properties": {
            "type": {"type": "string"},
            "identifiers": {"type": "object"}
        }
    })
}

fn location_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type"],
        "properties": {
            "type": {"type": "string"},
            "geoJson": {
                "type": "object",
                "required": ["type", "coordinates"],
                "properties": {
                    "type": {"enum": ["Point"]},
                    "coordinates": {
                        "type": "array",
                        "minItems": 2,
                        "maxItems": 2,
                        "items": [
                            {"type": "number", "minimum": -180, "maximum": 180},
                            {"type": "number", "minimum": -90, "maximum": 90}
                        ]
                    }
                }
            },
            "assetId": {"type": "string", "pattern": "^0x[a-fA-F0-9]{64}$"},
            "name": {"type": "string"},
            "country": {"type": "string"},
            "city": {"type": "string"}
        }
    })
}

fn info_schema() -> Value {
    json!({
        "type": "object",
        "required": ["type", "name"],
        "properties": {
            "type": {"type": "string"},
            "name": {"type": "string"},
            "assetType": {"type": "string"},
            "description": {"type": "string"},
            "images": {"type": "object"}
        }
    })
}
