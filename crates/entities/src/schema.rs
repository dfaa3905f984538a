//! Generic schema traverser.
//!
//! Schemas are plain JSON documents; this walker interprets the keyword
//! subset the entry schemas use (`type`, `required`, `properties`,
//! `additionalProperties`, `items`, `enum`, `pattern`, numeric and array
//! bounds). Registering a new entry type means adding a document, never
//! changing this code.

use regex::Regex;
use serde_json::Value;

use crate::error::SchemaViolation;

/// Validate an instance against a schema, appending violations as the walk
/// encounters them. Object properties are visited in alphabetical key order
/// (the order `serde_json`'s map iterates), array items in element order, so
/// the violation list is deterministic for a given instance. `path` is the
/// data path prefix reported for the instance itself.
pub fn validate(instance: &Value, schema: &Value, path: &str, violations: &mut Vec<SchemaViolation>) {
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(expected) = schema.get("type").and_then(Value::as_str) {
        if !type_matches(instance, expected) {
            violations.push(SchemaViolation {
                data_path: path.to_string(),
                message: format!("should be {expected}"),
            });
            return;
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(instance) {
            violations.push(SchemaViolation {
                data_path: path.to_string(),
                message: "should be equal to one of the allowed values".to_string(),
            });
        }
    }

    match instance {
        Value::Object(fields) => {
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    if !fields.contains_key(name) {
                        violations.push(SchemaViolation {
                            data_path: path.to_string(),
                            message: format!("should have required property '{name}'"),
                        });
                    }
                }
            }
            let properties = schema.get("properties").and_then(Value::as_object);
            for (name, value) in fields {
                match properties.and_then(|p| p.get(name)) {
                    Some(subschema) => {
                        validate(value, subschema, &format!("{path}.{name}"), violations);
                    }
                    None => {
                        if schema.get("additionalProperties").and_then(Value::as_bool)
                            == Some(false)
                        {
                            violations.push(SchemaViolation {
                                data_path: path.to_string(),
                                message: format!("should not have additional property '{name}'"),
                            });
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
                if (items.len() as u64) < min {
                    violations.push(SchemaViolation {
                        data_path: path.to_string(),
                        message: format!("should not have fewer than {min} items"),
                    });
                }
            }
            if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
                if (items.len() as u64) > max {
                    violations.push(SchemaViolation {
                        data_path: path.to_string(),
                        message: format!("should not have more than {max} items"),
                    });
                }
            }
            match schema.get("items") {
                // Positional schemas, one per element.
                Some(Value::Array(schemas)) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(subschema) = schemas.get(i) {
                            validate(item, subschema, &format!("{path}[{i}]"), violations);
                        }
                    }
                }
                Some(subschema) => {
                    for (i, item) in items.iter().enumerate() {
                        validate(item, subschema, &format!("{path}[{i}]"), violations);
                    }
                }
                None => {}
            }
        }
        Value::String(text) => {
            if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
                if let Ok(regex) = Regex::new(pattern) {
                    if !regex.is_match(text) {
                        violations.push(SchemaViolation {
                            data_path: path.to_string(),
                            message: format!("should match pattern \"{pattern}\""),
                        });
                    }
                }
            }
        }
        Value::Number(_) => {
            let number = instance.as_f64().unwrap_or(f64::NAN);
            if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
                if number < min {
                    violations.push(SchemaViolation {
                        data_path: path.to_string(),
                        message: format!("should be >= {min}"),
                    });
                }
            }
            if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
                if number > max {
                    violations.push(SchemaViolation {
                        data_path: path.to_string(),
                        message: format!("should be <= {max}"),
                    });
                }
            }
        }
        _ => {}
    }
}

fn type_matches(instance: &Value, expected: &str) -> bool {
    match expected {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => instance.as_i64().is_some() || instance.as_u64().is_some(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        _ => false,
    }
}
