//! Query-parameter validation and casting.
//!
//! Find parameters arrive as loosely typed mappings (query strings decode to
//! strings, JSON bodies to native types). Both forms are accepted for
//! integer fields: native non-negative integers pass through, numeric
//! strings are cast, and anything else is rejected with the field name.

use serde_json::{Map, Value};

use crate::error::{Result, ValidationError};
use crate::validator::ADDRESS_REGEX;

pub const DEFAULT_PER_PAGE: u64 = 100;
pub const MAX_PER_PAGE: u64 = 1000;

#[derive(Debug, Clone, PartialEq)]
pub struct FindAssetsParams {
    pub page: u64,
    pub per_page: u64,
    pub created_by: Option<String>,
    pub from_timestamp: Option<u64>,
    pub to_timestamp: Option<u64>,
}

impl Default for FindAssetsParams {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: DEFAULT_PER_PAGE,
            created_by: None,
            from_timestamp: None,
            to_timestamp: None,
        }
    }
}

/// A geospatial radius query, only accepted under the reserved
/// `data.geoJson` key.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoQuery {
    pub longitude: f64,
    pub latitude: f64,
    pub max_distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindEventsParams {
    pub page: u64,
    pub per_page: u64,
    pub asset_id: Option<String>,
    pub created_by: Option<String>,
    pub from_timestamp: Option<u64>,
    pub to_timestamp: Option<u64>,
    /// Scalar equality predicates over data entries, keyed by (possibly
    /// dotted) entry field.
    pub data: Vec<(String, Value)>,
    pub geo: Option<GeoQuery>,
}

impl Default for FindEventsParams {
    fn default() -> Self {
        Self {
            page: 0,
            per_page: DEFAULT_PER_PAGE,
            asset_id: None,
            created_by: None,
            from_timestamp: None,
            to_timestamp: None,
            data: Vec::new(),
            geo: None,
        }
    }
}

pub fn validate_and_cast_find_assets_params(raw: &Value) -> Result<FindAssetsParams> {
    let fields = require_params_object(raw)?;
    let mut params = FindAssetsParams::default();
    for (key, value) in fields {
        match key.as_str() {
            "page" => params.page = cast_non_negative_int("page", value)?,
            "perPage" => params.per_page = cast_per_page(value)?,
            "createdBy" => params.created_by = Some(cast_address("createdBy", value)?),
            "fromTimestamp" => {
                params.from_timestamp = Some(cast_non_negative_int("fromTimestamp", value)?)
            }
            "toTimestamp" => {
                params.to_timestamp = Some(cast_non_negative_int("toTimestamp", value)?)
            }
            other => return Err(unknown_parameter(other)),
        }
    }
    Ok(params)
}

pub fn validate_and_cast_find_events_params(raw: &Value) -> Result<FindEventsParams> {
    let fields = require_params_object(raw)?;
    let mut params = FindEventsParams::default();
    for (key, value) in fields {
        match key.as_str() {
            "page" => params.page = cast_non_negative_int("page", value)?,
            "perPage" => params.per_page = cast_per_page(value)?,
            "assetId" => {
                params.asset_id = Some(cast_string("assetId", value)?);
            }
            "createdBy" => params.created_by = Some(cast_address("createdBy", value)?),
            "fromTimestamp" => {
                params.from_timestamp = Some(cast_non_negative_int("fromTimestamp", value)?)
            }
            "toTimestamp" => {
                params.to_timestamp = Some(cast_non_negative_int("toTimestamp", value)?)
            }
            "data" => cast_data(value, &mut params)?,
            other => return Err(unknown_parameter(other)),
        }
    }
    Ok(params)
}

fn cast_data(value: &Value, params: &mut FindEventsParams) -> Result<()> {
    let Some(entries) = value.as_object() else {
        return Err(ValidationError::QueryParameter {
            field: "data".to_string(),
            message: "must be an object".to_string(),
        });
    };
    for (key, value) in entries {
        if key == "geoJson" {
            params.geo = Some(cast_geo_query(value)?);
            continue;
        }
        if key.split('.').any(|segment| segment == "geoJson") {
            return Err(ValidationError::QueryParameter {
                field: format!("data.{key}"),
                message: "geospatial predicates are only accepted under data.geoJson".to_string(),
            });
        }
        match value {
            Value::String(_) | Value::Number(_) => {
                params.data.push((key.clone(), value.clone()));
            }
            _ => {
                return Err(ValidationError::QueryParameter {
                    field: format!("data.{key}"),
                    message: "must be a string or a number".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn cast_geo_query(value: &Value) -> Result<GeoQuery> {
    let Some(fields) = value.as_object() else {
        return Err(ValidationError::QueryParameter {
            field: "data.geoJson".to_string(),
            message: "must be an object".to_string(),
        });
    };
    for key in fields.keys() {
        if !matches!(
            key.as_str(),
            "locationLongitude" | "locationLatitude" | "locationMaxDistance"
        ) {
            return Err(ValidationError::QueryParameter {
                field: format!("data.geoJson.{key}"),
                message: "unknown parameter".to_string(),
            });
        }
    }
    let longitude = cast_number("data.geoJson.locationLongitude", geo_field(fields, "locationLongitude")?)?;
    let latitude = cast_number("data.geoJson.locationLatitude", geo_field(fields, "locationLatitude")?)?;
    let max_distance =
        cast_number("data.geoJson.locationMaxDistance", geo_field(fields, "locationMaxDistance")?)?;
    Ok(GeoQuery {
        longitude,
        latitude,
        max_distance,
    })
}

fn geo_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value> {
    fields.get(name).ok_or_else(|| ValidationError::QueryParameter {
        field: format!("data.geoJson.{name}"),
        message: "is required".to_string(),
    })
}

fn require_params_object(raw: &Value) -> Result<&Map<String, Value>> {
    raw.as_object().ok_or_else(|| ValidationError::QueryParameter {
        field: "params".to_string(),
        message: "must be an object".to_string(),
    })
}

fn unknown_parameter(field: &str) -> ValidationError {
    ValidationError::QueryParameter {
        field: field.to_string(),
        message: "unknown parameter".to_string(),
    }
}

fn cast_per_page(value: &Value) -> Result<u64> {
    let per_page = cast_non_negative_int("perPage", value)?;
    if per_page < 1 || per_page > MAX_PER_PAGE {
        return Err(ValidationError::QueryParameter {
            field: "perPage".to_string(),
            message: format!("must be between 1 and {MAX_PER_PAGE}"),
        });
    }
    Ok(per_page)
}

fn cast_non_negative_int(field: &str, value: &Value) -> Result<u64> {
    match value {
        Value::Number(_) => value.as_u64().ok_or_else(|| ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a non-negative integer".to_string(),
        }),
        Value::String(text) => text.parse::<u64>().map_err(|_| ValidationError::QueryParameter {
            field: field.to_string(),
            message: format!("cannot cast '{text}' to a non-negative integer"),
        }),
        _ => Err(ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a non-negative integer".to_string(),
        }),
    }
}

fn cast_number(field: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(_) => value.as_f64().ok_or_else(|| ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a number".to_string(),
        }),
        Value::String(text) => text.parse::<f64>().map_err(|_| ValidationError::QueryParameter {
            field: field.to_string(),
            message: format!("cannot cast '{text}' to a number"),
        }),
        _ => Err(ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a number".to_string(),
        }),
    }
}

fn cast_string(field: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a string".to_string(),
        })
}

fn cast_address(field: &str, value: &Value) -> Result<String> {
    let address = cast_string(field, value)?;
    if !ADDRESS_REGEX.is_match(&address) {
        return Err(ValidationError::QueryParameter {
            field: field.to_string(),
            message: "must be a hex-prefixed address".to_string(),
        });
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_apply_to_empty_params() {
        let params = validate_and_cast_find_events_params(&json!({})).unwrap();
        assert_eq!(params, FindEventsParams::default());
        assert_eq!(params.page, 0);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn per_page_boundaries() {
        for accepted in [1, 1000] {
            let params =
                validate_and_cast_find_events_params(&json!({"perPage": accepted})).unwrap();
            assert_eq!(params.per_page, accepted);
        }
        for rejected in [0, 1001] {
            assert!(validate_and_cast_find_events_params(&json!({"perPage": rejected})).is_err());
        }
    }

    #[test]
    fn integer_fields_cast_from_numeric_strings() {
        let params = validate_and_cast_find_events_params(
            &json!({"page": "3", "perPage": "50", "fromTimestamp": "10", "toTimestamp": 20}),
        )
        .unwrap();
        assert_eq!(params.page, 3);
        assert_eq!(params.per_page, 50);
        assert_eq!(params.from_timestamp, Some(10));
        assert_eq!(params.to_timestamp, Some(20));
    }

    #[test]
    fn non_numeric_strings_are_rejected_explicitly() {
        let err = validate_and_cast_find_events_params(&json!({"page": "lots"})).unwrap_err();
        let ValidationError::QueryParameter { field, message } = err else {
            panic!("expected QueryParameter");
        };
        assert_eq!(field, "page");
        assert!(message.contains("lots"));
    }

    #[test]
    fn negative_and_fractional_numbers_are_rejected() {
        assert!(validate_and_cast_find_events_params(&json!({"fromTimestamp": -1})).is_err());
        assert!(validate_and_cast_find_events_params(&json!({"page": 1.5})).is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(validate_and_cast_find_events_params(&json!({"color": "red"})).is_err());
        // Event-only fields are unknown on the asset side.
        assert!(validate_and_cast_find_assets_params(&json!({"assetId": "0x1"})).is_err());
        assert!(validate_and_cast_find_assets_params(&json!({"data": {}})).is_err());
    }

    #[test]
    fn created_by_must_be_an_address() {
        let good = "0x2222222222222222222222222222222222222222";
        let params = validate_and_cast_find_events_params(&json!({"createdBy": good})).unwrap();
        assert_eq!(params.created_by.as_deref(), Some(good));
        assert!(validate_and_cast_find_events_params(&json!({"createdBy": "0x123"})).is_err());
    }

    #[test]
    fn data_values_must_be_scalars() {
        let params = validate_and_cast_find_events_params(
            &json!({"data": {"city": "Zug", "acceleration.valueX": 5}}),
        )
        .unwrap();
        assert_eq!(params.data.len(), 2);

        assert!(
            validate_and_cast_find_events_params(&json!({"data": {"nested": {"a": 1}}})).is_err()
        );
        assert!(validate_and_cast_find_events_params(&json!({"data": {"list": [1]}})).is_err());
        assert!(validate_and_cast_find_events_params(&json!({"data": {"flag": true}})).is_err());
    }

    #[test]
    fn geo_query_requires_the_exact_shape() {
        let params = validate_and_cast_find_events_params(&json!({"data": {"geoJson": {
            "locationLongitude": 13.37, "locationLatitude": "52.5", "locationMaxDistance": 1000
        }}}))
        .unwrap();
        let geo = params.geo.unwrap();
        assert_eq!(geo.longitude, 13.37);
        assert_eq!(geo.latitude, 52.5);
        assert_eq!(geo.max_distance, 1000.0);

        assert!(validate_and_cast_find_events_params(
            &json!({"data": {"geoJson": {"locationLongitude": 0}}})
        )
        .is_err());
        assert!(validate_and_cast_find_events_params(&json!({"data": {"geoJson": {
            "locationLongitude": 0, "locationLatitude": 0, "locationMaxDistance": 0, "extra": 1
        }}}))
        .is_err());
    }

    #[test]
    fn geo_predicates_outside_the_reserved_key_are_rejected() {
        assert!(validate_and_cast_find_events_params(
            &json!({"data": {"position.geoJson": "0,0"}})
        )
        .is_err());
        assert!(
            validate_and_cast_find_events_params(&json!({"data": {"geoJson.lat": 1}})).is_err()
        );
    }
}
