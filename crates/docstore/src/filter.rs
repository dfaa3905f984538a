//! Filter-document evaluation.
//!
//! Implements the operator subset the repositories rely on: `$and`, `$gte`,
//! `$lte`, `$elemMatch`, `$near`, `$regex`, `$exists`, plain-value equality,
//! and dotted paths that traverse both objects and arrays.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use crate::error::{DocstoreError, Result};
use crate::geo::{extract_point, haversine_distance};

/// Evaluate a filter document against a document.
pub fn matches(document: &Value, filter: &Value) -> Result<bool> {
    let Some(entries) = filter.as_object() else {
        return Err(DocstoreError::InvalidFilter(
            "filter must be an object".to_string(),
        ));
    };
    for (key, condition) in entries {
        let matched = match key.as_str() {
            "$and" => {
                let Some(subfilters) = condition.as_array() else {
                    return Err(DocstoreError::InvalidFilter(
                        "$and requires an array".to_string(),
                    ));
                };
                let mut all = true;
                for subfilter in subfilters {
                    if !matches(document, subfilter)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            path if path.starts_with('$') => {
                return Err(DocstoreError::InvalidFilter(format!(
                    "unsupported top-level operator '{path}'"
                )));
            }
            path => match_condition(document, path, condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_condition(document: &Value, path: &str, condition: &Value) -> Result<bool> {
    let resolved = resolve_path(document, path);
    if let Some(operators) = operator_object(condition)? {
        for (operator, operand) in operators {
            let matched = match operator.as_str() {
                "$eq" => match_equality(&resolved, operand),
                "$gte" => match_compare(&resolved, operand, |ord| ord != Ordering::Less),
                "$lte" => match_compare(&resolved, operand, |ord| ord != Ordering::Greater),
                "$elemMatch" => match_elem(&resolved, operand)?,
                "$near" => match_near(&resolved, operand)?,
                "$regex" => match_regex(&resolved, operand)?,
                "$exists" => operand.as_bool() == Some(!resolved.is_empty()),
                other => {
                    return Err(DocstoreError::InvalidFilter(format!(
                        "unsupported operator '{other}'"
                    )));
                }
            };
            if !matched {
                return Ok(false);
            }
        }
        Ok(true)
    } else {
        Ok(match_equality(&resolved, condition))
    }
}

/// Returns the operator map when the condition is an operator object,
/// `None` when it is a plain equality value.
fn operator_object(condition: &Value) -> Result<Option<&serde_json::Map<String, Value>>> {
    let Some(map) = condition.as_object() else {
        return Ok(None);
    };
    let operator_keys = map.keys().filter(|k| k.starts_with('$')).count();
    if operator_keys == 0 {
        return Ok(None);
    }
    if operator_keys != map.len() {
        return Err(DocstoreError::InvalidFilter(
            "condition mixes operators and literal fields".to_string(),
        ));
    }
    Ok(Some(map))
}

/// Resolve a dotted path, fanning out over arrays along the way.
fn resolve_path<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![document];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        next.push(child);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = item.get(segment) {
                            next.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn match_equality(resolved: &[&Value], target: &Value) -> bool {
    if target.is_null() {
        // Conventional null semantics: matches an explicit null and a
        // missing field alike.
        return resolved.is_empty() || resolved.iter().any(|v| v.is_null());
    }
    resolved.iter().any(|v| {
        *v == target
            || matches!(v, Value::Array(items) if items.iter().any(|item| item == target))
    })
}

fn match_compare(resolved: &[&Value], operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    resolved
        .iter()
        .any(|v| json_compare(v, operand).is_some_and(accept))
}

fn match_elem(resolved: &[&Value], operand: &Value) -> Result<bool> {
    for value in resolved {
        if let Value::Array(items) = value {
            for item in items {
                if matches(item, operand)? {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

fn match_near(resolved: &[&Value], operand: &Value) -> Result<bool> {
    let spec = parse_near(operand)?;
    Ok(resolved.iter().any(|v| {
        extract_point(v).is_some_and(|(lon, lat)| {
            let distance = haversine_distance(spec.lon, spec.lat, lon, lat);
            spec.max_distance.is_none_or(|max| distance <= max)
        })
    }))
}

fn match_regex(resolved: &[&Value], operand: &Value) -> Result<bool> {
    let Some(pattern) = operand.as_str() else {
        return Err(DocstoreError::InvalidFilter(
            "$regex requires a string pattern".to_string(),
        ));
    };
    let regex = Regex::new(pattern)
        .map_err(|e| DocstoreError::InvalidFilter(format!("invalid $regex: {e}")))?;
    Ok(resolved
        .iter()
        .any(|v| v.as_str().is_some_and(|s| regex.is_match(s))))
}

/// Total order over comparable JSON scalars; `None` for mixed or
/// non-comparable types.
fn json_compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => left.as_f64()?.partial_cmp(&right.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

/// A `$near` condition located inside a filter, lifted out for ordering.
#[derive(Debug, Clone)]
pub struct NearSpec {
    pub path: String,
    pub lon: f64,
    pub lat: f64,
    pub max_distance: Option<f64>,
}

fn parse_near(operand: &Value) -> Result<NearSpec> {
    let geometry = operand.get("$geometry").ok_or_else(|| {
        DocstoreError::InvalidFilter("$near requires a $geometry".to_string())
    })?;
    let (lon, lat) = extract_point(geometry).ok_or_else(|| {
        DocstoreError::InvalidFilter("$near geometry must be a GeoJSON Point".to_string())
    })?;
    let max_distance = match operand.get("$maxDistance") {
        None => None,
        Some(value) => Some(value.as_f64().ok_or_else(|| {
            DocstoreError::InvalidFilter("$maxDistance must be a number".to_string())
        })?),
    };
    Ok(NearSpec {
        path: String::new(),
        lon,
        lat,
        max_distance,
    })
}

/// Find the first `$near` condition in a filter, if any.
pub fn find_near_spec(filter: &Value) -> Option<NearSpec> {
    let entries = filter.as_object()?;
    for (key, condition) in entries {
        if key == "$and" {
            if let Some(subfilters) = condition.as_array() {
                for subfilter in subfilters {
                    if let Some(spec) = find_near_spec(subfilter) {
                        return Some(spec);
                    }
                }
            }
        } else if let Some(operand) = condition.get("$near") {
            if let Ok(mut spec) = parse_near(operand) {
                spec.path = key.clone();
                return Some(spec);
            }
        }
    }
    None
}

/// Distance in meters from a document's nearest point at `spec.path` to the
/// query center. `None` when the document has no valid point there.
pub fn near_distance(document: &Value, spec: &NearSpec) -> Option<f64> {
    resolve_path(document, &spec.path)
        .into_iter()
        .filter_map(extract_point)
        .map(|(lon, lat)| haversine_distance(spec.lon, spec.lat, lon, lat))
        .min_by(|a, b| a.total_cmp(b))
}

/// First value at a dotted path, for sorting.
pub fn sort_key<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    resolve_path(document, path).into_iter().next()
}

/// Comparator for sort keys: numbers and strings compare naturally, missing
/// values sort before everything (so they land last in descending order).
pub fn compare_sort_keys(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(l), Some(r)) => json_compare(l, r).unwrap_or(Ordering::Equal),
    }
}
