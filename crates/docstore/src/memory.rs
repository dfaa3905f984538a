//! In-memory collection backend.
//!
//! Holds documents in a `BTreeMap` keyed by the configured id field and
//! evaluates the full filter language in process. Single-document updates
//! are atomic, and `update_many` holds the write lock for the whole pass,
//! which is what makes a filter-conditioned bulk update behave as a
//! compare-and-swap over the matching set.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::collection::{Collection, Query, SortOrder};
use crate::error::{DocstoreError, Result};
use crate::filter::{compare_sort_keys, find_near_spec, matches, near_distance, sort_key};

pub struct MemoryCollection {
    id_field: String,
    documents: RwLock<BTreeMap<String, Value>>,
}

impl MemoryCollection {
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    fn id_of(&self, document: &Value) -> Result<String> {
        document
            .get(&self.id_field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DocstoreError::MissingIdField(self.id_field.clone()))
    }

    fn order_results(&self, results: &mut [Value], query: &Query) {
        if let Some(spec) = find_near_spec(&query.filter) {
            // $near dictates the order: nearest first.
            results.sort_by(|a, b| {
                match (near_distance(a, &spec), near_distance(b, &spec)) {
                    (Some(da), Some(db)) => da.total_cmp(&db),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
            return;
        }
        if query.sort.is_empty() {
            return;
        }
        results.sort_by(|a, b| {
            for (path, order) in &query.sort {
                let ordering = compare_sort_keys(sort_key(a, path), sort_key(b, path));
                let ordering = match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn insert(&self, document: Value) -> Result<()> {
        let id = self.id_of(&document)?;
        self.documents.write().await.insert(id, document);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Value>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn find(&self, query: &Query) -> Result<Vec<Value>> {
        let documents = self.documents.read().await;
        let mut results = Vec::new();
        for document in documents.values() {
            if matches(document, &query.filter)? {
                results.push(document.clone());
            }
        }
        drop(documents);

        self.order_results(&mut results, query);

        let mut results: Vec<Value> = results.into_iter().skip(query.skip).collect();
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn count(&self, filter: &Value) -> Result<u64> {
        let documents = self.documents.read().await;
        let mut count = 0;
        for document in documents.values() {
            if matches(document, filter)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn update_many(
        &self,
        filter: &Value,
        update: &Value,
        limit: Option<usize>,
    ) -> Result<u64> {
        let mut documents = self.documents.write().await;
        let ids: Vec<String> = documents.keys().cloned().collect();
        let mut updated = 0;
        for id in ids {
            if let Some(max) = limit {
                if updated as usize >= max {
                    break;
                }
            }
            let Some(document) = documents.get_mut(&id) else {
                continue;
            };
            if !matches(document, filter)? {
                continue;
            }
            apply_update(document, update)?;
            updated += 1;

            // Updates are not expected to touch the id field, but if one
            // does, keep the key consistent.
            let new_id = self.id_of(documents.get(&id).unwrap_or(&Value::Null))?;
            if new_id != id {
                if let Some(moved) = documents.remove(&id) {
                    documents.insert(new_id, moved);
                }
            }
        }
        Ok(updated)
    }
}

fn apply_update(document: &mut Value, update: &Value) -> Result<()> {
    let Some(operations) = update.as_object() else {
        return Err(DocstoreError::InvalidUpdate(
            "update must be an object".to_string(),
        ));
    };
    for (operator, fields) in operations {
        let Some(fields) = fields.as_object() else {
            return Err(DocstoreError::InvalidUpdate(format!(
                "{operator} requires an object of fields"
            )));
        };
        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(document, path, value.clone());
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    unset_path(document, path);
                }
            }
            other => {
                return Err(DocstoreError::InvalidUpdate(format!(
                    "unsupported update operator '{other}'"
                )));
            }
        }
    }
    Ok(())
}

fn set_path(document: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = document;
    for segment in &segments[..segments.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(segments[segments.len() - 1].to_string(), value);
    }
}

fn unset_path(document: &mut Value, path: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = document;
    for segment in &segments[..segments.len() - 1] {
        match current.get_mut(*segment) {
            Some(child) => current = child,
            None => return,
        }
    }
    if let Some(map) = current.as_object_mut() {
        map.remove(segments[segments.len() - 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(id: &str, timestamp: u64) -> Value {
        json!({
            "assetId": id,
            "content": {"idData": {"timestamp": timestamp}},
            "metadata": {}
        })
    }

    #[tokio::test]
    async fn insert_and_find_by_id() {
        let collection = MemoryCollection::new("assetId");
        collection.insert(asset("0x1", 10)).await.unwrap();
        let found = collection.find_by_id("0x1").await.unwrap().unwrap();
        assert_eq!(found["content"]["idData"]["timestamp"], 10);
        assert!(collection.find_by_id("0x2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_replaces_existing_document() {
        let collection = MemoryCollection::new("assetId");
        collection.insert(asset("0x1", 10)).await.unwrap();
        collection.insert(asset("0x1", 20)).await.unwrap();
        let found = collection.find_by_id("0x1").await.unwrap().unwrap();
        assert_eq!(found["content"]["idData"]["timestamp"], 20);
        assert_eq!(collection.count(&json!({})).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_requires_id_field() {
        let collection = MemoryCollection::new("assetId");
        let err = collection.insert(json!({"content": {}})).await.unwrap_err();
        assert!(matches!(err, DocstoreError::MissingIdField(_)));
    }

    #[tokio::test]
    async fn find_sorts_and_pages() {
        let collection = MemoryCollection::new("assetId");
        for i in 0..5u64 {
            collection.insert(asset(&format!("0x{i}"), i)).await.unwrap();
        }
        let query = Query::filter(json!({}))
            .sort_desc("content.idData.timestamp")
            .skip(1)
            .limit(2);
        let results = collection.find(&query).await.unwrap();
        let timestamps: Vec<u64> = results
            .iter()
            .map(|d| d["content"]["idData"]["timestamp"].as_u64().unwrap())
            .collect();
        assert_eq!(timestamps, vec![3, 2]);
    }

    #[tokio::test]
    async fn update_many_respects_filter_and_limit() {
        let collection = MemoryCollection::new("assetId");
        for i in 0..4u64 {
            collection.insert(asset(&format!("0x{i}"), i)).await.unwrap();
        }
        let claimed = collection
            .update_many(
                &json!({"metadata.bundleId": null}),
                &json!({"$set": {"metadata.bundleId": "stub"}}),
                Some(3),
            )
            .await
            .unwrap();
        assert_eq!(claimed, 3);

        // A second pass only sees what is still unclaimed.
        let claimed = collection
            .update_many(
                &json!({"metadata.bundleId": null}),
                &json!({"$set": {"metadata.bundleId": "other"}}),
                None,
            )
            .await
            .unwrap();
        assert_eq!(claimed, 1);

        let stubbed = collection
            .count(&json!({"metadata.bundleId": "stub"}))
            .await
            .unwrap();
        assert_eq!(stubbed, 3);
    }

    #[tokio::test]
    async fn unset_removes_nested_field() {
        let collection = MemoryCollection::new("assetId");
        collection.insert(asset("0x1", 10)).await.unwrap();
        collection
            .update_many(
                &json!({"assetId": "0x1"}),
                &json!({"$set": {"metadata.bundleId": "b"}}),
                None,
            )
            .await
            .unwrap();
        collection
            .update_many(
                &json!({"assetId": "0x1"}),
                &json!({"$unset": {"metadata.bundleId": ""}}),
                None,
            )
            .await
            .unwrap();
        let found = collection.find_by_id("0x1").await.unwrap().unwrap();
        assert!(found["metadata"].get("bundleId").is_none());
    }

    #[tokio::test]
    async fn near_orders_nearest_first() {
        let collection = MemoryCollection::new("eventId");
        let event = |id: &str, lon: f64, lat: f64| {
            json!({
                "eventId": id,
                "content": {"data": [{"type": "ambrosus.event.location",
                    "geoJson": {"type": "Point", "coordinates": [lon, lat]}}]}
            })
        };
        collection.insert(event("0xfar", 0.0, 1.0)).await.unwrap();
        collection.insert(event("0xnear", 0.0, 0.00005)).await.unwrap();
        collection.insert(event("0xcenter", 0.0, 0.0)).await.unwrap();

        let query = Query::filter(json!({"content.data.geoJson": {"$near": {
            "$geometry": {"type": "Point", "coordinates": [0.0, 0.0]},
            "$maxDistance": 1000
        }}}));
        let results = collection.find(&query).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|d| d["eventId"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["0xcenter", "0xnear"]);
    }
}
