//! Durable worker log storage.
//!
//! Workers persist their structured log lines here in addition to the
//! tracing output. The collection is append-only; retention is left to
//! whoever operates the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use docstore::{Collection, Query};

use crate::error::{RepositoryError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerLogEntry {
    pub log_id: String,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub context: Value,
}

pub struct WorkerLogRepository {
    logs: Arc<dyn Collection>,
}

impl WorkerLogRepository {
    pub fn new(logs: Arc<dyn Collection>) -> Self {
        Self { logs }
    }

    pub async fn store_log(&self, level: &str, message: &str, context: Value) -> Result<()> {
        let entry = WorkerLogEntry {
            log_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            level: level.to_string(),
            message: message.to_string(),
            context,
        };
        let document = serde_json::to_value(&entry)
            .map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
        self.logs.insert(document).await?;
        Ok(())
    }

    /// The most recent log entries, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<WorkerLogEntry>> {
        let query = Query::filter(json!({})).sort_desc("timestamp").limit(limit);
        let mut entries = Vec::new();
        for document in self.logs.find(&query).await? {
            entries.push(
                serde_json::from_value(document)
                    .map_err(|e| RepositoryError::Corrupted(e.to_string()))?,
            );
        }
        Ok(entries)
    }
}
