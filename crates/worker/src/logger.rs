//! Structured worker logging.
//!
//! Worker lines go to tracing and, as an audit trail, to the durable
//! worker-log collection. A failed persist never fails the worker.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use repository::WorkerLogRepository;

pub struct WorkerLogger {
    worker: &'static str,
    logs: Arc<WorkerLogRepository>,
}

impl WorkerLogger {
    pub fn new(worker: &'static str, logs: Arc<WorkerLogRepository>) -> Self {
        Self { worker, logs }
    }

    pub async fn info(&self, message: &str, context: Value) {
        info!(worker = self.worker, %context, "{message}");
        self.persist("info", message, context).await;
    }

    pub async fn warn(&self, message: &str, context: Value) {
        warn!(worker = self.worker, %context, "{message}");
        self.persist("warn", message, context).await;
    }

    pub async fn error(&self, message: &str, context: Value) {
        error!(worker = self.worker, %context, "{message}");
        self.persist("error", message, context).await;
    }

    async fn persist(&self, level: &str, message: &str, context: Value) {
        if let Err(store_error) = self.logs.store_log(level, message, context).await {
            error!(worker = self.worker, %store_error, "failed to persist worker log");
        }
    }
}
