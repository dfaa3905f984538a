use std::sync::Arc;

use docstore::MemoryCollection;
use engine::{DataModelEngine, StaticBundleSource};
use entities::fixtures::{test_address, TEST_SECRET};
use entities::{EntityValidator, DEFAULT_TIMESTAMP_LIMIT_SECS};
use registry::MemoryRegistry;
use repository::{
    ChallengesRepository, EntityRepository, UploadRepository, WorkerLogRepository,
};

#[allow(dead_code)]
pub struct TestHarness {
    pub engine: Arc<DataModelEngine>,
    pub repository: Arc<EntityRepository>,
    pub registry: Arc<MemoryRegistry>,
    pub downloader: Arc<StaticBundleSource>,
    pub upload_repository: Arc<UploadRepository>,
    pub challenges_repository: Arc<ChallengesRepository>,
    pub worker_logs: Arc<WorkerLogRepository>,
}

pub fn harness() -> TestHarness {
    let repository = Arc::new(EntityRepository::new(
        Arc::new(MemoryCollection::new("assetId")),
        Arc::new(MemoryCollection::new("eventId")),
        Arc::new(MemoryCollection::new("bundleId")),
    ));
    let registry = Arc::new(MemoryRegistry::new(test_address()));
    let downloader = Arc::new(StaticBundleSource::new());
    let upload_repository = Arc::new(UploadRepository::new(registry.clone()));
    let challenges_repository = Arc::new(ChallengesRepository::new(registry.clone()));
    let worker_logs = Arc::new(WorkerLogRepository::new(Arc::new(MemoryCollection::new(
        "logId",
    ))));
    let engine = Arc::new(
        DataModelEngine::new(
            EntityValidator::new(DEFAULT_TIMESTAMP_LIMIT_SECS),
            repository.clone(),
            upload_repository.clone(),
            challenges_repository.clone(),
            registry.clone(),
            downloader.clone(),
            TEST_SECRET.to_string(),
        )
        .expect("engine builds"),
    );
    TestHarness {
        engine,
        repository,
        registry,
        downloader,
        upload_repository,
        challenges_repository,
        worker_logs,
    }
}

pub fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

#[allow(dead_code)]
pub async fn log_messages(harness: &TestHarness) -> Vec<String> {
    harness
        .worker_logs
        .recent(100)
        .await
        .expect("logs readable")
        .into_iter()
        .map(|entry| entry.message)
        .collect()
}
