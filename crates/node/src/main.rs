//! Node entry point.
//!
//! Wires the document store, the registry, the engine, and the role's
//! worker together, waits for chain sync, and runs until interrupted.
//! The registry and the bundle transport are seams; this binary runs them
//! in-memory, which is what local development and the test network use.

mod config;
mod logging;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use config::{NodeConfig, NodeRole};
use docstore::MemoryCollection;
use engine::{DataModelEngine, StaticBundleSource};
use entities::EntityValidator;
use registry::{wait_for_chain_sync, MemoryRegistry, Registry};
use repository::{
    ChallengesRepository, EntityRepository, UploadRepository, WorkerLogRepository,
};
use worker::{
    spawn_periodic, ChallengeWorker, RegularUploadStrategy, ResolveAllChallengesStrategy,
    UploadWorker, WorkerLogger,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config_path =
        std::env::var("NODE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = NodeConfig::load(Path::new(&config_path))?;
    let secret = config.private_key()?.to_string();
    let address = identity::address_from_secret(&secret)?;

    info!("🚀 Starting amber node");
    info!("👤 Address: {address}");
    info!("🎭 Role: {:?}", config.node.role);

    let repository = Arc::new(EntityRepository::new(
        Arc::new(MemoryCollection::new("assetId")),
        Arc::new(MemoryCollection::new("eventId")),
        Arc::new(MemoryCollection::new("bundleId")),
    ));
    let registry: Arc<dyn Registry> = Arc::new(MemoryRegistry::new(address));
    let upload_repository = Arc::new(UploadRepository::new(registry.clone()));
    let challenges_repository = Arc::new(ChallengesRepository::new(registry.clone()));
    let worker_logs = Arc::new(WorkerLogRepository::new(Arc::new(MemoryCollection::new(
        "logId",
    ))));
    let engine = Arc::new(DataModelEngine::new(
        EntityValidator::new(config.node.timestamp_limit_secs),
        repository.clone(),
        upload_repository.clone(),
        challenges_repository.clone(),
        registry.clone(),
        Arc::new(StaticBundleSource::new()),
        secret,
    )?);

    wait_for_chain_sync(
        registry.as_ref(),
        Duration::from_secs(config.chain.sync_poll_secs),
        || info!("⏳ Chain is syncing..."),
    )
    .await?;
    info!("✅ Chain in sync");

    engine.release_stale_bundle_claims().await?;

    let handle = match config.node.role {
        NodeRole::Upload => spawn_periodic(UploadWorker::new(
            engine.clone(),
            upload_repository.clone(),
            Box::new(RegularUploadStrategy::new(
                Duration::from_secs(config.upload.interval_secs),
                config.upload.storage_periods,
            )),
            WorkerLogger::new("upload-worker", worker_logs.clone()),
            config.upload.retry_period,
        )),
        NodeRole::Shelterer => spawn_periodic(ChallengeWorker::new(
            engine.clone(),
            challenges_repository.clone(),
            Box::new(ResolveAllChallengesStrategy::new(
                Duration::from_secs(config.challenge.interval_secs),
                Duration::from_secs(config.challenge.retry_timeout_secs),
            )),
            WorkerLogger::new("challenge-worker", worker_logs.clone()),
        )),
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping worker");
    handle.stop().await;
    info!("👋 Node stopped");
    Ok(())
}
