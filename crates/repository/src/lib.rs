//! Repositories: durable entity storage, the bundling state machine, and
//! the thin adapters the workers use to reach the on-chain registry.

pub mod challenges_repository;
pub mod entity_repository;
pub mod error;
pub mod query;
pub mod upload_repository;
pub mod worker_log_repository;

pub use challenges_repository::ChallengesRepository;
pub use entity_repository::{EntityRepository, FindResult, BUNDLE_STUB_PREFIX};
pub use error::{RepositoryError, Result};
pub use upload_repository::UploadRepository;
pub use worker_log_repository::{WorkerLogEntry, WorkerLogRepository};
