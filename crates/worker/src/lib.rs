//! Periodic workers: the upload loop that commits bundles on chain and the
//! challenge loop that shelters bundles for peers, plus the strategies and
//! caches they run on.

pub mod challenge_worker;
pub mod error;
pub mod failed_challenges_cache;
pub mod logger;
pub mod periodic;
pub mod strategy;
pub mod upload_worker;

pub use challenge_worker::ChallengeWorker;
pub use error::{Result, WorkerError};
pub use failed_challenges_cache::FailedChallengesCache;
pub use logger::WorkerLogger;
pub use periodic::{spawn_periodic, PeriodicTask, WorkerHandle};
pub use strategy::{
    ChallengeStrategy, RegularUploadStrategy, ResolveAllChallengesStrategy, UploadStrategy,
};
pub use upload_worker::UploadWorker;
