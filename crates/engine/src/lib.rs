//! Engine: orchestration of validation, storage, and on-chain commitment.

pub mod download;
mod engine;
pub mod error;

pub use download::{BundleDownloader, DownloadError, StaticBundleSource};
pub use engine::{BundleCandidate, DataModelEngine};
pub use error::{EngineError, Result};
