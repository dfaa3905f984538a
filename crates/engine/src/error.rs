use thiserror::Error;

use crate::download::DownloadError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] entities::ValidationError),

    #[error(transparent)]
    Repository(#[from] repository::RepositoryError),

    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Downloaded bundle has id {actual}, expected {expected}")]
    BundleIdMismatch { expected: String, actual: String },

    #[error(transparent)]
    Identity(#[from] identity::IdentityError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
