use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Docstore(#[from] docstore::DocstoreError),

    #[error(transparent)]
    Registry(#[from] registry::RegistryError),

    #[error("Stored document is malformed: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
