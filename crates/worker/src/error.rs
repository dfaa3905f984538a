use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Engine(#[from] engine::EngineError),

    #[error(transparent)]
    Repository(#[from] repository::RepositoryError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
