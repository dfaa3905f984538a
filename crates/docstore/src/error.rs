use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocstoreError {
    #[error("Document is missing the id field '{0}'")]
    MissingIdField(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid update document: {0}")]
    InvalidUpdate(String),
}

pub type Result<T> = std::result::Result<T, DocstoreError>;
