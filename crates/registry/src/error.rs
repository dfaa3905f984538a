use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry transport failed: {0}")]
    Transport(String),

    #[error("Unknown challenge: {0}")]
    UnknownChallenge(String),

    #[error("No registered node for address {0}")]
    UnknownNode(String),

    #[error("Bundle upload rejected: {0}")]
    UploadRejected(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
