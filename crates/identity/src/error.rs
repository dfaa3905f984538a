use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid private key: {0}")]
    InvalidSecret(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("Signature was produced by {recovered}, expected {expected}")]
    SignatureMismatch { expected: String, recovered: String },
}

pub type Result<T> = std::result::Result<T, IdentityError>;
