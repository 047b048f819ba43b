use thiserror::Error;

use retouch_core::{ComposeError, DecodeError, EncodeError, HistogramError, ValidationError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Asset {0} has not been processed yet")]
    NotYetProcessed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("No image loaded")]
    NoImage,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl From<HistogramError> for SessionError {
    fn from(err: HistogramError) -> Self {
        SessionError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
