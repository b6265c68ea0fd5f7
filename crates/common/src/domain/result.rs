use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid document payload: {0}")]
    InvalidDocument(String),

    #[error("Document serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Feed delivery error: {0}")]
    FeedError(#[from] anyhow::Error),
}
