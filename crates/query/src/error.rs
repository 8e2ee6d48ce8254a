use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding or completion call failed
    #[error("external service error: {0:#}")]
    ExternalService(anyhow::Error),

    #[error(transparent)]
    Index(#[from] index::IndexError),
}
