use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Embedding provider failure: network, quota, malformed response
    #[error("external service error: {0:#}")]
    ExternalService(anyhow::Error),

    #[error("vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index '{name}' is corrupt: {message}")]
    Corrupt { name: String, message: String },

    #[error(transparent)]
    Ingest(#[from] ingest::IngestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
