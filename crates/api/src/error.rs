use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use index::IndexError;
use ingest::IngestError;
use query::QueryError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("Please upload a document first")]
    NoActiveDocument,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// Embedding or completion provider failed after retries
    #[error("{0}")]
    ExternalService(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::UnsupportedFormat(_)
            | ApiError::NoActiveDocument
            | ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => ApiError::Validation(msg),
            IngestError::UnsupportedFormat(_) => ApiError::UnsupportedFormat(err.to_string()),
            IngestError::Extraction { .. } => ApiError::Validation(err.to_string()),
            IngestError::InvalidConfig(_) | IngestError::Io(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Ingest(inner) => inner.into(),
            IndexError::Validation(msg) => ApiError::Validation(msg),
            IndexError::ExternalService(_) => ApiError::ExternalService(err.to_string()),
            IndexError::DimensionMismatch { .. }
            | IndexError::Corrupt { .. }
            | IndexError::Io(_)
            | IndexError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidArgument(msg) => ApiError::InvalidArgument(msg),
            QueryError::ExternalService(_) => ApiError::ExternalService(err.to_string()),
            QueryError::Index(inner) => inner.into(),
        }
    }
}
