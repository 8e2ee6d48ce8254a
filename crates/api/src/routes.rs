use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use index::IndexStore;
use ingest::DocumentFormat;
use query::{QaRecord, QaResponse};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::session::ActiveDocument;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = (state.config.max_file_bytes() + MULTIPART_OVERHEAD_BYTES) as usize;

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/documents", get(list_documents))
        .route("/documents/:name/load", post(load_document))
        .route("/ask", post(ask))
        .route("/summarize", post(summarize))
        .route("/history", get(history).delete(clear_history))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    document_loaded: bool,
    document: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    status: &'static str,
    message: &'static str,
    chunks: usize,
}

#[derive(Serialize)]
struct LoadResponse {
    document: String,
    status: &'static str,
    chunks: usize,
}

#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<String>,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Signed so that negative values get a proper 400
    k: Option<i64>,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<QaRecord>,
    total: usize,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let active = state.session.current().await;
    Json(HealthResponse {
        status: "healthy",
        document_loaded: active.is_some(),
        document: active.map(|d| d.name.clone()),
    })
}

async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // Only the final path component; never let the client pick a directory
        let filename = field
            .file_name()
            .and_then(|n| FsPath::new(n).file_name())
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ApiError::Validation("uploaded file has no name".to_string()))?;
        DocumentFormat::from_path(FsPath::new(&filename))?;

        // Index name is the file stem; reject it before anything touches disk
        let name = FsPath::new(&filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.clone());
        IndexStore::validate_name(&name)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        upload = Some((filename, name, bytes));
        break;
    }

    let (filename, name, bytes) = upload
        .ok_or_else(|| ApiError::Validation("multipart field 'file' is required".to_string()))?;

    let data_dir = &state.config.server.data_dir;
    tokio::fs::create_dir_all(data_dir).await?;
    let path = data_dir.join(&filename);
    tokio::fs::write(&path, &bytes).await?;
    info!(file = %filename, bytes = bytes.len(), "saved upload");

    let document = match state.pipeline.ingest(&path, &name).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!(file = %filename, error = %remove_err, "failed to remove rejected upload");
            }
            return Err(e.into());
        }
    };
    let chunks = document.len();
    let qa = state.qa_for(document);
    state.session.activate(ActiveDocument { name, qa }).await;

    Ok(Json(UploadResponse {
        filename,
        status: "ready",
        message: "Document processed successfully",
        chunks,
    }))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let documents = state.pipeline.list().await?;
    Ok(Json(DocumentsResponse { documents }))
}

async fn load_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<LoadResponse>, ApiError> {
    let document = state
        .pipeline
        .load(&name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No stored index named '{}'", name)))?;

    let chunks = document.len();
    let qa = state.qa_for(document);
    state
        .session
        .activate(ActiveDocument {
            name: name.clone(),
            qa,
        })
        .await;

    Ok(Json(LoadResponse {
        document: name,
        status: "ready",
        chunks,
    }))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<QaResponse>, ApiError> {
    let active = state.session.require().await?;

    let k = match request.k {
        None => state.config.answer.default_k,
        Some(k) if k > 0 => k as usize,
        Some(k) => {
            return Err(ApiError::InvalidArgument(format!(
                "k must be a positive integer, got {}",
                k
            )));
        }
    };

    let response = active.qa.ask(&request.question, k).await?;
    Ok(Json(response))
}

async fn summarize(State(state): State<Arc<AppState>>) -> Result<Json<SummaryResponse>, ApiError> {
    let active = state.session.require().await?;
    let summary = active.qa.summarize().await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let history = match state.session.current().await {
        Some(active) => active.qa.history().await,
        None => Vec::new(),
    };
    Json(HistoryResponse {
        total: history.len(),
        history,
    })
}

async fn clear_history(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if let Some(active) = state.session.current().await {
        active.qa.clear_history().await;
    }
    Json(MessageResponse {
        message: "History cleared",
    })
}
