use anyhow::{Context, Result};
use index::{Embedder, EmbeddingClient, IndexStore, IngestionPipeline};
use ingest::{Chunker, ChunkerConfig};
use query::llm::{GROQ_BASE_URL, GROQ_MODEL};
use query::{ChatCompletionClient, CompletionService, QueryLLM};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{AppConfig, CompletionBackend};
use crate::retry::{RetryPolicy, RetryingEmbedder, RetryingLLM};

const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Ollama embedder with timeout and retries applied
pub fn build_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>> {
    let client = EmbeddingClient::with_timeout(
        config.models.ollama_url.clone(),
        config.models.embedding_model.clone(),
        request_timeout(config),
    )?;

    Ok(Arc::new(RetryingEmbedder::new(
        Arc::new(client),
        RetryPolicy::from_config(&config.retry),
    )))
}

pub fn build_llm(config: &AppConfig) -> Result<Arc<dyn CompletionService>> {
    let models = &config.models;
    let timeout = request_timeout(config);

    let inner: Arc<dyn CompletionService> = match models.completion_backend {
        CompletionBackend::Ollama => {
            let url = models.completion_url.as_ref().unwrap_or(&models.ollama_url);
            let model = models
                .completion_model
                .as_deref()
                .unwrap_or(DEFAULT_OLLAMA_MODEL);
            Arc::new(
                QueryLLM::new(url.clone(), model.to_string())
                    .with_temperature(models.temperature)
                    .with_timeout(timeout)?,
            )
        }
        CompletionBackend::OpenAi => {
            let api_key = models
                .completion_api_key
                .clone()
                .context("COMPLETION_API_KEY is required for the openai backend")?;
            let client = match (&models.completion_url, &models.completion_model) {
                (None, None) => ChatCompletionClient::groq(api_key),
                (url, model) => ChatCompletionClient::new(
                    url.clone().unwrap_or_else(|| GROQ_BASE_URL.to_string()),
                    api_key,
                    model.clone().unwrap_or_else(|| GROQ_MODEL.to_string()),
                ),
            };
            Arc::new(
                client
                    .with_temperature(models.temperature)
                    .with_timeout(timeout)?,
            )
        }
    };

    info!(
        backend = ?models.completion_backend,
        model = inner.model_name(),
        "completion service ready"
    );

    Ok(Arc::new(RetryingLLM::new(
        inner,
        RetryPolicy::from_config(&config.retry),
    )))
}

pub fn build_pipeline(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Result<IngestionPipeline> {
    let chunker = Chunker::new(ChunkerConfig {
        chunk_size: config.chunking.chunk_size,
        chunk_overlap: config.chunking.chunk_overlap,
    })
    .context("invalid CHUNK_SIZE / CHUNK_OVERLAP")?;

    Ok(
        IngestionPipeline::new(chunker, embedder, IndexStore::new(config.server.index_dir.clone()))
            .with_max_file_bytes(config.max_file_bytes()),
    )
}

fn request_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.concurrency.request_timeout_secs)
}
