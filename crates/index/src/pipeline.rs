use ingest::Chunker;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::document::{IndexedDocument, Manifest};
use crate::embeddings::Embedder;
use crate::error::{IndexError, Result};
use crate::flat_index::FlatIndex;
use crate::store::IndexStore;

/// 50 MiB, the upload ceiling
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Extract -> chunk -> embed -> persist, for one document at a time
pub struct IngestionPipeline {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    store: IndexStore,
    max_file_bytes: u64,
}

impl IngestionPipeline {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, store: IndexStore) -> Self {
        Self {
            chunker,
            embedder,
            store,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Build and persist the index for `file_path` under `index_name`,
    /// replacing any index already stored with that name.
    pub async fn ingest(&self, file_path: &Path, index_name: &str) -> Result<IndexedDocument> {
        IndexStore::validate_name(index_name)?;
        let started = Instant::now();

        let (source, chunks) =
            ingest::ingest_file(file_path, &self.chunker, self.max_file_bytes).await?;

        if chunks.is_empty() {
            warn!(
                file = %source.name,
                "no extractable text, storing an empty index"
            );
        }

        let mut index = FlatIndex::new();
        for chunk in &chunks {
            let vector = self
                .embedder
                .embed(&chunk.content)
                .await
                .map_err(|e| IndexError::ExternalService(e.context(format!("embedding chunk {}", chunk.chunk_id))))?;
            index.add(vector)?;
        }

        let config = self.chunker.config();
        let document = IndexedDocument {
            manifest: Manifest {
                name: index_name.to_string(),
                source: source.name.clone(),
                source_sha256: source.sha256,
                chunk_count: chunks.len(),
                chunk_size: config.chunk_size,
                chunk_overlap: config.chunk_overlap,
                embedding_model: self.embedder.model_name().to_string(),
            },
            chunks,
            index,
        };

        self.store.save(&document).await?;

        info!(
            index = index_name,
            file = %source.name,
            chunks = document.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingested document"
        );

        Ok(document)
    }

    /// Reuse a stored index without extracting or embedding again
    pub async fn load(&self, index_name: &str) -> Result<Option<IndexedDocument>> {
        let document = self.store.load(index_name).await?;

        if let Some(doc) = &document {
            if doc.manifest.embedding_model != self.embedder.model_name() {
                warn!(
                    index = index_name,
                    stored = %doc.manifest.embedding_model,
                    current = self.embedder.model_name(),
                    "index was built with a different embedding model"
                );
            }
        }

        Ok(document)
    }

    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.list().await
    }
}
