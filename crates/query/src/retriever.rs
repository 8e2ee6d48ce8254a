use index::{Embedder, IndexedDocument, SearchHit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{QueryError, Result};

pub const DEFAULT_K: usize = 4;

/// Marks chunk boundaries inside the assembled context
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub source: String,
    pub chunk_id: usize,
    /// Distance to the question; lower is more similar
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub context: String,
    /// Rank-aligned with the context segments
    pub sources: Vec<SourceCitation>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty()
    }
}

/// Nearest-chunk lookup over one indexed document
#[derive(Clone)]
pub struct Retriever {
    document: Arc<IndexedDocument>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(document: Arc<IndexedDocument>, embedder: Arc<dyn Embedder>) -> Self {
        Self { document, embedder }
    }

    pub fn document(&self) -> &IndexedDocument {
        &self.document
    }

    /// Up to `k` hits, closest first
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(QueryError::InvalidArgument("k must be at least 1".to_string()));
        }
        if self.document.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| QueryError::ExternalService(e.context("embedding query")))?;

        let hits = self.document.search(&query_vector, k)?;
        debug!(
            index = self.document.name(),
            k,
            hits = hits.len(),
            "vector search"
        );
        Ok(hits)
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievedContext> {
        let hits = self.search(query, k).await?;

        let context = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER);

        let sources = hits
            .into_iter()
            .map(|hit| SourceCitation {
                source: hit.chunk.source,
                chunk_id: hit.chunk.chunk_id,
                score: hit.score,
            })
            .collect();

        Ok(RetrievedContext { context, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{WordEmbedder, indexed_document};

    const CLAUSES: [&str; 10] = [
        "payment is due within thirty days of invoice",
        "the contract duration is twelve months from signing",
        "either party may terminate with thirty days written notice",
        "the supplier is liable for damages caused by negligence",
        "confidential information must not be disclosed",
        "disputes are settled by arbitration in london",
        "the total contract value is fifty thousand dollars",
        "services are delivered on business days only",
        "intellectual property remains with the client",
        "this agreement is governed by english law",
    ];

    async fn retriever() -> Retriever {
        let embedder = Arc::new(WordEmbedder);
        let document = indexed_document("contract", &CLAUSES, embedder.as_ref()).await;
        Retriever::new(Arc::new(document), embedder)
    }

    #[tokio::test]
    async fn test_retrieve_bounded_and_sorted() {
        let retriever = retriever().await;
        let retrieved = retriever
            .retrieve("what is the contract duration in months", DEFAULT_K)
            .await
            .unwrap();

        assert_eq!(retrieved.sources.len(), 4);
        assert!(retrieved.sources.windows(2).all(|w| w[0].score <= w[1].score));
        assert_eq!(retrieved.sources[0].chunk_id, 1);
        assert_eq!(retrieved.sources[0].source, "contract.pdf");
    }

    #[tokio::test]
    async fn test_context_segments_align_with_sources() {
        let retriever = retriever().await;
        let retrieved = retriever.retrieve("thirty days notice", 3).await.unwrap();

        let segments: Vec<&str> = retrieved.context.split(CONTEXT_DELIMITER).collect();
        assert_eq!(segments.len(), retrieved.sources.len());
        for (segment, source) in segments.iter().zip(&retrieved.sources) {
            assert_eq!(*segment, CLAUSES[source.chunk_id]);
        }
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let retriever = retriever().await;
        let retrieved = retriever.retrieve("governing law", 50).await.unwrap();
        assert_eq!(retrieved.sources.len(), CLAUSES.len());
    }

    #[tokio::test]
    async fn test_zero_k_is_invalid() {
        let retriever = retriever().await;
        let err = retriever.retrieve("governing law", 0).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_empty_index_gives_empty_context() {
        let embedder = Arc::new(WordEmbedder);
        let document = indexed_document("blank", &[], embedder.as_ref()).await;
        let retriever = Retriever::new(Arc::new(document), embedder);

        let retrieved = retriever.retrieve("anything at all", DEFAULT_K).await.unwrap();
        assert!(retrieved.is_empty());
        assert!(retrieved.sources.is_empty());
    }
}
