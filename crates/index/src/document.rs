use ingest::Chunk;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::flat_index::FlatIndex;

/// Written next to the vectors so a reload can tell where they came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub source: String,
    pub source_sha256: String,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
}

/// Chunks of one document with their vectors, addressable by name
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub manifest: Manifest,
    pub chunks: Vec<Chunk>,
    pub index: FlatIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Squared L2 distance; lower is closer
    pub score: f32,
}

impl IndexedDocument {
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.index
            .search(query_vector, k)?
            .into_iter()
            .map(|(row, score)| {
                let chunk = self.chunks.get(row).ok_or_else(|| IndexError::Corrupt {
                    name: self.manifest.name.clone(),
                    message: format!("vector row {} has no chunk", row),
                })?;
                Ok(SearchHit {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_maps_rows_to_chunks() {
        let chunks: Vec<Chunk> = ["payment", "termination", "liability"]
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk::new(text.to_string(), "c.pdf".to_string(), i))
            .collect();

        let mut index = FlatIndex::new();
        index.add(vec![0.0, 0.0]).unwrap();
        index.add(vec![1.0, 0.0]).unwrap();
        index.add(vec![5.0, 5.0]).unwrap();

        let doc = IndexedDocument {
            manifest: Manifest {
                name: "c".to_string(),
                source: "c.pdf".to_string(),
                source_sha256: String::new(),
                chunk_count: 3,
                chunk_size: 800,
                chunk_overlap: 150,
                embedding_model: "test".to_string(),
            },
            chunks,
            index,
        };

        let hits = doc.search(&[1.0, 0.1], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.content, "termination");
        assert_eq!(hits[1].chunk.chunk_id, 0);
        assert!(hits[0].score < hits[1].score);
    }
}
