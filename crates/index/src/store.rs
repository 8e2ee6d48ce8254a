use ingest::Chunk;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::document::{IndexedDocument, Manifest};
use crate::error::{IndexError, Result};
use crate::flat_index::FlatIndex;

const INDEX_FILE: &str = "index.json";
const CHUNKS_FILE: &str = "chunks.json";
const MANIFEST_FILE: &str = "manifest.json";

/// One directory per index name under `root`
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate_name(name: &str) -> Result<()> {
        let invalid = name.trim().is_empty()
            || name == "."
            || name == ".."
            || name.starts_with('.')
            || name.contains(&['/', '\\', '\0'][..]);
        if invalid {
            return Err(IndexError::Validation(format!("invalid index name: {:?}", name)));
        }
        Ok(())
    }

    /// Replace whatever is stored under the document's name.
    ///
    /// Files are written to a staging directory first and swapped in, so a
    /// failed write leaves the previous index untouched.
    pub async fn save(&self, document: &IndexedDocument) -> Result<PathBuf> {
        let name = document.name();
        Self::validate_name(name)?;

        let target = self.root.join(name);
        let staging = self.root.join(format!(".{}.staging", name));

        if fs::try_exists(&staging).await? {
            fs::remove_dir_all(&staging).await?;
        }
        fs::create_dir_all(&staging).await?;

        fs::write(staging.join(INDEX_FILE), serde_json::to_vec(&document.index)?).await?;
        fs::write(
            staging.join(CHUNKS_FILE),
            serde_json::to_vec_pretty(&document.chunks)?,
        )
        .await?;
        fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&document.manifest)?,
        )
        .await?;

        if fs::try_exists(&target).await? {
            debug!(index = name, "replacing existing index");
            fs::remove_dir_all(&target).await?;
        }
        fs::rename(&staging, &target).await?;

        info!(index = name, chunks = document.len(), path = %target.display(), "saved index");
        Ok(target)
    }

    /// `None` when nothing is stored under `name`
    pub async fn load(&self, name: &str) -> Result<Option<IndexedDocument>> {
        Self::validate_name(name)?;

        let dir = self.root.join(name);
        if !fs::try_exists(dir.join(MANIFEST_FILE)).await? {
            return Ok(None);
        }

        let manifest: Manifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE)).await?)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&fs::read(dir.join(CHUNKS_FILE)).await?)?;
        let index: FlatIndex = serde_json::from_slice(&fs::read(dir.join(INDEX_FILE)).await?)?;

        let corrupt = |message: String| IndexError::Corrupt {
            name: name.to_string(),
            message,
        };

        index.verify().map_err(corrupt)?;
        if index.len() != chunks.len() {
            return Err(corrupt(format!(
                "{} vectors for {} chunks",
                index.len(),
                chunks.len()
            )));
        }
        if chunks.iter().enumerate().any(|(i, c)| c.chunk_id != i) {
            return Err(corrupt("chunk ids are not sequential".to_string()));
        }

        debug!(index = name, chunks = chunks.len(), "loaded index");
        Ok(Some(IndexedDocument {
            manifest,
            chunks,
            index,
        }))
    }

    /// Names of stored indexes, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if fs::try_exists(entry.path().join(MANIFEST_FILE)).await? {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(name: &str, texts: &[&str]) -> IndexedDocument {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(t.to_string(), format!("{}.pdf", name), i))
            .collect();
        let mut index = FlatIndex::new();
        for i in 0..chunks.len() {
            index.add(vec![i as f32, 1.0]).unwrap();
        }
        IndexedDocument {
            manifest: Manifest {
                name: name.to_string(),
                source: format!("{}.pdf", name),
                source_sha256: "00".repeat(32),
                chunk_count: chunks.len(),
                chunk_size: 800,
                chunk_overlap: 150,
                embedding_model: "test-embed".to_string(),
            },
            chunks,
            index,
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());

        let original = document("contract", &["first clause", "second clause"]);
        store.save(&original).await.unwrap();

        let loaded = store.load("contract").await.unwrap().unwrap();
        assert_eq!(loaded.manifest, original.manifest);
        assert_eq!(loaded.chunks, original.chunks);
        assert_eq!(loaded.index, original.index);
    }

    #[tokio::test]
    async fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());

        store.save(&document("contract", &["a", "b", "c"])).await.unwrap();
        store.save(&document("contract", &["only"])).await.unwrap();

        let loaded = store.load("contract").await.unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.chunks[0].content, "only");
        assert_eq!(store.list().await.unwrap(), vec!["contract".to_string()]);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().join("does-not-exist"));

        assert!(store.load("contract").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_rejects_mismatched_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&document("contract", &["a", "b"])).await.unwrap();

        let chunks_path = dir.path().join("contract").join(CHUNKS_FILE);
        let one_chunk = vec![Chunk::new("a".to_string(), "contract.pdf".to_string(), 0)];
        std::fs::write(&chunks_path, serde_json::to_vec(&one_chunk).unwrap()).unwrap();

        let err = store.load("contract").await.unwrap_err();
        assert!(matches!(err, IndexError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&document("nda", &["x"])).await.unwrap();
        store.save(&document("lease", &["y"])).await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["lease".to_string(), "nda".to_string()]);
    }

    #[test]
    fn test_validate_name() {
        assert!(IndexStore::validate_name("contract").is_ok());
        assert!(IndexStore::validate_name("service agreement v2").is_ok());
        for bad in ["", "  ", ".", "..", ".hidden", "a/b", "a\\b"] {
            assert!(IndexStore::validate_name(bad).is_err(), "{:?} accepted", bad);
        }
    }
}
