//! Offline stand-ins for the embedding and completion services.

use anyhow::Result;
use async_trait::async_trait;
use index::{Embedder, FlatIndex, IndexedDocument, Manifest};
use ingest::Chunk;
use std::sync::Mutex;

use crate::llm::CompletionService;

pub const DIMENSION: usize = 64;

/// Normalised bag-of-words over hashed buckets
pub struct WordEmbedder;

#[async_trait]
impl Embedder for WordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[bucket(&word.to_lowercase())] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "word-buckets"
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in word.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    (hash % DIMENSION as u64) as usize
}

pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        anyhow::bail!("embedding service unavailable")
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Returns a canned reply and remembers every prompt it saw
pub struct ScriptedLLM {
    reply: String,
    fail: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLLM {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionService for ScriptedLLM {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            anyhow::bail!("completion quota exceeded");
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub async fn indexed_document(
    name: &str,
    texts: &[&str],
    embedder: &dyn Embedder,
) -> IndexedDocument {
    let source = format!("{}.pdf", name);
    let mut chunks = Vec::new();
    let mut index = FlatIndex::new();
    for (i, text) in texts.iter().enumerate() {
        chunks.push(Chunk::new(text.to_string(), source.clone(), i));
        index.add(embedder.embed(text).await.unwrap()).unwrap();
    }

    IndexedDocument {
        manifest: Manifest {
            name: name.to_string(),
            source,
            source_sha256: String::new(),
            chunk_count: chunks.len(),
            chunk_size: 800,
            chunk_overlap: 150,
            embedding_model: embedder.model_name().to_string(),
        },
        chunks,
        index,
    }
}
