pub mod chunk;
pub mod chunker;
pub mod error;
pub mod reader;

pub use chunk::{Chunk, fingerprint};
pub use chunker::{Chunker, ChunkerConfig};
pub use error::{IngestError, Result};
pub use reader::{DocumentFormat, FileReader, SourceDocument};

use std::path::Path;

/// Read, extract and chunk one document
pub async fn ingest_file(
    file_path: &Path,
    chunker: &Chunker,
    max_bytes: u64,
) -> Result<(SourceDocument, Vec<Chunk>)> {
    let document = FileReader::read(file_path, max_bytes).await?;
    let chunks = chunker.chunk_text(&document.text, &document.name);

    tracing::info!(
        file = %document.name,
        chunks = chunks.len(),
        "chunked document"
    );

    Ok((document, chunks))
}
