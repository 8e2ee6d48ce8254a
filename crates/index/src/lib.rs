pub mod document;
pub mod embeddings;
pub mod error;
pub mod flat_index;
pub mod pipeline;
pub mod store;

pub use document::{IndexedDocument, Manifest, SearchHit};
pub use embeddings::{Embedder, EmbeddingClient};
pub use error::{IndexError, Result};
pub use flat_index::FlatIndex;
pub use pipeline::{DEFAULT_MAX_FILE_BYTES, IngestionPipeline};
pub use store::IndexStore;
