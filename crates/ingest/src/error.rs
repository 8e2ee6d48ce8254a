use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Bad input file: missing, too large, or otherwise unusable
    #[error("validation error: {0}")]
    Validation(String),

    /// Extension outside {pdf, doc, docx}
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The extractor could not read the document body
    #[error("failed to extract text from {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("invalid chunker config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
