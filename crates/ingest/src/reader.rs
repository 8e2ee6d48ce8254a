use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;
use tokio::fs;
use tracing::{debug, warn};

use crate::chunk::fingerprint;
use crate::error::{IngestError, Result};

static PARAGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:p(?:\s[^>]*)?/>|<w:p(?:\s[^>]*)?>.*?</w:p>").expect("paragraph pattern")
});

static RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab/>|<w:br(?:\s[^>]*)?/>|<w:cr/>")
        .expect("run pattern")
});

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("entity pattern")
});

/// Formats the extractor understands. Everything else is rejected when the
/// variant is built, so no extension checks happen past this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Routed through the OOXML reader; legacy binary .doc fails extraction
    Doc,
}

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "doc" => Ok(Self::Doc),
            other => Err(IngestError::UnsupportedFormat(if other.is_empty() {
                "(no extension)".to_string()
            } else {
                other.to_string()
            })),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
        }
    }

    /// Blocking; call through [`FileReader::extract_bytes`] from async code.
    pub fn extract(self, bytes: &[u8], name: &str) -> Result<String> {
        match self {
            Self::Pdf => extract_pdf(bytes, name),
            Self::Docx | Self::Doc => extract_docx(bytes, name),
        }
    }
}

/// A source file after extraction
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// File name without directories, used as the chunk source
    pub name: String,
    pub format: DocumentFormat,
    pub text: String,
    pub sha256: String,
    pub size_bytes: u64,
}

pub struct FileReader;

impl FileReader {
    /// Check that `path` exists, is a regular file of a supported format and
    /// is no larger than `max_bytes`. Every failure here, a bad extension
    /// included, is a `Validation` error.
    pub async fn validate_file(path: &Path, max_bytes: u64) -> Result<DocumentFormat> {
        let format = DocumentFormat::from_path(path)
            .map_err(|e| IngestError::Validation(e.to_string()))?;

        let metadata = match fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::Validation(format!(
                    "file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(IngestError::Validation(format!(
                "not a regular file: {}",
                path.display()
            )));
        }

        if metadata.len() > max_bytes {
            return Err(IngestError::Validation(format!(
                "file is {} bytes, limit is {} bytes",
                metadata.len(),
                max_bytes
            )));
        }

        Ok(format)
    }

    pub async fn read(path: &Path, max_bytes: u64) -> Result<SourceDocument> {
        let format = Self::validate_file(path, max_bytes).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = fs::read(path).await?;
        let size_bytes = bytes.len() as u64;
        let sha256 = fingerprint(&bytes);
        let text = Self::extract_bytes(format, bytes, name.clone()).await?;

        debug!(file = %name, ?format, chars = text.len(), "extracted document text");

        Ok(SourceDocument {
            name,
            format,
            text,
            sha256,
            size_bytes,
        })
    }

    pub async fn extract_bytes(format: DocumentFormat, bytes: Vec<u8>, name: String) -> Result<String> {
        let task_name = name.clone();
        tokio::task::spawn_blocking(move || format.extract(&bytes, &task_name))
            .await
            .map_err(|e| IngestError::Extraction {
                path: name,
                message: format!("extraction task failed: {}", e),
            })?
    }
}

fn extract_pdf(bytes: &[u8], name: &str) -> Result<String> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| IngestError::Extraction {
        path: name.to_string(),
        message: e.to_string(),
    })?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                // Image-only or malformed pages contribute nothing
                warn!(file = name, page = page_number, error = %e, "skipping unreadable page");
                pages.push(String::new());
            }
        }
    }

    Ok(pages.join("\n").trim().to_string())
}

fn extract_docx(bytes: &[u8], name: &str) -> Result<String> {
    let extraction_error = |message: String| IngestError::Extraction {
        path: name.to_string(),
        message,
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| extraction_error(format!("not an OOXML document: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_error(format!("missing word/document.xml: {}", e)))?
        .read_to_string(&mut xml)?;

    Ok(docx_xml_to_text(&xml))
}

/// One line per `<w:p>`, in document order
pub fn docx_xml_to_text(xml: &str) -> String {
    PARAGRAPH
        .find_iter(xml)
        .map(|paragraph| {
            let mut line = String::new();
            for run in RUN.captures_iter(paragraph.as_str()) {
                match run.get(1) {
                    Some(text) => line.push_str(&decode_entities(text.as_str())),
                    None if run[0].starts_with("<w:tab") => line.push('\t'),
                    None => line.push('\n'),
                }
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Named and numeric character references, in one pass so `&amp;lt;`
/// stays `&lt;`. Unknown or invalid references are left as written.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => {
                    let code = match entity.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => entity[1..].parse::<u32>().ok(),
                    };
                    code.and_then(char::from_u32)
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
