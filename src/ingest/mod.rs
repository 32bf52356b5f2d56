//! Document ingest
//!
//! Turns an uploaded reference document into plain text for the gap analysis
//! and comparison agents. PDF files go through `pdf-extract`; every other
//! file is decoded as UTF-8 text.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An uploaded document, held in memory for the duration of a run.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            AppError::IngestFailed(format!("cannot read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { name, bytes })
    }

    pub fn format(&self) -> DocumentFormat {
        let extension = Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => DocumentFormat::Pdf,
            _ if self.bytes.starts_with(b"%PDF-") => DocumentFormat::Pdf,
            _ => DocumentFormat::Text,
        }
    }
}

/// Where a run gets its reference document from. Files are read inside the
/// run so read errors show up in its trace.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Loaded(Document),
    File(PathBuf),
}

impl DocumentSource {
    pub fn name(&self) -> String {
        match self {
            Self::Loaded(document) => document.name.clone(),
            Self::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    pub async fn load(self) -> Result<Document> {
        match self {
            Self::Loaded(document) => Ok(document),
            Self::File(path) => Document::read(path).await,
        }
    }
}

impl From<Document> for DocumentSource {
    fn from(document: Document) -> Self {
        Self::Loaded(document)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

#[async_trait]
pub trait DocumentIngest: Send + Sync {
    /// Extract the plain text of `document`.
    ///
    /// Implementations must fail with [`AppError::IngestFailed`] rather than
    /// return an empty string.
    async fn extract_text(&self, document: &Document) -> Result<String>;
}

/// File-format aware ingest used by default.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileIngest;

#[async_trait]
impl DocumentIngest for FileIngest {
    async fn extract_text(&self, document: &Document) -> Result<String> {
        let text = match document.format() {
            DocumentFormat::Pdf => {
                let bytes = document.bytes.clone();
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| {
                        AppError::IngestFailed(format!("{}: PDF extraction aborted: {}", document.name, e))
                    })?
                    .map_err(|e| {
                        AppError::IngestFailed(format!("{}: invalid PDF: {}", document.name, e))
                    })?
            }
            DocumentFormat::Text => String::from_utf8(document.bytes.clone()).map_err(|e| {
                AppError::IngestFailed(format!("{}: not valid UTF-8 text: {}", document.name, e))
            })?,
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::IngestFailed(format!(
                "{}: no extractable text",
                document.name
            )));
        }

        debug!(document = %document.name, chars = text.len(), "Extracted reference text");
        Ok(text)
    }
}
