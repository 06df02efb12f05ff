mod parsers;

use crate::domain::error::{AppError, Result};
use crate::domain::pipeline::UploadedFile;
use tracing::{debug, info};

/// Pulls plain text out of an uploaded document.
pub trait TextExtractor {
    /// `Ok(None)` for file types that are not supported; they contribute no text.
    fn extract(&self, file: &UploadedFile) -> Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Word,
    Text,
}

impl DocumentKind {
    fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentKind::Pdf)
        } else if lower.ends_with(".docx") || lower.ends_with(".doc") {
            Some(DocumentKind::Word)
        } else if lower.ends_with(".txt") {
            Some(DocumentKind::Text)
        } else {
            None
        }
    }
}

/// Extractor for PDF, DOC/DOCX, and plain text uploads.
#[derive(Debug, Default)]
pub struct DocumentTextExtractor;

impl DocumentTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for DocumentTextExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<Option<String>> {
        let Some(kind) = DocumentKind::from_filename(&file.filename) else {
            debug!("Skipping unsupported file {}", file.filename);
            return Ok(None);
        };
        info!("Processing file: {} ({:?})", file.filename, kind);

        let parsed = match kind {
            DocumentKind::Pdf => parsers::pdf::parse_pdf(&file.bytes),
            DocumentKind::Word => parsers::docx::parse_docx(&file.bytes),
            DocumentKind::Text => parsers::txt::parse_txt(&file.bytes),
        };

        parsed.map(|text| Some(text.trim().to_string())).map_err(|detail| {
            AppError::ExtractionError(format!("Error parsing file {}: {}", file.filename, detail))
        })
    }
}

/// Text of every supported file in upload order. The first failure aborts.
pub fn extract_all(extractor: &dyn TextExtractor, files: &[UploadedFile]) -> Result<Vec<String>> {
    let mut texts = Vec::new();
    for file in files {
        if let Some(text) = extractor.extract(file)? {
            texts.push(text);
        }
    }
    Ok(texts)
}
