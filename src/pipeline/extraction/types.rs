use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Document families the pipeline can extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Pdf,
    Word,
    Excel,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Excel => "excel",
        }
    }

    /// Map a file extension (case-insensitive, without the dot).
    ///
    /// Legacy binary `.doc` is not accepted: docx-rs only reads the
    /// OOXML package format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Word),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Detect the type from a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// MIME type used when forwarding bytes to a remote backend.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn all() -> &'static [DocumentType] {
        &[Self::Pdf, Self::Word, Self::Excel]
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a `TextExtractor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub raw_text: String,
    /// Type-specific JSON object (pages, paragraphs, sheets...).
    pub structured: serde_json::Value,
}

/// Per-page PDF text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExtraction {
    pub page_number: usize,
    pub text: String,
}

/// Workbook-level statistics, returned to upload clients for Excel files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExcelMetadata {
    pub sheet_count: usize,
    pub total_rows: usize,
    pub total_columns: usize,
    pub sheet_names: Vec<String>,
}

/// Extraction for one document family.
pub trait FormatExtractor: Send + Sync {
    /// Which type this extractor handles.
    fn doc_type(&self) -> DocumentType;

    fn extract_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError>;
}

/// Main extraction seam used by the scan orchestrator and upload endpoint.
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        file_name: &str,
        doc_type: DocumentType,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError>;
}
