use serde_json::json;

use super::types::{DocumentType, ExtractedDocument, FormatExtractor, PageExtraction};
use super::ExtractionError;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; scanned pages come back empty.
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageExtraction>, ExtractionError> {
        let page_texts = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        Ok(page_texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageExtraction {
                page_number: i + 1,
                text,
            })
            .collect())
    }
}

impl FormatExtractor for PdfTextExtractor {
    fn doc_type(&self) -> DocumentType {
        DocumentType::Pdf
    }

    fn extract_bytes(
        &self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError> {
        let pages = self.extract_pages(bytes)?;

        let mut raw_text = String::new();
        for page in &pages {
            raw_text.push_str(&page.text);
            raw_text.push('\n');
        }

        if raw_text.trim().is_empty() {
            tracing::debug!(file_name, "PDF has no text layer");
        }

        let structured = json!({
            "file_name": file_name,
            "page_count": pages.len(),
            "pages": pages,
            "text": raw_text,
        });

        Ok(ExtractedDocument {
            raw_text,
            structured,
        })
    }
}
