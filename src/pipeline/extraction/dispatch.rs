use super::excel::ExcelExtractor;
use super::pdf::PdfTextExtractor;
use super::types::{DocumentType, ExtractedDocument, FormatExtractor, TextExtractor};
use super::word::WordExtractor;
use super::ExtractionError;

/// In-process extractor: routes each document to the `FormatExtractor`
/// registered for its type.
pub struct LocalExtractor {
    extractors: Vec<Box<dyn FormatExtractor>>,
}

impl LocalExtractor {
    pub fn new(extractors: Vec<Box<dyn FormatExtractor>>) -> Self {
        Self { extractors }
    }

    /// PDF, Word and Excel extractors.
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(PdfTextExtractor),
            Box::new(WordExtractor),
            Box::new(ExcelExtractor),
        ])
    }

    pub fn supports(&self, doc_type: DocumentType) -> bool {
        self.extractors.iter().any(|e| e.doc_type() == doc_type)
    }

    fn get_extractor(&self, doc_type: DocumentType) -> Result<&dyn FormatExtractor, ExtractionError> {
        self.extractors
            .iter()
            .find(|e| e.doc_type() == doc_type)
            .map(|e| e.as_ref())
            .ok_or_else(|| ExtractionError::UnsupportedFormat(doc_type.to_string()))
    }
}

impl Default for LocalExtractor {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TextExtractor for LocalExtractor {
    fn extract(
        &self,
        file_name: &str,
        doc_type: DocumentType,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError> {
        let extractor = self.get_extractor(doc_type)?;
        let extracted = extractor.extract_bytes(file_name, bytes)?;
        tracing::debug!(
            file_name,
            doc_type = %doc_type,
            chars = extracted.raw_text.len(),
            "Document extracted"
        );
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::pdf::tests::make_test_pdf;
    use crate::pipeline::extraction::word::tests::make_test_docx;

    #[test]
    fn defaults_cover_every_type() {
        let extractor = LocalExtractor::with_defaults();
        for doc_type in DocumentType::all() {
            assert!(extractor.supports(*doc_type), "missing {doc_type}");
        }
    }

    #[test]
    fn routes_pdf_to_pdf_extractor() {
        let extractor = LocalExtractor::with_defaults();
        let bytes = make_test_pdf("Routing test document");
        let extracted = extractor.extract("a.pdf", DocumentType::Pdf, &bytes).unwrap();
        assert_eq!(extracted.structured["page_count"], 1);
    }

    #[test]
    fn routes_word_to_word_extractor() {
        let extractor = LocalExtractor::with_defaults();
        let bytes = make_test_docx(&["A paragraph long enough to be kept."]);
        let extracted = extractor.extract("a.docx", DocumentType::Word, &bytes).unwrap();
        assert!(extracted.raw_text.contains("long enough"));
    }

    #[test]
    fn wrong_bytes_for_type_fail_cleanly() {
        let extractor = LocalExtractor::with_defaults();
        let bytes = make_test_docx(&["hello"]);
        assert!(extractor.extract("a.pdf", DocumentType::Pdf, &bytes).is_err());
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let extractor = LocalExtractor::new(vec![Box::new(PdfTextExtractor)]);
        assert!(!extractor.supports(DocumentType::Excel));
        let result = extractor.extract("a.xlsx", DocumentType::Excel, b"");
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat(_))));
    }
}
