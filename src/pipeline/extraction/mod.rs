//! Text extraction: uploaded document bytes in, raw text plus a structured
//! JSON description of the document out.
//!
//! One `FormatExtractor` per document type. `LocalExtractor` dispatches on
//! type and `RemoteExtractor` forwards bytes to an out-of-process backend.
//! Both implement `TextExtractor`, the seam the scan orchestrator uses.

pub mod types;
pub mod pdf;
pub mod word;
pub mod excel;
pub mod remote;
pub mod dispatch;

pub use types::*;
pub use pdf::PdfTextExtractor;
pub use word::WordExtractor;
pub use excel::ExcelExtractor;
pub use remote::RemoteExtractor;
pub use dispatch::LocalExtractor;

use std::sync::Arc;

use thiserror::Error;

/// Request timeout for the remote extraction backend.
pub const REMOTE_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Word parsing failed: {0}")]
    WordParsing(String),

    #[error("Excel parsing failed: {0}")]
    ExcelParsing(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction backend unreachable: {0}")]
    Network(String),

    #[error("Extraction backend returned {status}: {message}")]
    RemoteBackend { status: u16, message: String },
}

impl ExtractionError {
    /// True when the failure came from talking to a remote backend rather
    /// than from the document itself.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// In-process parsing, or the remote backend at `remote_url` when given.
pub fn extractor_for(remote_url: Option<&str>) -> Arc<dyn TextExtractor> {
    match remote_url {
        Some(url) => {
            tracing::info!(url, "Using remote extraction backend");
            Arc::new(RemoteExtractor::new(url, REMOTE_TIMEOUT_SECS))
        }
        None => Arc::new(LocalExtractor::with_defaults()),
    }
}
