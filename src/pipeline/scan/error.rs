use thiserror::Error;

use crate::pipeline::aggregate::AggregateError;
use crate::pipeline::extraction::ExtractionError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No file provided")]
    NoFileProvided,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Extraction backend unavailable: {0}")]
    NetworkFailure(String),

    #[error("Failed to persist combined document: {0}")]
    Persistence(#[from] AggregateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan already in progress for {0}")]
    ScanInProgress(String),
}

impl ScanError {
    /// Stable machine-readable code, also used as the HTTP error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFileProvided => "NO_FILE_PROVIDED",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            Self::ExtractionFailure(_) => "EXTRACTION_FAILURE",
            Self::NetworkFailure(_) => "NETWORK_FAILURE",
            Self::Persistence(_) => "PERSISTENCE",
            Self::Io(_) => "IO",
            Self::ScanInProgress(_) => "SCAN_IN_PROGRESS",
        }
    }
}

impl From<ExtractionError> for ScanError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(what) => Self::UnsupportedFileType(what),
            ExtractionError::Network(_) | ExtractionError::RemoteBackend { .. } => {
                Self::NetworkFailure(err.to_string())
            }
            other => Self::ExtractionFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_map_to_network_failure() {
        let err: ScanError = ExtractionError::Network("refused".into()).into();
        assert_eq!(err.code(), "NETWORK_FAILURE");

        let err: ScanError = ExtractionError::RemoteBackend {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.code(), "NETWORK_FAILURE");
    }

    #[test]
    fn parse_errors_map_to_extraction_failure() {
        let err: ScanError = ExtractionError::PdfParsing("bad xref".into()).into();
        assert_eq!(err.code(), "EXTRACTION_FAILURE");
        assert!(err.to_string().contains("bad xref"));
    }

    #[test]
    fn unsupported_format_maps_to_unsupported_type() {
        let err: ScanError = ExtractionError::UnsupportedFormat("png".into()).into();
        assert!(matches!(err, ScanError::UnsupportedFileType(_)));
    }
}
