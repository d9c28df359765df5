//! API error types with structured JSON responses.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::aggregate::AggregateError;
use crate::pipeline::scan::ScanError;

/// Error response body: `{"error": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NoFileProvided(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),
    #[error("Extraction backend unavailable: {0}")]
    NetworkFailure(String),
    #[error("Scan already in progress: {0}")]
    ScanInProgress(String),
    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::NoFileProvided(detail) => (
                StatusCode::BAD_REQUEST,
                "NO_FILE_PROVIDED",
                detail.clone(),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::InvalidPath(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_PATH",
                format!("Invalid path: {detail}"),
            ),
            ApiError::UnsupportedFileType(detail) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE_TYPE",
                format!("Unsupported file type: {detail}"),
            ),
            ApiError::NotFound(detail) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {detail}"),
            ),
            ApiError::ExtractionFailure(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILURE",
                detail.clone(),
            ),
            ApiError::NetworkFailure(detail) => {
                tracing::warn!(detail, "Extraction backend unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "NETWORK_FAILURE",
                    "Extraction backend unavailable".to_string(),
                )
            }
            ApiError::ScanInProgress(path) => (
                StatusCode::CONFLICT,
                "SCAN_IN_PROGRESS",
                format!("Scan already in progress for {path}"),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                format!(
                    "Upload exceeds {} MiB",
                    crate::config::MAX_UPLOAD_BYTES / (1024 * 1024)
                ),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: message,
                code,
            }),
        )
            .into_response()
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::NoFileProvided => ApiError::NoFileProvided("No file provided".into()),
            ScanError::InvalidPath(path) => ApiError::InvalidPath(path),
            ScanError::NotFound(path) => ApiError::NotFound(path),
            ScanError::UnsupportedFileType(what) => ApiError::UnsupportedFileType(what),
            ScanError::ExtractionFailure(detail) => ApiError::ExtractionFailure(detail),
            ScanError::NetworkFailure(detail) => ApiError::NetworkFailure(detail),
            ScanError::ScanInProgress(path) => ApiError::ScanInProgress(path),
            ScanError::Persistence(e) => e.into(),
            ScanError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        match err {
            AggregateError::NotAnObject => {
                ApiError::BadRequest("Combined document must be a JSON object".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn no_file_returns_400_with_flat_body() {
        let response = ApiError::NoFileProvided("No file part".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No file part");
        assert_eq!(json["code"], "NO_FILE_PROVIDED");
    }

    #[tokio::test]
    async fn extraction_failure_returns_422() {
        let response = ApiError::ExtractionFailure("bad xref".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "EXTRACTION_FAILURE");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn network_failure_returns_502_without_backend_detail() {
        let response = ApiError::NetworkFailure("10.0.0.5 refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert!(!json["error"].as_str().unwrap().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn payload_too_large_returns_413() {
        let response = ApiError::PayloadTooLarge.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["error"], "Upload exceeds 16 MiB");
    }

    #[test]
    fn scan_errors_map_to_matching_kinds() {
        assert!(matches!(
            ApiError::from(ScanError::NotFound("a.pdf".into())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(ScanError::InvalidPath("../a.pdf".into())),
            ApiError::InvalidPath(_)
        ));
        assert!(matches!(
            ApiError::from(ScanError::ScanInProgress("a.pdf".into())),
            ApiError::ScanInProgress(_)
        ));
        assert!(matches!(
            ApiError::from(ScanError::Persistence(AggregateError::Persistence("full".into()))),
            ApiError::Internal(_)
        ));
    }

    #[tokio::test]
    async fn scan_in_progress_returns_409() {
        let err: ApiError = ScanError::ScanInProgress("a.pdf".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn non_object_document_is_a_bad_request() {
        assert!(matches!(
            ApiError::from(AggregateError::NotAnObject),
            ApiError::BadRequest(_)
        ));
    }
}
