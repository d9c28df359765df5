use serde::Deserialize;

use super::types::{DocumentType, ExtractedDocument, TextExtractor};
use super::ExtractionError;

/// Forwards document bytes to an out-of-process extraction service.
///
/// The service receives a multipart `file` at `POST {base_url}/extract` and
/// answers `{"text": "...", "json_data": {...}}`.
pub struct RemoteExtractor {
    base_url: String,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct RemoteExtractResponse {
    text: String,
    #[serde(default)]
    json_data: serde_json::Value,
}

impl RemoteExtractor {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // Built per call: a blocking client must not be created or dropped on an
    // async worker thread.
    fn client(&self) -> Result<reqwest::blocking::Client, ExtractionError> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Network(e.to_string()))
    }
}

impl TextExtractor for RemoteExtractor {
    fn extract(
        &self,
        file_name: &str,
        doc_type: DocumentType,
        bytes: &[u8],
    ) -> Result<ExtractedDocument, ExtractionError> {
        let url = format!("{}/extract", self.base_url);

        let part = reqwest::blocking::multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(doc_type.mime_type())
            .map_err(|e| ExtractionError::Network(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .text("doc_type", doc_type.as_str())
            .part("file", part);

        let response = self
            .client()?
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::Network(format!("cannot connect to {}", self.base_url))
                } else if e.is_timeout() {
                    ExtractionError::Network(format!(
                        "request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ExtractionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(ExtractionError::RemoteBackend {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: RemoteExtractResponse = response
            .json()
            .map_err(|e| ExtractionError::Network(format!("invalid response body: {e}")))?;

        tracing::debug!(file_name, doc_type = %doc_type, "Remote extraction complete");

        Ok(ExtractedDocument {
            raw_text: parsed.text,
            structured: parsed.json_data,
        })
    }
}
