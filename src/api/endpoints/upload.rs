//! Document upload endpoint.
//!
//! `POST /upload`: multipart `file` plus an optional `ratio`. The file is
//! stored under the upload root, then extracted and summarized in one go.
//! Uploading does not touch the combined document; scan the stored file for that.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::{DEFAULT_SUMMARY_RATIO, MAX_UPLOAD_BYTES};
use crate::pipeline::extraction::excel::metadata_from_structured;
use crate::pipeline::extraction::{DocumentType, ExcelMetadata};
use crate::pipeline::scan::ScanError;
use crate::pipeline::summarize::{round_one_decimal, summarizer_for};

/// Longest stored file name, in characters.
const MAX_FILENAME_CHARS: usize = 100;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub summary: String,
    pub original_word_count: usize,
    pub word_count: usize,
    pub reduction_percentage: f64,
    pub file_type: DocumentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excel_metadata: Option<ExcelMetadata>,
}

/// `POST /upload`
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut ratio_field: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await?;
                file = Some((filename, data.to_vec()));
            }
            "ratio" => {
                ratio_field = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| ApiError::NoFileProvided("No file part".into()))?;
    if filename.trim().is_empty() {
        return Err(ApiError::NoFileProvided("No file selected".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }
    let ratio = parse_ratio(ratio_field.as_deref())?;
    let doc_type = DocumentType::from_path(&filename)
        .ok_or_else(|| ApiError::UnsupportedFileType(filename.clone()))?;

    let stored_name = sanitize_filename(&filename);
    let upload_dir = ctx.core.upload_dir().to_path_buf();
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Upload directory: {e}")))?;
    tokio::fs::write(upload_dir.join(&stored_name), &data)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to store upload: {e}")))?;

    tracing::info!(
        file = %stored_name,
        doc_type = %doc_type,
        bytes = data.len(),
        ratio,
        "Upload received"
    );

    let extractor = ctx.core.extractor().clone();
    let summarizer = summarizer_for(ctx.core.config.summary_mode, ratio);
    let (summary, structured) = tokio::task::spawn_blocking(move || {
        let extracted = extractor.extract(&stored_name, doc_type, &data)?;
        let summary = summarizer.summarize(&extracted.raw_text);
        Ok::<_, ScanError>((summary, extracted.structured))
    })
    .await??;

    let excel_metadata = match doc_type {
        DocumentType::Excel => metadata_from_structured(&structured),
        _ => None,
    };

    Ok(Json(UploadResponse {
        summary: summary.summary_text,
        original_word_count: summary.original_word_count,
        word_count: summary.summary_word_count,
        reduction_percentage: round_one_decimal(summary.reduction_percentage),
        file_type: doc_type,
        excel_metadata,
    }))
}

/// Missing or blank means the default; anything else must be a number in [0, 1].
fn parse_ratio(raw: Option<&str>) -> Result<f64, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(DEFAULT_SUMMARY_RATIO);
    };
    match raw.parse::<f64>() {
        Ok(ratio) if (0.0..=1.0).contains(&ratio) => Ok(ratio),
        _ => Err(ApiError::BadRequest(format!(
            "ratio must be a number between 0 and 1, got '{raw}'"
        ))),
    }
}

/// Sanitize a client-supplied file name for storage under the upload root.
///
/// Keeps only the final path component, replaces anything outside
/// `[alphanumeric . - _]` with `_` and removes `..` sequences.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let sanitized: String = base
        .chars()
        .filter(|&c| c != '\0')
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let sanitized = sanitized.replace("..", "");
    let sanitized: String = sanitized.chars().take(MAX_FILENAME_CHARS).collect();

    if sanitized.is_empty() || sanitized == "." {
        "document".into()
    } else {
        sanitized
    }
}
