//! Scan endpoints: single file, batch, and the current result cards.
//!
//! Scans run on the blocking pool; extraction is CPU-bound (or a blocking
//! HTTP call for the remote backend).

use std::sync::Mutex;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::scan::{ScanCard, ScanEvent, ScanSummary, ScanTarget};
use crate::pipeline::summarize::round_one_decimal;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub filename: String,
    pub summary: String,
    pub json_data: serde_json::Value,
    pub key: String,
    pub card_id: String,
    pub original_word_count: usize,
    pub word_count: usize,
    pub reduction_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct BatchScanRequest {
    #[serde(default)]
    pub file_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchScanResponse {
    pub results: Vec<ScanCard>,
    pub events: Vec<ScanEvent>,
    pub summary: ScanSummary,
}

/// `POST /api/scan`: extract, summarize and merge one file.
pub async fn scan_file(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(request) = payload?;
    let raw = request
        .file_path
        .ok_or_else(|| ApiError::NoFileProvided("No file path provided".into()))?;

    let orchestrator = ctx.core.orchestrator().clone();
    let target = orchestrator.resolve(&raw)?;
    let filename = target.file_name().to_string();

    let outcome = tokio::task::spawn_blocking(move || orchestrator.scan_one(&target)).await??;
    let card = outcome.into_result()?;

    let summary = card
        .summary
        .ok_or_else(|| ApiError::Internal(format!("processed card {} has no summary", card.card_id)))?;
    let key = card.key.map(|k| k.into_string()).unwrap_or_default();

    Ok(Json(ScanResponse {
        filename,
        summary: summary.summary_text,
        json_data: summary.structured_data.unwrap_or(serde_json::Value::Null),
        key,
        card_id: card.card_id,
        original_word_count: summary.original_word_count,
        word_count: summary.summary_word_count,
        reduction_percentage: round_one_decimal(summary.reduction_percentage),
    }))
}

/// `POST /api/scan/batch`: scan several files in submission order.
///
/// Every path is validated before anything runs; a malformed path rejects
/// the whole request. Files that fail during the batch come back as error
/// cards and do not stop it.
pub async fn scan_batch(
    State(ctx): State<ApiContext>,
    payload: Result<Json<BatchScanRequest>, JsonRejection>,
) -> Result<Json<BatchScanResponse>, ApiError> {
    let Json(request) = payload?;
    if request.file_paths.is_empty() {
        return Err(ApiError::NoFileProvided("No file paths provided".into()));
    }

    let targets = request
        .file_paths
        .iter()
        .map(|raw| ScanTarget::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let orchestrator = ctx.core.orchestrator().clone();
    let (report, events) = tokio::task::spawn_blocking(move || {
        let events = Mutex::new(Vec::new());
        let progress_fn = |event: ScanEvent| {
            if let Ok(mut events) = events.lock() {
                events.push(event);
            }
        };
        let report = orchestrator.scan_all(&targets, None, Some(&progress_fn));
        (report, events.into_inner().unwrap_or_default())
    })
    .await?;

    Ok(Json(BatchScanResponse {
        results: report.cards(),
        events,
        summary: report.summary,
    }))
}

/// `GET /api/cards`: result cards, oldest first.
pub async fn cards(State(ctx): State<ApiContext>) -> Json<Vec<ScanCard>> {
    Json(ctx.core.orchestrator().cards())
}
