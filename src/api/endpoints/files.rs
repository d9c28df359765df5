//! File browser over the upload root.

use std::cmp::Ordering;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::DocumentType;
use crate::pipeline::scan::{normalize_relative, ScanError, ScanState};

#[derive(Debug, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    /// Relative to the upload root, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    /// Only for files the extractors support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocumentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ScanState>,
}

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    /// Listed directory relative to the upload root; empty for the root.
    pub dir: String,
    pub entries: Vec<FileEntry>,
}

/// `GET /api/files?dir=<relative>`: directories first, then files, by name.
/// Hidden entries are skipped.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<FilesQuery>,
) -> Result<Json<FilesResponse>, ApiError> {
    let dir = match query.dir.as_deref().map(normalize_relative) {
        None | Some(Err(ScanError::NoFileProvided)) => String::new(),
        Some(result) => result?,
    };

    let full = ctx.core.upload_dir().join(&dir);
    if !full.is_dir() {
        return Err(ApiError::NotFound(dir));
    }

    let mut read_dir = tokio::fs::read_dir(&full)
        .await
        .map_err(|e| ApiError::Internal(format!("Cannot list {}: {e}", full.display())))?;

    let orchestrator = ctx.core.orchestrator();
    let mut entries = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| ApiError::Internal(format!("Cannot list {}: {e}", full.display())))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        let path = if dir.is_empty() {
            name.clone()
        } else {
            format!("{dir}/{name}")
        };

        let doc_type = if is_dir {
            None
        } else {
            DocumentType::from_path(&name)
        };
        let state = doc_type.map(|_| orchestrator.state(&path));

        entries.push(FileEntry {
            name,
            path,
            is_dir,
            doc_type,
            state,
        });
    }

    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });

    Ok(Json(FilesResponse { dir, entries }))
}
