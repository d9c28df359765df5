//! Combined document endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Debug, Serialize)]
pub struct CombinedSaved {
    pub entries: usize,
}

#[derive(Debug, Serialize)]
pub struct CombinedCleared {
    pub cleared: bool,
}

/// `GET /api/combined`
pub async fn get(State(ctx): State<ApiContext>) -> Json<Value> {
    Json(ctx.core.store().serialize())
}

/// `POST /api/combined`: replace the whole document. `{}` clears it.
pub async fn save(
    State(ctx): State<ApiContext>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CombinedSaved>, ApiError> {
    let Json(document) = payload?;
    let store = ctx.core.store().clone();
    let entries = tokio::task::spawn_blocking(move || {
        store.replace(document)?;
        Ok::<_, ApiError>(store.len())
    })
    .await??;
    Ok(Json(CombinedSaved { entries }))
}

/// `DELETE /api/combined`: clear the document along with all result cards.
pub async fn clear(State(ctx): State<ApiContext>) -> Result<Json<CombinedCleared>, ApiError> {
    let orchestrator = ctx.core.orchestrator().clone();
    tokio::task::spawn_blocking(move || orchestrator.clear_all()).await??;
    Ok(Json(CombinedCleared { cleared: true }))
}
