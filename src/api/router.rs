//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! `/upload` sits at the root; everything else is nested under `/api/`.
//!
//! Layers (outermost → innermost): CORS → request tracing → handler.
//! `/upload` additionally raises the default body limit.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;
use crate::core_state::CoreState;

/// Room for multipart boundaries and the `ratio` field on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the API router over a shared `CoreState`.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/scan", post(endpoints::scan::scan_file))
        .route("/scan/batch", post(endpoints::scan::scan_batch))
        .route("/cards", get(endpoints::scan::cards))
        .route("/files", get(endpoints::files::list))
        .route(
            "/combined",
            get(endpoints::combined::get)
                .post(endpoints::combined::save)
                .delete(endpoints::combined::clear),
        );

    Router::new()
        .route(
            "/upload",
            post(endpoints::upload::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
