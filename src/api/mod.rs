//! HTTP API.
//!
//! `/upload` summarizes a document without touching the combined document.
//! Everything else lives under `/api/`: scanning files below the upload
//! root, browsing them, and reading or resetting the combined document.
//!
//! `api_router()` returns a `Router` that can be mounted on any axum server;
//! `server` binds it and handles shutdown.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{serve, start_api_server_on, ApiServer};
pub use types::ApiContext;
