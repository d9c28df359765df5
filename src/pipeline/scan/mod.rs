//! Scan orchestration.
//!
//! Turns a list of paths under the upload root into result cards: each path
//! is extracted, summarized and merged into the aggregation store, strictly
//! one at a time and in submission order.
//!
//! ```text
//! ScanTarget → TextExtractor → Summarizer → AggregationStore
//!                   ↓ progress events (ScanEvent)
//! ```

pub mod error;
pub mod types;
pub mod session;
pub mod orchestrator;
pub mod worker;

pub use error::ScanError;
pub use types::*;
pub use session::{SessionSnapshot, SessionStore};
pub use orchestrator::ScanOrchestrator;
pub use worker::{spawn_scan_job, ScanJob};
