//! Aggregation of scan results into one combined JSON document.
//!
//! Each successful scan merges its structured data under a `DocumentKey`.
//! The document is written through to a `Persistence` adapter on every
//! mutation and mirrored to an optional recovery snapshot.

pub mod error;
pub mod key;
pub mod persistence;
pub mod store;

pub use error::AggregateError;
pub use key::{sanitize, DocumentKey};
pub use persistence::{JsonFilePersistence, MemoryPersistence, Persistence};
pub use store::AggregationStore;
