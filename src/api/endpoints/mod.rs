//! API endpoint handlers, one module per resource.

pub mod combined;
pub mod files;
pub mod health;
pub mod scan;
pub mod upload;
