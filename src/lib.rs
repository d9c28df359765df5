pub mod api; // HTTP surface: upload, scan, files, combined document
pub mod config;
pub mod core_state; // Shared by the API server and the CLI
pub mod pipeline; // Extraction → summarization → scan → aggregation

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `filter` (from the command line) wins, then `RUST_LOG`, then
/// `config::default_log_filter()`.
pub fn init_tracing(filter: Option<&str>) {
    let env_filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
    };
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
