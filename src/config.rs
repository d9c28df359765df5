use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "DocDigest";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum accepted upload size (16 MiB).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Share of sentences kept by the frequency summarizer when the client sends no ratio.
pub const DEFAULT_SUMMARY_RATIO: f64 = 0.3;

/// Delay before the async scan worker tells listeners to drop the progress indicator.
pub const DEFAULT_PROGRESS_GRACE_MS: u64 = 1500;

const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docdigest=info,docdigest_lib=info,tower_http=info"
}

/// Get the application data directory
/// ~/DocDigest/ on all platforms, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => PathBuf::from(APP_NAME),
    }
}

/// Which summarizer backs the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// First, middle and last qualifying sentence.
    KeySentence,
    /// Top sentences by word frequency, sized by the request ratio.
    Frequency,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeySentence => "key_sentence",
            Self::Frequency => "frequency",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "key_sentence" => Some(Self::KeySentence),
            "frequency" => Some(Self::Frequency),
            _ => None,
        }
    }
}

/// Runtime configuration, assembled from defaults, environment and CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Holds the combined document, its snapshot and the session file.
    pub data_dir: PathBuf,
    /// Root under which every scan path is resolved.
    pub upload_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub summary_mode: SummaryMode,
    /// Remote extraction backend. `None` parses documents in process.
    pub extractor_url: Option<String>,
    pub progress_grace_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            upload_dir: data_dir.join("uploads"),
            data_dir,
            bind_addr: DEFAULT_BIND.parse().unwrap_or_else(|_| {
                SocketAddr::from(([127, 0, 0, 1], 5000))
            }),
            summary_mode: SummaryMode::KeySentence,
            extractor_url: None,
            progress_grace_ms: DEFAULT_PROGRESS_GRACE_MS,
        }
    }
}

impl AppConfig {
    /// Defaults overridden by `DOCDIGEST_*` environment variables.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("DOCDIGEST_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
            config.upload_dir = config.data_dir.join("uploads");
        }
        if let Some(dir) = lookup("DOCDIGEST_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("DOCDIGEST_BIND") {
            match addr.parse() {
                Ok(parsed) => config.bind_addr = parsed,
                Err(e) => tracing::warn!(value = %addr, error = %e, "Ignoring invalid DOCDIGEST_BIND"),
            }
        }
        if let Some(mode) = lookup("DOCDIGEST_SUMMARY_MODE") {
            match SummaryMode::from_str(&mode) {
                Some(parsed) => config.summary_mode = parsed,
                None => tracing::warn!(value = %mode, "Ignoring unknown DOCDIGEST_SUMMARY_MODE"),
            }
        }
        if let Some(url) = lookup("DOCDIGEST_EXTRACTOR_URL") {
            if !url.trim().is_empty() {
                config.extractor_url = Some(url);
            }
        }
        if let Some(ms) = lookup("DOCDIGEST_PROGRESS_GRACE_MS") {
            match ms.parse() {
                Ok(parsed) => config.progress_grace_ms = parsed,
                Err(e) => tracing::warn!(value = %ms, error = %e, "Ignoring invalid DOCDIGEST_PROGRESS_GRACE_MS"),
            }
        }

        config
    }

    /// Durable copy of the combined document.
    pub fn combined_path(&self) -> PathBuf {
        self.data_dir.join("combined_data.json")
    }

    /// Recovery mirror of the combined document.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("combined_data.snapshot.json")
    }

    /// Processed paths and card ids from the last session.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn progress_grace(&self) -> Duration {
        Duration::from_millis(self.progress_grace_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with("DocDigest"));
    }

    #[test]
    fn defaults_put_uploads_under_data_dir() {
        let config = AppConfig::default();
        assert!(config.upload_dir.starts_with(&config.data_dir));
        assert_eq!(config.summary_mode, SummaryMode::KeySentence);
        assert_eq!(config.bind_addr.port(), 5000);
        assert!(config.extractor_url.is_none());
    }

    #[test]
    fn env_overrides_data_and_upload_dirs() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOCDIGEST_DATA_DIR", "/srv/digest"),
            ("DOCDIGEST_UPLOAD_DIR", "/srv/files"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/srv/digest"));
        assert_eq!(config.upload_dir, PathBuf::from("/srv/files"));
        assert_eq!(config.combined_path(), PathBuf::from("/srv/digest/combined_data.json"));
    }

    #[test]
    fn data_dir_override_moves_default_upload_dir() {
        let config = AppConfig::from_lookup(lookup_from(&[("DOCDIGEST_DATA_DIR", "/srv/digest")]));
        assert_eq!(config.upload_dir, PathBuf::from("/srv/digest/uploads"));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DOCDIGEST_BIND", "not-an-address"),
            ("DOCDIGEST_SUMMARY_MODE", "llm"),
            ("DOCDIGEST_PROGRESS_GRACE_MS", "soon"),
        ]));
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.summary_mode, SummaryMode::KeySentence);
        assert_eq!(config.progress_grace_ms, DEFAULT_PROGRESS_GRACE_MS);
    }

    #[test]
    fn summary_mode_roundtrips_through_str() {
        for mode in [SummaryMode::KeySentence, SummaryMode::Frequency] {
            assert_eq!(SummaryMode::from_str(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn blank_extractor_url_is_ignored() {
        let config = AppConfig::from_lookup(lookup_from(&[("DOCDIGEST_EXTRACTOR_URL", "  ")]));
        assert!(config.extractor_url.is_none());
    }

    #[test]
    fn app_name_is_docdigest() {
        assert_eq!(APP_NAME, "DocDigest");
    }
}
