//! Application state shared by the HTTP API and the CLI.
//!
//! `CoreState` owns the aggregation store, the scan orchestrator and the
//! extractor they share. It is wrapped in `Arc` at startup; every component
//! inside is already safe to use from several threads.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{self, AppConfig};
use crate::pipeline::aggregate::{AggregateError, AggregationStore, JsonFilePersistence};
use crate::pipeline::extraction::{self, TextExtractor};
use crate::pipeline::scan::ScanOrchestrator;
use crate::pipeline::summarize::{self, Summarizer};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot load combined document: {0}")]
    Store(#[from] AggregateError),
}

pub struct CoreState {
    pub config: AppConfig,
    extractor: Arc<dyn TextExtractor>,
    store: Arc<AggregationStore>,
    orchestrator: Arc<ScanOrchestrator>,
}

impl CoreState {
    /// Create the data and upload directories, load the combined document
    /// and restore the last scan session.
    pub fn open(config: AppConfig) -> Result<Self, CoreError> {
        let extractor = extraction::extractor_for(config.extractor_url.as_deref());
        Self::open_with_extractor(config, extractor)
    }

    /// Same as `open`, with an explicit extractor.
    pub fn open_with_extractor(
        config: AppConfig,
        extractor: Arc<dyn TextExtractor>,
    ) -> Result<Self, CoreError> {
        create_dir(&config.data_dir)?;
        create_dir(&config.upload_dir)?;

        let store = Arc::new(AggregationStore::with_files(
            config.combined_path(),
            config.snapshot_path(),
        ));
        let entries = store.load()?;

        let summarizer: Arc<dyn Summarizer> = Arc::from(summarize::summarizer_for(
            config.summary_mode,
            config::DEFAULT_SUMMARY_RATIO,
        ));
        let orchestrator = ScanOrchestrator::new(
            config.upload_dir.clone(),
            extractor.clone(),
            summarizer,
            store.clone(),
        )
        .with_session(Arc::new(JsonFilePersistence::new(config.session_path())));
        let restored = orchestrator.restore_session();

        tracing::info!(
            data_dir = %config.data_dir.display(),
            upload_dir = %config.upload_dir.display(),
            mode = config.summary_mode.as_str(),
            entries,
            restored,
            "Core state ready"
        );

        Ok(Self {
            config,
            extractor,
            store,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn extractor(&self) -> &Arc<dyn TextExtractor> {
        &self.extractor
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &Arc<ScanOrchestrator> {
        &self.orchestrator
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }
}

fn create_dir(path: &Path) -> Result<(), CoreError> {
    std::fs::create_dir_all(path).map_err(|source| CoreError::CreateDir {
        path: path.display().to_string(),
        source,
    })
}
