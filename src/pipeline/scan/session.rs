use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pipeline::aggregate::{AggregateError, Persistence};

/// Advisory recovery state: which paths were processed and which card
/// belonged to each path. Never authoritative; malformed content is dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// In first-processed order, no duplicates.
    pub processed_paths: Vec<String>,
    pub card_ids: BTreeMap<String, String>,
}

impl SessionSnapshot {
    /// Parse a persisted snapshot, treating anything malformed as empty.
    pub fn restore(json: &str) -> Self {
        match serde_json::from_str::<SessionSnapshot>(json) {
            Ok(mut snapshot) => {
                let mut seen = std::collections::HashSet::new();
                snapshot.processed_paths.retain(|p| seen.insert(p.clone()));
                snapshot
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed session snapshot");
                Self::default()
            }
        }
    }

    pub fn mark_processed(&mut self, path: &str) {
        if !self.processed_paths.iter().any(|p| p == path) {
            self.processed_paths.push(path.to_string());
        }
    }

    /// A failed scan takes the path out of the processed set.
    pub fn mark_failed(&mut self, path: &str) {
        self.processed_paths.retain(|p| p != path);
    }

    pub fn is_processed(&self, path: &str) -> bool {
        self.processed_paths.iter().any(|p| p == path)
    }
}

/// Reads and writes the session snapshot through a `Persistence` adapter.
/// Failures are logged, never returned.
pub struct SessionStore {
    persistence: Arc<dyn Persistence>,
}

impl SessionStore {
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }

    pub fn load(&self) -> SessionSnapshot {
        match self.persistence.load() {
            Ok(Some(json)) => SessionSnapshot::restore(&json),
            Ok(None) => SessionSnapshot::default(),
            Err(e) => {
                tracing::warn!(
                    location = %self.persistence.describe(),
                    error = %e,
                    "Cannot read session snapshot"
                );
                SessionSnapshot::default()
            }
        }
    }

    pub fn save(&self, snapshot: &SessionSnapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(AggregateError::from)
            .and_then(|json| self.persistence.save(&json));
        if let Err(e) = result {
            tracing::warn!(
                location = %self.persistence.describe(),
                error = %e,
                "Failed to write session snapshot"
            );
        }
    }
}
