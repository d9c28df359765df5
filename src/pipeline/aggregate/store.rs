use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use super::key::DocumentKey;
use super::persistence::{JsonFilePersistence, MemoryPersistence, Persistence};
use super::AggregateError;

/// Combined document: `DocumentKey -> structured data`, in first-insertion
/// order, written through to durable storage on every mutation.
///
/// One mutex guards both the map and the writes, so a merge or clear is
/// never observable half-applied.
pub struct AggregationStore {
    entries: Mutex<Map<String, Value>>,
    durable: Arc<dyn Persistence>,
    snapshot: Option<Arc<dyn Persistence>>,
}

impl AggregationStore {
    pub fn new(durable: Arc<dyn Persistence>, snapshot: Option<Arc<dyn Persistence>>) -> Self {
        Self {
            entries: Mutex::new(Map::new()),
            durable,
            snapshot,
        }
    }

    /// Store backed by a JSON file plus a recovery snapshot file.
    pub fn with_files(combined: impl AsRef<Path>, snapshot: impl AsRef<Path>) -> Self {
        Self::new(
            Arc::new(JsonFilePersistence::new(combined.as_ref())),
            Some(Arc::new(JsonFilePersistence::new(snapshot.as_ref()))),
        )
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersistence::new()), None)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Map<String, Value>>, AggregateError> {
        self.entries.lock().map_err(|_| AggregateError::LockPoisoned)
    }

    // Snapshot is advisory; a failed write is logged and otherwise ignored.
    fn write_snapshot(&self, serialized: &str) {
        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(serialized) {
                tracing::warn!(
                    location = %snapshot.describe(),
                    error = %e,
                    "Failed to write combined document snapshot"
                );
            }
        }
    }

    /// Insert or overwrite `key`, then persist the whole document. If the
    /// durable write fails the in-memory entry is rolled back.
    pub fn merge(&self, key: &DocumentKey, data: Value) -> Result<(), AggregateError> {
        let mut entries = self.lock()?;
        let previous = entries.insert(key.to_string(), data);

        let persisted = serde_json::to_string(&*entries)
            .map_err(AggregateError::from)
            .and_then(|serialized| {
                self.durable.save(&serialized)?;
                Ok(serialized)
            });

        match persisted {
            Ok(serialized) => {
                self.write_snapshot(&serialized);
                tracing::debug!(key = %key, entries = entries.len(), "Merged into combined document");
                Ok(())
            }
            Err(e) => {
                match previous {
                    // Overwriting an existing key keeps its position.
                    Some(old) => {
                        entries.insert(key.to_string(), old);
                    }
                    // A new key was appended last, so removing it keeps the order of the rest.
                    None => {
                        entries.remove(key.as_str());
                    }
                }
                tracing::error!(key = %key, error = %e, "Combined document merge rolled back");
                Err(e)
            }
        }
    }

    /// Forget every entry and persist `{}`.
    pub fn clear(&self) -> Result<(), AggregateError> {
        let mut entries = self.lock()?;
        self.durable.save("{}")?;
        entries.clear();
        self.write_snapshot("{}");
        tracing::info!("Combined document cleared");
        Ok(())
    }

    /// Replace the whole document with `document` and persist it.
    pub fn replace(&self, document: Value) -> Result<(), AggregateError> {
        let Value::Object(new_entries) = document else {
            return Err(AggregateError::NotAnObject);
        };
        let mut entries = self.lock()?;
        let serialized = serde_json::to_string(&new_entries)?;
        self.durable.save(&serialized)?;
        *entries = new_entries;
        self.write_snapshot(&serialized);
        tracing::info!(entries = entries.len(), "Combined document replaced");
        Ok(())
    }

    /// The combined document as a JSON object.
    pub fn serialize(&self) -> Value {
        self.lock()
            .map(|entries| Value::Object(entries.clone()))
            .unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Rehydrate the in-memory document from serialized JSON. Malformed or
    /// non-object input leaves the store empty. Returns the entry count.
    pub fn restore(&self, json: &str) -> Result<usize, AggregateError> {
        let restored = match parse_document(json) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed combined document");
                Map::new()
            }
        };
        let mut entries = self.lock()?;
        *entries = restored;
        Ok(entries.len())
    }

    /// Restore from the durable adapter, falling back to the snapshot when
    /// the durable copy is missing or malformed.
    pub fn load(&self) -> Result<usize, AggregateError> {
        let mut sources = vec![self.durable.clone()];
        sources.extend(self.snapshot.clone());

        for source in sources {
            let contents = match source.load() {
                Ok(Some(contents)) => contents,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(source = %source.describe(), error = %e, "Cannot read combined document");
                    continue;
                }
            };
            match parse_document(&contents) {
                Ok(map) => {
                    let mut entries = self.lock()?;
                    *entries = map;
                    tracing::info!(source = %source.describe(), entries = entries.len(), "Combined document loaded");
                    return Ok(entries.len());
                }
                Err(e) => {
                    tracing::warn!(source = %source.describe(), error = %e, "Ignoring malformed combined document");
                }
            }
        }

        let mut entries = self.lock()?;
        entries.clear();
        Ok(0)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().ok().and_then(|entries| entries.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

fn parse_document(json: &str) -> Result<Map<String, Value>, AggregateError> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AggregateError::MalformedPersistedState(format!(
            "expected object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(AggregateError::MalformedPersistedState(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
