use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::AggregateError;

/// Where a serialized combined document (or session snapshot) lives.
pub trait Persistence: Send + Sync {
    /// Stored contents, or `None` when nothing has been written yet.
    fn load(&self) -> Result<Option<String>, AggregateError>;

    /// Replace the stored contents.
    fn save(&self, contents: &str) -> Result<(), AggregateError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// JSON file on disk. Writes go to a temp file in the same directory and are
/// renamed over the target, so readers never see a half-written file.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<String>, AggregateError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, contents: &str) -> Result<(), AggregateError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| AggregateError::Persistence(e.to_string()))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Process-local persistence. Used when no data directory is wanted and in
/// tests, where `set_fail_writes` simulates a failing disk.
#[derive(Default)]
pub struct MemoryPersistence {
    contents: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: &str) -> Self {
        Self {
            contents: Mutex::new(Some(contents.to_string())),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Last successfully saved contents.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Option<String>, AggregateError> {
        self.contents
            .lock()
            .map(|c| c.clone())
            .map_err(|_| AggregateError::LockPoisoned)
    }

    fn save(&self, contents: &str) -> Result<(), AggregateError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AggregateError::Persistence("simulated write failure".into()));
        }
        let mut guard = self.contents.lock().map_err(|_| AggregateError::LockPoisoned)?;
        *guard = Some(contents.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
