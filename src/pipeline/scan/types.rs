use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ScanError;
use crate::pipeline::aggregate::DocumentKey;
use crate::pipeline::extraction::DocumentType;
use crate::pipeline::summarize::SummaryResult;

// ═══════════════════════════════════════════
// Per-path state
// ═══════════════════════════════════════════

/// Scan state of one path.
///
/// `Error` only ever appears on a result card; the path itself goes back to
/// `Scannable` after a failure so it can be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Scannable,
    Processing,
    Processed,
    Error,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scannable => "scannable",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Error => "error",
        }
    }

    /// Only an in-flight scan blocks another one.
    pub fn accepts_scan(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Targets
// ═══════════════════════════════════════════

/// A validated scan request: a path relative to the upload root plus its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub path: String,
    pub doc_type: DocumentType,
}

impl ScanTarget {
    pub fn new(path: impl Into<String>, doc_type: DocumentType) -> Self {
        Self {
            path: path.into(),
            doc_type,
        }
    }

    /// Validate a client-supplied path. Rejects empty input, absolute paths
    /// and `..` components, then detects the type from the extension.
    pub fn parse(raw: &str) -> Result<Self, ScanError> {
        let path = normalize_relative(raw)?;
        let doc_type = DocumentType::from_path(&path)
            .ok_or_else(|| ScanError::UnsupportedFileType(path.clone()))?;
        Ok(Self { path, doc_type })
    }

    /// Final path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey::derive(self.doc_type, &self.path)
    }
}

/// Normalize to a `/`-separated path that stays under the upload root.
/// An empty result means "the root itself".
pub fn normalize_relative(raw: &str) -> Result<String, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanError::NoFileProvided);
    }
    let unified = trimmed.replace('\\', "/");

    let mut parts = Vec::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ScanError::InvalidPath(raw.to_string()));
            }
        }
    }
    if parts.is_empty() {
        return Err(ScanError::NoFileProvided);
    }
    Ok(parts.join("/"))
}

// ═══════════════════════════════════════════
// Result cards and outcomes
// ═══════════════════════════════════════════

/// The one visible result entry for a path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCard {
    pub card_id: String,
    pub path: String,
    pub doc_type: DocumentType,
    pub state: ScanState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<DocumentKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanCard {
    /// Fresh card for a scan that is about to start.
    pub fn processing(target: &ScanTarget) -> Self {
        Self {
            card_id: Uuid::new_v4().to_string(),
            path: target.path.clone(),
            doc_type: target.doc_type,
            state: ScanState::Processing,
            summary: None,
            key: None,
            error: None,
            scanned_at: Utc::now(),
        }
    }
}

/// Result of scanning one path.
#[derive(Debug)]
pub enum ScanOutcome {
    Processed(ScanCard),
    Failed { card: ScanCard, error: ScanError },
}

impl ScanOutcome {
    pub fn card(&self) -> &ScanCard {
        match self {
            Self::Processed(card) => card,
            Self::Failed { card, .. } => card,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }

    pub fn into_result(self) -> Result<ScanCard, ScanError> {
        match self {
            Self::Processed(card) => Ok(card),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

// ═══════════════════════════════════════════
// Batch result
// ═══════════════════════════════════════════

/// Counters for one `scan_all` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: u32,
    pub processed: u32,
    pub failed: u32,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanSummary {
    pub fn empty() -> Self {
        Self {
            total: 0,
            processed: 0,
            failed: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }
}

/// Outcomes in submission order plus counters.
#[derive(Debug)]
pub struct ScanReport {
    pub outcomes: Vec<ScanOutcome>,
    pub summary: ScanSummary,
}

impl ScanReport {
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            summary: ScanSummary::empty(),
        }
    }

    pub fn cards(&self) -> Vec<ScanCard> {
        self.outcomes.iter().map(|o| o.card().clone()).collect()
    }
}

// ═══════════════════════════════════════════
// Progress events
// ═══════════════════════════════════════════

/// Emitted while a batch runs, for progress indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Started {
        total: u32,
    },
    Progress {
        completed: u32,
        total: u32,
        current_path: String,
    },
    FileProcessed {
        path: String,
        card_id: String,
        key: String,
    },
    FileFailed {
        path: String,
        error: String,
    },
    Completed {
        processed: u32,
        failed: u32,
        duration_ms: u64,
    },
    Cancelled {
        completed: u32,
        total: u32,
    },
    /// The progress indicator can be removed.
    Cleared,
}

// ═══════════════════════════════════════════
// Cancellation
// ═══════════════════════════════════════════

/// Cooperative cancellation, checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
