//! Sequential scan loop: extract, summarize, merge, one path at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::session::{SessionSnapshot, SessionStore};
use super::types::*;
use super::ScanError;
use crate::pipeline::aggregate::{AggregationStore, DocumentKey, Persistence};
use crate::pipeline::extraction::TextExtractor;
use crate::pipeline::summarize::{Summarizer, SummaryResult};

/// Visible scan state: per-path states, one card per path, session snapshot.
#[derive(Default)]
struct ScanBoard {
    states: HashMap<String, ScanState>,
    cards: Vec<ScanCard>,
    session: SessionSnapshot,
}

/// Drives scans of files under an upload root.
///
/// State reads (`state`, `cards`) never wait for a running batch. Scans
/// themselves are serialized by a run gate, so two batches never interleave.
pub struct ScanOrchestrator {
    upload_root: PathBuf,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<AggregationStore>,
    session_store: Option<SessionStore>,
    board: Mutex<ScanBoard>,
    run_gate: Mutex<()>,
}

impl ScanOrchestrator {
    pub fn new(
        upload_root: impl Into<PathBuf>,
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<AggregationStore>,
    ) -> Self {
        Self {
            upload_root: upload_root.into(),
            extractor,
            summarizer,
            store,
            session_store: None,
            board: Mutex::new(ScanBoard::default()),
            run_gate: Mutex::new(()),
        }
    }

    /// Persist the session snapshot after every state change.
    pub fn with_session(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.session_store = Some(SessionStore::new(persistence));
        self
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn store(&self) -> &Arc<AggregationStore> {
        &self.store
    }

    // A panic mid-scan must not wedge every later request.
    fn board(&self) -> MutexGuard<'_, ScanBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.run_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save_session(&self, session: &SessionSnapshot) {
        if let Some(store) = &self.session_store {
            store.save(session);
        }
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn state(&self, path: &str) -> ScanState {
        self.board()
            .states
            .get(path)
            .copied()
            .unwrap_or(ScanState::Scannable)
    }

    /// Current result cards, oldest first.
    pub fn cards(&self) -> Vec<ScanCard> {
        self.board().cards.clone()
    }

    pub fn processed_paths(&self) -> Vec<String> {
        self.board().session.processed_paths.clone()
    }

    /// Validate a client path and make sure the file exists under the root.
    pub fn resolve(&self, raw: &str) -> Result<ScanTarget, ScanError> {
        let target = ScanTarget::parse(raw)?;
        if !self.upload_root.join(&target.path).is_file() {
            return Err(ScanError::NotFound(target.path));
        }
        Ok(target)
    }

    // ── Session ──────────────────────────────────────────────

    /// Rehydrate processed paths and card ids from the last session.
    /// Returns the number of processed paths restored.
    pub fn restore_session(&self) -> usize {
        let Some(store) = &self.session_store else {
            return 0;
        };
        let snapshot = store.load();
        let mut board = self.board();
        for path in &snapshot.processed_paths {
            board.states.insert(path.clone(), ScanState::Processed);
        }
        let restored = snapshot.processed_paths.len();
        board.session = snapshot;
        tracing::info!(paths = restored, "Scan session restored");
        restored
    }

    /// Clear the combined document and forget all cards and processed paths.
    pub fn clear_all(&self) -> Result<(), ScanError> {
        let _gate = self.gate();
        self.store.clear()?;
        let mut board = self.board();
        *board = ScanBoard::default();
        self.save_session(&board.session);
        Ok(())
    }

    // ── Scanning ─────────────────────────────────────────────

    /// Scan a single path. Refuses a path that is currently processing.
    pub fn scan_one(&self, target: &ScanTarget) -> Result<ScanOutcome, ScanError> {
        if !self.state(&target.path).accepts_scan() {
            return Err(ScanError::ScanInProgress(target.path.clone()));
        }
        let _gate = self.gate();
        Ok(self.process(target))
    }

    /// Scan every target in order. A failed file never stops the batch;
    /// `cancel` is checked before each file.
    pub fn scan_all(
        &self,
        targets: &[ScanTarget],
        cancel: Option<&CancelToken>,
        progress_fn: Option<&dyn Fn(ScanEvent)>,
    ) -> ScanReport {
        if targets.is_empty() {
            return ScanReport::empty();
        }

        let _gate = self.gate();
        let start = Instant::now();
        let total = targets.len() as u32;
        let emit = |event: ScanEvent| {
            if let Some(progress) = progress_fn {
                progress(event);
            }
        };

        emit(ScanEvent::Started { total });
        tracing::info!(total, "Scan batch started");

        let mut report = ScanReport::empty();
        report.summary.total = total;

        for (i, target) in targets.iter().enumerate() {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                tracing::info!(completed = i, total, "Scan batch cancelled");
                report.summary.cancelled = true;
                emit(ScanEvent::Cancelled {
                    completed: i as u32,
                    total,
                });
                break;
            }

            let outcome = self.process(target);
            match &outcome {
                ScanOutcome::Processed(card) => {
                    report.summary.processed += 1;
                    emit(ScanEvent::FileProcessed {
                        path: card.path.clone(),
                        card_id: card.card_id.clone(),
                        key: card.key.as_ref().map(|k| k.to_string()).unwrap_or_default(),
                    });
                }
                ScanOutcome::Failed { card, error } => {
                    report.summary.failed += 1;
                    emit(ScanEvent::FileFailed {
                        path: card.path.clone(),
                        error: error.to_string(),
                    });
                }
            }
            report.outcomes.push(outcome);

            emit(ScanEvent::Progress {
                completed: i as u32 + 1,
                total,
                current_path: target.path.clone(),
            });
        }

        report.summary.duration_ms = start.elapsed().as_millis() as u64;

        if !report.summary.cancelled {
            emit(ScanEvent::Completed {
                processed: report.summary.processed,
                failed: report.summary.failed,
                duration_ms: report.summary.duration_ms,
            });
        }

        tracing::info!(
            processed = report.summary.processed,
            failed = report.summary.failed,
            duration_ms = report.summary.duration_ms,
            "Scan batch finished"
        );

        report
    }

    fn process(&self, target: &ScanTarget) -> ScanOutcome {
        let card_id = self.begin(target);

        match self.run_pipeline(target) {
            Ok((summary, key)) => {
                tracing::info!(path = %target.path, key = %key, "Document scanned");
                ScanOutcome::Processed(self.finish_processed(target, &card_id, summary, key))
            }
            Err(error) => {
                tracing::warn!(path = %target.path, error = %error, "Document scan failed");
                let card = self.finish_failed(target, &card_id, &error);
                ScanOutcome::Failed { card, error }
            }
        }
    }

    fn run_pipeline(&self, target: &ScanTarget) -> Result<(SummaryResult, DocumentKey), ScanError> {
        let full_path = self.upload_root.join(&target.path);
        let bytes = std::fs::read(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(target.path.clone()),
            _ => ScanError::Io(e),
        })?;

        let extracted = self
            .extractor
            .extract(target.file_name(), target.doc_type, &bytes)?;
        let summary = self
            .summarizer
            .summarize(&extracted.raw_text)
            .with_structured_data(extracted.structured.clone());

        let key = target.key();
        self.store.merge(&key, extracted.structured)?;

        Ok((summary, key))
    }

    /// Replace any prior card for the path and mark it processing.
    fn begin(&self, target: &ScanTarget) -> String {
        let mut board = self.board();
        board.cards.retain(|c| c.path != target.path);

        let card = ScanCard::processing(target);
        let card_id = card.card_id.clone();
        board.cards.push(card);
        board
            .states
            .insert(target.path.clone(), ScanState::Processing);
        board
            .session
            .card_ids
            .insert(target.path.clone(), card_id.clone());

        self.save_session(&board.session);
        card_id
    }

    fn finish_processed(
        &self,
        target: &ScanTarget,
        card_id: &str,
        summary: SummaryResult,
        key: DocumentKey,
    ) -> ScanCard {
        let mut board = self.board();
        board
            .states
            .insert(target.path.clone(), ScanState::Processed);
        board.session.mark_processed(&target.path);

        let card = update_card(&mut board.cards, target, card_id, |card| {
            card.state = ScanState::Processed;
            card.summary = Some(summary);
            card.key = Some(key);
            card.error = None;
        });

        self.save_session(&board.session);
        card
    }

    fn finish_failed(&self, target: &ScanTarget, card_id: &str, error: &ScanError) -> ScanCard {
        let mut board = self.board();
        board
            .states
            .insert(target.path.clone(), ScanState::Scannable);
        board.session.mark_failed(&target.path);

        let card = update_card(&mut board.cards, target, card_id, |card| {
            card.state = ScanState::Error;
            card.error = Some(error.to_string());
        });

        self.save_session(&board.session);
        card
    }
}

/// Apply `update` to the card with `card_id`, re-inserting it if it is no
/// longer on the board. Returns the updated card.
fn update_card(
    cards: &mut Vec<ScanCard>,
    target: &ScanTarget,
    card_id: &str,
    update: impl FnOnce(&mut ScanCard),
) -> ScanCard {
    let index = match cards.iter().position(|c| c.card_id == card_id) {
        Some(index) => index,
        None => {
            let mut card = ScanCard::processing(target);
            card.card_id = card_id.to_string();
            cards.push(card);
            cards.len() - 1
        }
    };
    update(&mut cards[index]);
    cards[index].clone()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::aggregate::MemoryPersistence;
    use crate::pipeline::extraction::{DocumentType, ExtractedDocument, ExtractionError};
    use crate::pipeline::summarize::KeySentenceSummarizer;
    use serde_json::json;
    use std::cell::RefCell;

    /// Treats file bytes as UTF-8 text. Content starting with `FAIL` fails
    /// extraction, `OFFLINE` fails as a network error.
    pub(crate) struct PlainTextExtractor;

    impl TextExtractor for PlainTextExtractor {
        fn extract(
            &self,
            file_name: &str,
            _doc_type: DocumentType,
            bytes: &[u8],
        ) -> Result<ExtractedDocument, ExtractionError> {
            let text = String::from_utf8_lossy(bytes).to_string();
            if text.starts_with("FAIL") {
                return Err(ExtractionError::PdfParsing("corrupt file".into()));
            }
            if text.starts_with("OFFLINE") {
                return Err(ExtractionError::Network("connection refused".into()));
            }
            Ok(ExtractedDocument {
                structured: json!({ "file_name": file_name, "text": text }),
                raw_text: text,
            })
        }
    }

    pub(crate) const BODY: &str = "The survey covered every building on the campus. \
        Most roofs were in good condition after the winter. \
        Two boilers need replacement before next season.";

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        durable: Arc<MemoryPersistence>,
        session: Arc<MemoryPersistence>,
        orchestrator: ScanOrchestrator,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let durable = Arc::new(MemoryPersistence::new());
        let session = Arc::new(MemoryPersistence::new());
        let store = Arc::new(AggregationStore::new(durable.clone(), None));
        let orchestrator = ScanOrchestrator::new(
            &root,
            Arc::new(PlainTextExtractor),
            Arc::new(KeySentenceSummarizer),
            store,
        )
        .with_session(session.clone());
        Fixture {
            _dir: dir,
            root,
            durable,
            session,
            orchestrator,
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) -> ScanTarget {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        ScanTarget::parse(rel).unwrap()
    }

    #[test]
    fn successful_scan_marks_processed_and_merges() {
        let f = fixture();
        let target = write(&f.root, "survey.pdf", BODY);

        let outcome = f.orchestrator.scan_one(&target).unwrap();
        let card = outcome.card();
        assert!(outcome.is_processed());
        assert_eq!(card.state, ScanState::Processed);
        assert_eq!(card.key.as_ref().unwrap().as_str(), "pdf_survey_pdf");
        assert_eq!(card.summary.as_ref().unwrap().summary_text.lines().count(), 3);

        assert_eq!(f.orchestrator.state("survey.pdf"), ScanState::Processed);
        assert_eq!(f.orchestrator.processed_paths(), vec!["survey.pdf"]);
        assert_eq!(
            f.orchestrator.store().get("pdf_survey_pdf").unwrap()["file_name"],
            "survey.pdf"
        );
    }

    #[test]
    fn rescan_keeps_one_card_and_one_entry() {
        let f = fixture();
        let target = write(&f.root, "survey.pdf", BODY);

        let first = f.orchestrator.scan_one(&target).unwrap();
        let second = f.orchestrator.scan_one(&target).unwrap();

        assert_eq!(f.orchestrator.cards().len(), 1);
        assert_ne!(first.card().card_id, second.card().card_id);
        assert_eq!(f.orchestrator.cards()[0].card_id, second.card().card_id);
        assert_eq!(f.orchestrator.store().len(), 1);
        assert_eq!(f.orchestrator.processed_paths().len(), 1);
    }

    #[test]
    fn extraction_failure_reverts_to_scannable() {
        let f = fixture();
        let target = write(&f.root, "broken.pdf", "FAIL");

        let outcome = f.orchestrator.scan_one(&target).unwrap();
        assert!(!outcome.is_processed());
        assert_eq!(outcome.card().state, ScanState::Error);
        assert!(outcome.card().error.as_deref().unwrap().contains("corrupt file"));

        assert_eq!(f.orchestrator.state("broken.pdf"), ScanState::Scannable);
        assert!(f.orchestrator.store().is_empty());
        assert!(f.orchestrator.processed_paths().is_empty());
        assert!(matches!(
            outcome.into_result(),
            Err(ScanError::ExtractionFailure(_))
        ));
    }

    #[test]
    fn network_failure_is_reported_as_such() {
        let f = fixture();
        let target = write(&f.root, "remote.pdf", "OFFLINE");
        let outcome = f.orchestrator.scan_one(&target).unwrap();
        assert!(matches!(outcome.into_result(), Err(ScanError::NetworkFailure(_))));
    }

    #[test]
    fn missing_file_fails_with_not_found() {
        let f = fixture();
        let target = ScanTarget::new("gone.pdf", DocumentType::Pdf);
        let outcome = f.orchestrator.scan_one(&target).unwrap();
        assert!(matches!(outcome.into_result(), Err(ScanError::NotFound(_))));
        assert_eq!(f.orchestrator.state("gone.pdf"), ScanState::Scannable);
    }

    #[test]
    fn persistence_failure_leaves_store_untouched() {
        let f = fixture();
        let target = write(&f.root, "survey.pdf", BODY);
        f.durable.set_fail_writes(true);

        let outcome = f.orchestrator.scan_one(&target).unwrap();
        assert!(matches!(outcome.into_result(), Err(ScanError::Persistence(_))));
        assert!(f.orchestrator.store().is_empty());
        assert_eq!(f.orchestrator.state("survey.pdf"), ScanState::Scannable);
    }

    #[test]
    fn failed_rescan_keeps_previous_entry() {
        let f = fixture();
        let target = write(&f.root, "survey.pdf", BODY);
        f.orchestrator.scan_one(&target).unwrap();

        std::fs::write(f.root.join("survey.pdf"), "FAIL").unwrap();
        let outcome = f.orchestrator.scan_one(&target).unwrap();

        assert!(!outcome.is_processed());
        assert_eq!(f.orchestrator.cards().len(), 1);
        assert_eq!(f.orchestrator.store().len(), 1);
    }

    #[test]
    fn batch_continues_after_failure_in_submission_order() {
        let f = fixture();
        let targets = vec![
            write(&f.root, "a.pdf", BODY),
            write(&f.root, "b.pdf", "FAIL"),
            write(&f.root, "docs/c.docx", BODY),
        ];

        let report = f.orchestrator.scan_all(&targets, None, None);
        let paths: Vec<_> = report.outcomes.iter().map(|o| o.card().path.clone()).collect();
        assert_eq!(paths, vec!["a.pdf", "b.pdf", "docs/c.docx"]);
        assert_eq!(report.summary.processed, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.summary.cancelled);
        assert_eq!(f.orchestrator.store().keys(), vec!["pdf_a_pdf", "word_c_docx"]);
    }

    #[test]
    fn batch_emits_events_in_order() {
        let f = fixture();
        let targets = vec![write(&f.root, "a.pdf", BODY), write(&f.root, "b.pdf", "FAIL")];
        let events = RefCell::new(Vec::new());
        let record = |e: ScanEvent| events.borrow_mut().push(e);

        f.orchestrator.scan_all(&targets, None, Some(&record));

        let events = events.into_inner();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], ScanEvent::Started { total: 2 });
        assert!(matches!(&events[1], ScanEvent::FileProcessed { path, key, .. }
            if path == "a.pdf" && key == "pdf_a_pdf"));
        assert_eq!(
            events[2],
            ScanEvent::Progress {
                completed: 1,
                total: 2,
                current_path: "a.pdf".into()
            }
        );
        assert!(matches!(&events[3], ScanEvent::FileFailed { path, .. } if path == "b.pdf"));
        assert!(matches!(&events[4], ScanEvent::Progress { completed: 2, .. }));
        assert!(matches!(
            &events[5],
            ScanEvent::Completed {
                processed: 1,
                failed: 1,
                ..
            }
        ));
    }

    #[test]
    fn empty_batch_emits_nothing() {
        let f = fixture();
        let events = RefCell::new(Vec::new());
        let record = |e: ScanEvent| events.borrow_mut().push(e);
        let report = f.orchestrator.scan_all(&[], None, Some(&record));
        assert!(report.outcomes.is_empty());
        assert!(events.into_inner().is_empty());
    }

    #[test]
    fn cancellation_stops_between_files() {
        let f = fixture();
        let targets = vec![
            write(&f.root, "a.pdf", BODY),
            write(&f.root, "b.pdf", BODY),
            write(&f.root, "c.pdf", BODY),
        ];
        let token = CancelToken::new();
        let events = RefCell::new(Vec::new());
        let record = |e: ScanEvent| {
            if matches!(e, ScanEvent::Progress { completed: 1, .. }) {
                token.cancel();
            }
            events.borrow_mut().push(e);
        };

        let report = f.orchestrator.scan_all(&targets, Some(&token), Some(&record));

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.summary.cancelled);
        assert_eq!(f.orchestrator.state("b.pdf"), ScanState::Scannable);
        let events = events.into_inner();
        assert_eq!(
            events.last(),
            Some(&ScanEvent::Cancelled {
                completed: 1,
                total: 3
            })
        );
        assert!(!events.iter().any(|e| matches!(e, ScanEvent::Completed { .. })));
    }

    #[test]
    fn processing_path_refuses_new_scan() {
        let f = fixture();
        let target = write(&f.root, "a.pdf", BODY);
        f.orchestrator.begin(&target);

        assert!(matches!(
            f.orchestrator.scan_one(&target),
            Err(ScanError::ScanInProgress(_))
        ));
    }

    #[test]
    fn resolve_checks_existence() {
        let f = fixture();
        write(&f.root, "docs/a.xlsx", "x");
        assert_eq!(
            f.orchestrator.resolve("docs/a.xlsx").unwrap().doc_type,
            DocumentType::Excel
        );
        assert!(matches!(
            f.orchestrator.resolve("docs/missing.xlsx"),
            Err(ScanError::NotFound(_))
        ));
        assert!(matches!(
            f.orchestrator.resolve("../a.xlsx"),
            Err(ScanError::InvalidPath(_))
        ));
    }

    #[test]
    fn session_snapshot_survives_restart() {
        let f = fixture();
        let target = write(&f.root, "a.pdf", BODY);
        let card_id = f.orchestrator.scan_one(&target).unwrap().card().card_id.clone();

        let saved = SessionSnapshot::restore(&f.session.contents().unwrap());
        assert_eq!(saved.processed_paths, vec!["a.pdf"]);
        assert_eq!(saved.card_ids.get("a.pdf"), Some(&card_id));

        let restarted = ScanOrchestrator::new(
            &f.root,
            Arc::new(PlainTextExtractor),
            Arc::new(KeySentenceSummarizer),
            Arc::new(AggregationStore::in_memory()),
        )
        .with_session(f.session.clone());
        assert_eq!(restarted.restore_session(), 1);
        assert_eq!(restarted.state("a.pdf"), ScanState::Processed);
    }

    #[test]
    fn failed_rescan_is_not_restored_as_processed() {
        let f = fixture();
        let target = write(&f.root, "a.pdf", BODY);
        f.orchestrator.scan_one(&target).unwrap();

        std::fs::write(f.root.join("a.pdf"), "FAIL").unwrap();
        f.orchestrator.scan_one(&target).unwrap();
        assert_eq!(f.orchestrator.state("a.pdf"), ScanState::Scannable);

        let saved = SessionSnapshot::restore(&f.session.contents().unwrap());
        assert!(saved.processed_paths.is_empty());

        let restarted = ScanOrchestrator::new(
            &f.root,
            Arc::new(PlainTextExtractor),
            Arc::new(KeySentenceSummarizer),
            Arc::new(AggregationStore::in_memory()),
        )
        .with_session(f.session.clone());
        restarted.restore_session();
        assert_eq!(restarted.state("a.pdf"), ScanState::Scannable);
    }

    #[test]
    fn malformed_session_is_ignored() {
        let f = fixture();
        f.session.save("not json").unwrap();
        assert_eq!(f.orchestrator.restore_session(), 0);
    }

    #[test]
    fn clear_all_forgets_everything() {
        let f = fixture();
        let target = write(&f.root, "a.pdf", BODY);
        f.orchestrator.scan_one(&target).unwrap();

        f.orchestrator.clear_all().unwrap();

        assert!(f.orchestrator.cards().is_empty());
        assert!(f.orchestrator.store().is_empty());
        assert_eq!(f.orchestrator.state("a.pdf"), ScanState::Scannable);
        assert_eq!(f.durable.contents().as_deref(), Some("{}"));
    }
}
