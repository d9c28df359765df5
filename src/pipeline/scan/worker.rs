use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::orchestrator::ScanOrchestrator;
use super::types::{CancelToken, ScanEvent, ScanReport, ScanTarget};

/// Channel capacity for progress events.
const EVENT_BUFFER: usize = 64;

/// A batch running on the blocking pool.
///
/// `events` yields every `ScanEvent` of the batch followed, after the grace
/// delay, by `ScanEvent::Cleared`. The channel closes once the job is done.
pub struct ScanJob {
    pub events: mpsc::Receiver<ScanEvent>,
    pub handle: JoinHandle<ScanReport>,
    cancel: CancelToken,
}

impl ScanJob {
    /// Stop before the next file. The file being scanned finishes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Run `scan_all` for `targets` off the async runtime, streaming events.
/// Must be called from within a tokio runtime.
pub fn spawn_scan_job(
    orchestrator: Arc<ScanOrchestrator>,
    targets: Vec<ScanTarget>,
    grace: Duration,
) -> ScanJob {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        let batch_tx = tx.clone();
        let joined = tokio::task::spawn_blocking(move || {
            // A dropped receiver only means nobody is watching.
            let progress_fn = move |event: ScanEvent| {
                let _ = batch_tx.blocking_send(event);
            };
            orchestrator.scan_all(&targets, Some(&token), Some(&progress_fn))
        })
        .await;

        let report = match joined {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Scan worker terminated abnormally");
                ScanReport::empty()
            }
        };

        tokio::time::sleep(grace).await;
        let _ = tx.send(ScanEvent::Cleared).await;
        report
    });

    ScanJob {
        events: rx,
        handle,
        cancel,
    }
}
