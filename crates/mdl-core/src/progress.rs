//! Progress reporting from the engine back into a task record.
//!
//! The engine receives a `&dyn ProgressSink` for each `run` call; a sink is
//! bound to exactly one task id, so concurrent engine invocations cannot
//! report into each other's records.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::task::{TaskId, TaskStatus, TaskStore, TaskUpdate};

/// Message stored while post-processing runs after the raw transfer.
pub const PROCESSING_MESSAGE: &str = "Merging formats...";
/// Stored when the engine's own progress reporting signals an error.
pub const ENGINE_PROGRESS_ERROR: &str = "Unknown error during download";

/// One transfer tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransferProgress {
    pub downloaded: u64,
    /// Exact or estimated total size; `None` when unknown.
    pub total: Option<u64>,
    /// Bytes per second.
    pub speed: Option<f64>,
    /// Seconds remaining.
    pub eta: Option<u64>,
}

impl TransferProgress {
    /// Percent complete when the total is known and positive.
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => {
                Some((self.downloaded as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }
}

/// Progress vocabulary spoken by engines.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Raw transfer in progress.
    Transfer(TransferProgress),
    /// Raw transfer finished; post-processing may follow.
    Finished { filename: Option<String> },
    /// The engine's progress reporting hit an error.
    Failed { reason: Option<String> },
}

/// Receiver of engine progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Translate an event into the record mutation it implies.
pub fn update_for(event: &ProgressEvent) -> TaskUpdate {
    match event {
        ProgressEvent::Transfer(p) => TaskUpdate {
            status: Some(TaskStatus::Downloading),
            percent: p.percent(),
            speed: p.speed,
            eta: p.eta,
            downloaded: Some(p.downloaded),
            total: p.total,
            ..TaskUpdate::default()
        },
        ProgressEvent::Finished { .. } => TaskUpdate::processing(PROCESSING_MESSAGE),
        ProgressEvent::Failed { reason } => {
            TaskUpdate::failed(reason.as_deref().unwrap_or(ENGINE_PROGRESS_ERROR))
        }
    }
}

/// Sink bound to one task id in the registry.
///
/// After `detach`, further events are dropped so nothing reported late by
/// the engine lands on a task whose worker has already finalized it.
pub struct TaskProgressSink {
    store: Arc<TaskStore>,
    task_id: TaskId,
    detached: AtomicBool,
}

impl TaskProgressSink {
    pub fn new(store: Arc<TaskStore>, task_id: TaskId) -> Self {
        Self {
            store,
            task_id,
            detached: AtomicBool::new(false),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

impl ProgressSink for TaskProgressSink {
    fn report(&self, event: ProgressEvent) {
        if self.is_detached() {
            tracing::trace!(task_id = %self.task_id, "dropping progress after detach");
            return;
        }
        match &event {
            ProgressEvent::Finished { filename } => tracing::info!(
                task_id = %self.task_id,
                file = filename.as_deref().unwrap_or("N/A"),
                "transfer finished, waiting for post-processing"
            ),
            ProgressEvent::Failed { reason } => tracing::error!(
                task_id = %self.task_id,
                reason = reason.as_deref().unwrap_or("-"),
                "engine reported a download error"
            ),
            ProgressEvent::Transfer(_) => {}
        }
        // The store logs unknown ids and never fails; a lost tick is corrected
        // by the next one or by the worker's final update.
        self.store.update(self.task_id.as_str(), update_for(&event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskRecord;
    use std::sync::Mutex;

    fn tick(downloaded: u64, total: Option<u64>) -> ProgressEvent {
        ProgressEvent::Transfer(TransferProgress {
            downloaded,
            total,
            speed: Some(2048.0),
            eta: Some(3),
        })
    }

    fn bound_sink() -> (Arc<TaskStore>, TaskProgressSink) {
        let store = Arc::new(TaskStore::new());
        let id = TaskId::generate();
        store
            .insert(TaskRecord::queued(id.clone(), "https://example.com/v"))
            .unwrap();
        let sink = TaskProgressSink::new(Arc::clone(&store), id);
        (store, sink)
    }

    #[test]
    fn percent_needs_positive_total() {
        assert_eq!(
            TransferProgress { downloaded: 50, total: Some(200), ..Default::default() }.percent(),
            Some(25.0)
        );
        assert_eq!(
            TransferProgress { downloaded: 50, total: Some(0), ..Default::default() }.percent(),
            None
        );
        assert_eq!(
            TransferProgress { downloaded: 50, total: None, ..Default::default() }.percent(),
            None
        );
        assert_eq!(
            TransferProgress { downloaded: 300, total: Some(200), ..Default::default() }.percent(),
            Some(100.0)
        );
    }

    #[test]
    fn transfer_ticks_update_percent_and_telemetry() {
        let (store, sink) = bound_sink();
        sink.report(tick(50, Some(200)));
        let r = store.get(sink.task_id().as_str()).unwrap();
        assert_eq!(r.status, TaskStatus::Downloading);
        assert_eq!(r.percent, 25.0);
        assert_eq!(r.downloaded, Some(50));
        assert_eq!(r.total, Some(200));
        assert_eq!(r.speed, Some(2048.0));
        assert_eq!(r.eta, Some(3));

        sink.report(tick(150, Some(200)));
        assert_eq!(store.get(sink.task_id().as_str()).unwrap().percent, 75.0);
    }

    #[test]
    fn unknown_total_leaves_percent_unchanged() {
        let (store, sink) = bound_sink();
        sink.report(tick(100, Some(400)));
        sink.report(tick(250, None));
        let r = store.get(sink.task_id().as_str()).unwrap();
        assert_eq!(r.percent, 25.0);
        assert_eq!(r.downloaded, Some(250));
    }

    #[test]
    fn finished_moves_to_processing() {
        let (store, sink) = bound_sink();
        sink.report(tick(10, Some(10)));
        sink.report(ProgressEvent::Finished { filename: Some("clip.f137.mp4".into()) });
        let r = store.get(sink.task_id().as_str()).unwrap();
        assert_eq!(r.status, TaskStatus::Processing);
        assert_eq!(r.message.as_deref(), Some(PROCESSING_MESSAGE));
        assert!(r.speed.is_none());
    }

    #[test]
    fn engine_error_marks_task_failed() {
        let (store, sink) = bound_sink();
        sink.report(ProgressEvent::Failed { reason: None });
        let r = store.get(sink.task_id().as_str()).unwrap();
        assert_eq!(r.status, TaskStatus::Error);
        assert_eq!(r.error.as_deref(), Some(ENGINE_PROGRESS_ERROR));
    }

    #[test]
    fn detached_sink_drops_events() {
        let (store, sink) = bound_sink();
        sink.detach();
        sink.report(tick(50, Some(100)));
        let r = store.get(sink.task_id().as_str()).unwrap();
        assert_eq!(r.status, TaskStatus::Queued);
        assert_eq!(r.percent, 0.0);
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: ProgressEvent| seen.lock().unwrap().push(e);
        sink.report(ProgressEvent::Finished { filename: None });
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
