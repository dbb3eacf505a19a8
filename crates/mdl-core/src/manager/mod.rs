//! Task manager: admission, task creation and worker spawning.
//!
//! Each admitted task gets an initial `queued` record before its id is
//! returned, then a dedicated worker thread that runs the engine. Workers
//! report through the registry only; the manager never waits on them.

mod worker;

use std::sync::Arc;

use crate::admission::{AdmissionController, ConcurrencyLimitReached};
use crate::engine::{DownloadOptions, Engine};
use crate::task::{StoreError, TaskId, TaskRecord, TaskStore, TaskUpdate};

pub use worker::INTERNAL_WORKER_FAULT;

use self::worker::{spawn_worker, Spawner, WorkerJob};

/// Stored when the worker thread could not be created.
pub const WORKER_START_FAILED: &str = "failed to start worker";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] ConcurrencyLimitReached),
    #[error("could not spawn worker for task {task_id}: {source}")]
    Spawn {
        task_id: TaskId,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a batch submission.
#[derive(Debug, Default)]
pub struct BatchSubmission {
    /// Ids of admitted tasks, in input order. Always complete, even when
    /// the batch stopped early on `failed`.
    pub task_ids: Vec<TaskId>,
    /// URLs not submitted, because the ceiling was reached or an earlier
    /// entry failed to start.
    pub skipped: usize,
    /// Task creation error that stopped the batch. The failing URL is
    /// counted in neither `task_ids` nor `skipped`.
    pub failed: Option<SubmitError>,
}

pub struct TaskManager {
    store: Arc<TaskStore>,
    admission: AdmissionController,
    engine: Arc<dyn Engine>,
    spawn: Spawner,
}

impl TaskManager {
    pub fn new(
        store: Arc<TaskStore>,
        admission: AdmissionController,
        engine: Arc<dyn Engine>,
    ) -> Self {
        Self {
            store,
            admission,
            engine,
            spawn: Box::new(spawn_worker),
        }
    }

    #[cfg(test)]
    fn with_spawner(mut self, spawn: Spawner) -> Self {
        self.spawn = spawn;
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn ceiling(&self) -> usize {
        self.admission.ceiling()
    }

    /// Admit and start one task.
    pub fn submit(&self, url: &str, options: DownloadOptions) -> Result<TaskId, SubmitError> {
        if let Err(rejected) = self.admission.check(&self.store) {
            tracing::info!(url, "{}", rejected);
            return Err(rejected.into());
        }
        self.create_task(url, options)
    }

    /// Admit URLs one at a time; once the ceiling is hit, the rest are
    /// skipped. A creation failure stops the batch but keeps the ids of
    /// tasks already started.
    pub fn submit_batch(&self, urls: &[String], options: &DownloadOptions) -> BatchSubmission {
        let mut batch = BatchSubmission::default();
        for (i, url) in urls.iter().enumerate() {
            if let Err(rejected) = self.admission.check(&self.store) {
                batch.skipped = urls.len() - i;
                tracing::info!(skipped = batch.skipped, "{}; skipping rest of batch", rejected);
                break;
            }
            match self.create_task(url, options.clone()) {
                Ok(task_id) => batch.task_ids.push(task_id),
                Err(e) => {
                    batch.skipped = urls.len() - i - 1;
                    tracing::error!(
                        started = batch.task_ids.len(),
                        skipped = batch.skipped,
                        "batch stopped: {}",
                        e
                    );
                    batch.failed = Some(e);
                    break;
                }
            }
        }
        batch
    }

    /// Create the `queued` record and spawn its worker, without admission.
    pub fn create_task(&self, url: &str, options: DownloadOptions) -> Result<TaskId, SubmitError> {
        let task_id = TaskId::generate();
        self.store.insert(TaskRecord::queued(task_id.clone(), url))?;

        let job = WorkerJob {
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            task_id: task_id.clone(),
            url: url.to_string(),
            options,
        };
        if let Err(source) = (self.spawn)(job) {
            tracing::error!(task_id = %task_id, "could not spawn worker: {}", source);
            self.store
                .update(task_id.as_str(), TaskUpdate::failed(WORKER_START_FAILED));
            return Err(SubmitError::Spawn { task_id, source });
        }

        tracing::info!(task_id = %task_id, url, "task created and queued");
        Ok(task_id)
    }

    /// Snapshot of one task.
    pub fn status(&self, task_id: &str) -> Option<TaskRecord> {
        self.store.get(task_id)
    }

    pub fn active_count(&self) -> usize {
        self.store.count_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, MediaInfo};
    use crate::progress::ProgressSink;
    use crate::task::TaskStatus;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct IdleEngine;

    impl Engine for IdleEngine {
        fn fetch_info(&self, _url: &str) -> Result<MediaInfo, EngineError> {
            Err(EngineError::Failed("not used".into()))
        }

        fn run(
            &self,
            _url: &str,
            _options: &DownloadOptions,
            _sink: &dyn ProgressSink,
        ) -> Result<(), EngineError> {
            Ok(())
        }
    }

    /// Spawner that fails on call number `nth` (0-based). Other jobs are
    /// dropped unstarted, so their records stay `queued`.
    fn failing_on(nth: usize) -> Spawner {
        let calls = AtomicUsize::new(0);
        Box::new(move |_job| {
            if calls.fetch_add(1, Ordering::SeqCst) == nth {
                Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"))
            } else {
                Ok(())
            }
        })
    }

    fn manager(ceiling: usize, spawn: Spawner) -> TaskManager {
        TaskManager::new(
            Arc::new(TaskStore::new()),
            AdmissionController::new(ceiling),
            Arc::new(IdleEngine),
        )
        .with_spawner(spawn)
    }

    #[test]
    fn spawn_failure_marks_record_and_is_returned() {
        let m = manager(3, failing_on(0));
        let err = m
            .submit("https://example.com/v", DownloadOptions::default())
            .unwrap_err();
        let task_id = match err {
            SubmitError::Spawn { task_id, source } => {
                assert_eq!(source.kind(), io::ErrorKind::WouldBlock);
                task_id
            }
            other => panic!("expected spawn failure, got {other:?}"),
        };

        let r = m.status(task_id.as_str()).unwrap();
        assert_eq!(r.status, TaskStatus::Error);
        assert_eq!(r.error.as_deref(), Some(WORKER_START_FAILED));
        assert_eq!(m.active_count(), 0);
    }

    #[test]
    fn batch_keeps_started_ids_when_a_spawn_fails() {
        let m = manager(10, failing_on(1));
        let urls: Vec<String> = ["a", "b", "c", "d"]
            .iter()
            .map(|s| format!("https://example.com/{s}"))
            .collect();

        let batch = m.submit_batch(&urls, &DownloadOptions::default());
        assert_eq!(batch.task_ids.len(), 1);
        assert_eq!(m.status(batch.task_ids[0].as_str()).unwrap().url, urls[0]);
        assert_eq!(
            m.status(batch.task_ids[0].as_str()).unwrap().status,
            TaskStatus::Queued
        );
        assert_eq!(batch.skipped, 2);

        match batch.failed {
            Some(SubmitError::Spawn { task_id, .. }) => {
                let r = m.status(task_id.as_str()).unwrap();
                assert_eq!(r.url, urls[1]);
                assert_eq!(r.status, TaskStatus::Error);
                assert_eq!(r.error.as_deref(), Some(WORKER_START_FAILED));
            }
            other => panic!("expected spawn failure, got {other:?}"),
        }
        assert_eq!(m.store().len(), 2);
        assert_eq!(m.active_count(), 1);
    }

    #[test]
    fn batch_without_failures_reports_none() {
        let m = manager(2, failing_on(usize::MAX));
        let urls: Vec<String> = (0..3).map(|i| format!("https://example.com/{i}")).collect();
        let batch = m.submit_batch(&urls, &DownloadOptions::default());
        assert_eq!(batch.task_ids.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert!(batch.failed.is_none());
    }
}
