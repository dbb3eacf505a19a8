//! Per-task worker: drive one task from `queued` to a terminal state.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::engine::{DownloadOptions, Engine};
use crate::progress::TaskProgressSink;
use crate::task::{TaskId, TaskStore, TaskUpdate};

/// Stored when the worker itself faults (as opposed to the engine failing).
pub const INTERNAL_WORKER_FAULT: &str = "internal worker fault";

/// Everything a worker owns for the duration of one task.
pub(super) struct WorkerJob {
    pub(super) store: Arc<TaskStore>,
    pub(super) engine: Arc<dyn Engine>,
    pub(super) task_id: TaskId,
    pub(super) url: String,
    pub(super) options: DownloadOptions,
}

/// Starts a worker for a job; the manager holds one of these so tests can
/// substitute a failing spawner.
pub(super) type Spawner = Box<dyn Fn(WorkerJob) -> io::Result<()> + Send + Sync>;

/// Start the worker on its own named OS thread.
pub(super) fn spawn_worker(job: WorkerJob) -> io::Result<()> {
    let name = format!("task-{}", job.task_id.short());
    std::thread::Builder::new()
        .name(name)
        .spawn(move || run_worker(job))?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Run the engine for one task and record the outcome. Never leaves the
/// task non-terminal, whatever the engine does.
pub(super) fn run_worker(job: WorkerJob) {
    let WorkerJob {
        store,
        engine,
        task_id,
        url,
        options,
    } = job;
    tracing::info!(task_id = %task_id, "worker started");

    let sink = TaskProgressSink::new(Arc::clone(&store), task_id.clone());
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.run(&url, &options, &sink)));
    sink.detach();

    let final_update = match outcome {
        Ok(Ok(())) => TaskUpdate::completed(),
        Ok(Err(e)) => {
            tracing::error!(task_id = %task_id, url = %url, "download failed: {}", e);
            TaskUpdate::failed(e.user_message())
        }
        Err(payload) => {
            tracing::error!(
                task_id = %task_id,
                url = %url,
                "worker panicked: {}",
                panic_message(payload.as_ref())
            );
            TaskUpdate::failed(INTERNAL_WORKER_FAULT)
        }
    };
    store.update(task_id.as_str(), final_update);

    tracing::info!(task_id = %task_id, "worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, MediaInfo};
    use crate::progress::{ProgressEvent, ProgressSink, TransferProgress};
    use crate::task::{TaskRecord, TaskStatus};

    enum Script {
        Succeed,
        Fail(&'static str),
        Panic,
        ReportErrorThenSucceed,
    }

    struct ScriptedEngine(Script);

    impl Engine for ScriptedEngine {
        fn fetch_info(&self, _url: &str) -> Result<MediaInfo, EngineError> {
            Err(EngineError::Failed("not used".into()))
        }

        fn run(
            &self,
            _url: &str,
            _options: &DownloadOptions,
            sink: &dyn ProgressSink,
        ) -> Result<(), EngineError> {
            sink.report(ProgressEvent::Transfer(TransferProgress {
                downloaded: 30,
                total: Some(60),
                ..Default::default()
            }));
            match self.0 {
                Script::Succeed => Ok(()),
                Script::Fail(msg) => Err(EngineError::Failed(msg.to_string())),
                Script::Panic => panic!("engine bug"),
                Script::ReportErrorThenSucceed => {
                    sink.report(ProgressEvent::Failed { reason: None });
                    Ok(())
                }
            }
        }
    }

    fn run_with(script: Script) -> TaskRecord {
        let store = Arc::new(TaskStore::new());
        let task_id = TaskId::generate();
        store
            .insert(TaskRecord::queued(task_id.clone(), "https://example.com/v"))
            .unwrap();
        run_worker(WorkerJob {
            store: Arc::clone(&store),
            engine: Arc::new(ScriptedEngine(script)),
            task_id: task_id.clone(),
            url: "https://example.com/v".into(),
            options: DownloadOptions::default(),
        });
        store.get(task_id.as_str()).unwrap()
    }

    #[test]
    fn success_completes_at_100() {
        let r = run_with(Script::Succeed);
        assert_eq!(r.status, TaskStatus::Completed);
        assert_eq!(r.percent, 100.0);
    }

    #[test]
    fn engine_failure_is_recorded() {
        let r = run_with(Script::Fail("ERROR: Video unavailable"));
        assert_eq!(r.status, TaskStatus::Error);
        assert_eq!(r.error.as_deref(), Some("Video unavailable"));
    }

    #[test]
    fn panic_becomes_internal_fault() {
        let r = run_with(Script::Panic);
        assert_eq!(r.status, TaskStatus::Error);
        assert_eq!(r.error.as_deref(), Some(INTERNAL_WORKER_FAULT));
    }

    #[test]
    fn progress_error_is_terminal_even_if_engine_returns_ok() {
        let r = run_with(Script::ReportErrorThenSucceed);
        assert_eq!(r.status, TaskStatus::Error);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let p: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(p.as_ref()), "static");
        let p: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "owned");
        let p: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(p.as_ref()), "non-string panic payload");
    }
}
