//! In-memory task registry guarded by a single mutex.
//!
//! Every read and write takes the same lock for its whole duration and
//! nothing else; the lock is never held across engine calls. Records are
//! never removed, so memory grows with the number of tasks created over the
//! process lifetime.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{TaskId, TaskRecord, TaskUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("task {0} already exists")]
    DuplicateId(TaskId),
}

/// What `TaskStore::update` did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// No record with that id.
    Unknown,
    /// Record already completed or failed; update dropped.
    Terminal,
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Mutex<HashMap<TaskId, TaskRecord>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic elsewhere while holding the lock leaves the map itself intact,
    /// so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskRecord>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a new record keyed by its id.
    pub fn insert(&self, record: TaskRecord) -> Result<(), StoreError> {
        let mut tasks = self.lock();
        if tasks.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        tasks.insert(record.id.clone(), record);
        Ok(())
    }

    /// Merge `update` into the record for `id`. Unknown ids and terminal
    /// records are left untouched.
    pub fn update(&self, id: &str, update: TaskUpdate) -> UpdateOutcome {
        let mut tasks = self.lock();
        let Some(record) = tasks.get_mut(id) else {
            tracing::warn!(task_id = id, "update for a task that does not exist");
            return UpdateOutcome::Unknown;
        };
        if record.status.is_terminal() {
            tracing::debug!(
                task_id = id,
                status = %record.status,
                "ignoring update to finished task"
            );
            return UpdateOutcome::Terminal;
        }
        if let Some(new_status) = update.status {
            if new_status != record.status {
                tracing::debug!(task_id = id, "status update: {} -> {}", record.status, new_status);
            }
        }
        record.apply(update);
        UpdateOutcome::Applied
    }

    /// Copy of the current record.
    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.lock().get(id).cloned()
    }

    /// Number of queued, downloading or processing tasks.
    pub fn count_active(&self) -> usize {
        self.lock()
            .values()
            .filter(|r| r.status.is_active())
            .count()
    }

    /// Total records held, terminal ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
