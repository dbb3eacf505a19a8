//! Types held by the task registry.

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Opaque, process-unique task identifier (UUIDv4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Fresh random identifier. 122 random bits make collisions negligible.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, used for thread names.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Downloading,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }

    /// `completed` and `error` accept no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    /// Counted against the admission ceiling.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one task, as returned to pollers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub status: TaskStatus,
    pub url: String,
    /// Progress in [0, 100]; best-effort telemetry.
    pub percent: f64,
    /// Bytes per second.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Seconds remaining.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TaskRecord {
    /// Initial record inserted by the task factory.
    pub fn queued(id: TaskId, url: impl Into<String>) -> Self {
        Self {
            id,
            status: TaskStatus::Queued,
            url: url.into(),
            percent: 0.0,
            speed: None,
            eta: None,
            downloaded: None,
            total: None,
            error: None,
            message: None,
        }
    }

    /// Merge a partial update. Status-scoped fields are cleared when the
    /// status they belong to is left.
    pub(crate) fn apply(&mut self, update: TaskUpdate) {
        if let Some(status) = update.status {
            if status != TaskStatus::Downloading {
                self.speed = None;
                self.eta = None;
                self.downloaded = None;
                self.total = None;
            }
            if status == TaskStatus::Downloading {
                self.message = None;
            }
            if status != TaskStatus::Error {
                self.error = None;
            }
            self.status = status;
        }
        if let Some(percent) = update.percent {
            if percent.is_finite() {
                self.percent = percent.clamp(0.0, 100.0);
            }
        }
        let downloading = self.status == TaskStatus::Downloading;
        if downloading {
            if update.speed.is_some() {
                self.speed = update.speed;
            }
            if update.eta.is_some() {
                self.eta = update.eta;
            }
            if update.downloaded.is_some() {
                self.downloaded = update.downloaded;
            }
            if update.total.is_some() {
                self.total = update.total;
            }
        }
        if self.status == TaskStatus::Error {
            if let Some(error) = update.error {
                self.error = Some(error);
            }
        }
        if update.message.is_some() {
            self.message = update.message;
        }
    }
}

/// Partial set of fields merged into a record by `TaskStore::update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub percent: Option<f64>,
    pub speed: Option<f64>,
    pub eta: Option<u64>,
    pub downloaded: Option<u64>,
    pub total: Option<u64>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::status(TaskStatus::Processing)
        }
    }

    pub fn completed() -> Self {
        Self {
            percent: Some(100.0),
            ..Self::status(TaskStatus::Completed)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::status(TaskStatus::Error)
        }
    }
}
