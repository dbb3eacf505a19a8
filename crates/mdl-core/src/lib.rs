pub mod config;
pub mod logging;

pub mod admission;
pub mod engine;
pub mod files;
pub mod manager;
pub mod progress;
pub mod task;
pub mod url_model;

pub use admission::{AdmissionController, ConcurrencyLimitReached};
pub use engine::{DownloadOptions, Engine, EngineError, MediaInfo, YtDlpEngine};
pub use manager::{BatchSubmission, SubmitError, TaskManager};
pub use progress::{ProgressEvent, ProgressSink, TransferProgress};
pub use task::{TaskId, TaskRecord, TaskStatus, TaskStore};
