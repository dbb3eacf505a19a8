//! Task records and the in-memory registry that owns them.

mod store;
mod types;

pub use store::{StoreError, TaskStore, UpdateOutcome};
pub use types::{TaskId, TaskRecord, TaskStatus, TaskUpdate};
