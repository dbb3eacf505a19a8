//! CLI command handlers. Each command is in its own file.

mod completions;
mod delete;
mod get;
mod info;
mod list;
mod serve;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use mdl_core::config::MdlConfig;
use mdl_core::{AdmissionController, TaskManager, TaskStore, YtDlpEngine};

pub use completions::{run_completions, run_manpage};
pub use delete::run_delete;
pub use get::run_get;
pub use info::run_info;
pub use list::run_list;
pub use serve::{run_serve, ServeArgs};

/// Resolve the downloads directory and make sure it exists.
fn downloads_dir(cfg: &MdlConfig, cli_override: Option<&Path>) -> Result<PathBuf> {
    let dir = cfg.resolve_downloads_dir(cli_override)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("could not create downloads directory {}", dir.display()))?;
    Ok(dir)
}

/// In-process task manager backed by yt-dlp.
fn build_manager(cfg: &MdlConfig, downloads_dir: &Path) -> Arc<TaskManager> {
    let engine = YtDlpEngine::new(cfg, downloads_dir.to_path_buf());
    Arc::new(TaskManager::new(
        Arc::new(TaskStore::new()),
        AdmissionController::new(cfg.max_concurrent_downloads),
        Arc::new(engine),
    ))
}
