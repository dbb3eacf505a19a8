//! `mdl get <url>...` – download in the foreground, printing progress.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use mdl_core::config::MdlConfig;
use mdl_core::url_model::{non_blank_urls, normalize_source_url};
use mdl_core::{DownloadOptions, SubmitError, TaskId, TaskRecord, TaskStatus};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn human_rate(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes_per_sec.max(0.0);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}/s", UNITS[unit])
}

/// One status line per task; printed only when it changes.
pub(crate) fn progress_line(r: &TaskRecord) -> String {
    let short = r.id.short();
    match r.status {
        TaskStatus::Queued => format!("[{short}] queued {}", r.url),
        TaskStatus::Downloading => {
            let mut line = format!("[{short}] downloading {:5.1}%", r.percent);
            if let Some(speed) = r.speed {
                line.push(' ');
                line.push_str(&human_rate(speed));
            }
            if let Some(eta) = r.eta {
                line.push_str(&format!(" eta {eta}s"));
            }
            line
        }
        TaskStatus::Processing => format!(
            "[{short}] {}",
            r.message.as_deref().unwrap_or("processing")
        ),
        TaskStatus::Completed => format!("[{short}] completed {}", r.url),
        TaskStatus::Error => format!(
            "[{short}] failed: {}",
            r.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Submit every URL, feeding the rest in as slots free up, and wait for all
/// tasks to finish.
pub async fn run_get(
    cfg: &MdlConfig,
    urls: &[String],
    options: DownloadOptions,
    downloads_dir: Option<&Path>,
) -> Result<()> {
    let urls = non_blank_urls(urls.iter().map(String::as_str))
        .iter()
        .map(|u| normalize_source_url(u))
        .collect::<Result<Vec<_>, _>>()?;
    if urls.is_empty() {
        bail!("no URLs given");
    }
    let dir = super::downloads_dir(cfg, downloads_dir)?;
    let manager = super::build_manager(cfg, &dir);

    let mut pending: VecDeque<String> = urls.into();
    let mut tasks: Vec<TaskId> = Vec::new();
    let mut last_line: HashMap<TaskId, String> = HashMap::new();

    loop {
        while let Some(url) = pending.front() {
            match manager.submit(url, options.clone()) {
                Ok(id) => {
                    pending.pop_front();
                    tasks.push(id);
                }
                Err(SubmitError::Rejected(_)) => break,
                Err(e) => return Err(e.into()),
            }
        }

        let mut all_done = pending.is_empty();
        for id in &tasks {
            let Some(record) = manager.status(id.as_str()) else {
                continue;
            };
            let line = progress_line(&record);
            if last_line.get(id) != Some(&line) {
                println!("{line}");
                last_line.insert(id.clone(), line);
            }
            if !record.status.is_terminal() {
                all_done = false;
            }
        }
        if all_done {
            break;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let failed = tasks
        .iter()
        .filter_map(|id| manager.status(id.as_str()))
        .filter(|r| r.status == TaskStatus::Error)
        .count();
    if failed > 0 {
        bail!("{failed} of {} downloads failed", tasks.len());
    }
    println!("All downloads saved to {}", dir.display());
    Ok(())
}
