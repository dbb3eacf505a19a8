//! `mdl info <url>` – print media metadata.

use anyhow::{Context, Result};
use mdl_core::config::MdlConfig;
use mdl_core::url_model::normalize_source_url;
use mdl_core::{Engine, MediaInfo, YtDlpEngine};

fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn print_info(info: &MediaInfo) {
    println!("Title:     {}", info.title);
    println!("Uploader:  {}", info.uploader);
    println!("Duration:  {}", format_duration(info.duration));
    println!("Views:     {}", info.view_count);
    if !info.thumbnail.is_empty() {
        println!("Thumbnail: {}", info.thumbnail);
    }
}

pub async fn run_info(cfg: &MdlConfig, url: &str) -> Result<()> {
    let url = normalize_source_url(url)?;
    let dir = super::downloads_dir(cfg, None)?;
    let engine = YtDlpEngine::new(cfg, dir);
    let info = tokio::task::spawn_blocking(move || engine.fetch_info(&url))
        .await
        .context("metadata task panicked")?
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_info(&info);
    Ok(())
}
