//! `mdl list` – show files in the downloads directory.

use anyhow::Result;
use mdl_core::config::MdlConfig;
use mdl_core::files;

pub async fn run_list(cfg: &MdlConfig) -> Result<()> {
    let dir = super::downloads_dir(cfg, None)?;
    let list_dir = dir.clone();
    let entries = tokio::task::spawn_blocking(move || files::list_downloads(&list_dir)).await??;
    if entries.is_empty() {
        println!("No files in {}.", dir.display());
    } else {
        println!("{:<12} {}", "SIZE", "NAME");
        for f in entries {
            println!("{:<12} {}", f.size, f.name);
        }
    }
    Ok(())
}
