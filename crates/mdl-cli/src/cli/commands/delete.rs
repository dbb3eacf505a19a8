//! `mdl delete <filename>` – remove a file from the downloads directory.

use anyhow::Result;
use mdl_core::config::MdlConfig;
use mdl_core::files;

pub async fn run_delete(cfg: &MdlConfig, filename: &str) -> Result<()> {
    let dir = super::downloads_dir(cfg, None)?;
    let name = filename.to_string();
    tokio::task::spawn_blocking(move || files::delete_download(&dir, &name)).await??;
    println!("Deleted {filename}");
    Ok(())
}
