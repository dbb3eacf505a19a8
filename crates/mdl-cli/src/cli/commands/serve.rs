//! `mdl serve` – run the HTTP API until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use mdl_core::config::MdlConfig;

use crate::server::{self, AppState};

/// Command-line overrides for the server.
#[derive(Debug, Default)]
pub struct ServeArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub downloads_dir: Option<PathBuf>,
}

/// Bind address: CLI flags win over config, config over defaults.
pub(crate) fn bind_addr(cfg: &MdlConfig, args: &ServeArgs) -> Result<SocketAddr> {
    let server_cfg = cfg.server();
    let host = args.host.as_deref().unwrap_or(&server_cfg.host);
    let port = args.port.unwrap_or(server_cfg.port);
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))
}

pub async fn run_serve(cfg: &MdlConfig, args: ServeArgs) -> Result<()> {
    let addr = bind_addr(cfg, &args)?;
    let dir = super::downloads_dir(cfg, args.downloads_dir.as_deref())?;
    let manager = super::build_manager(cfg, &dir);

    tracing::info!(
        downloads_dir = %dir.display(),
        max_concurrent_downloads = manager.ceiling(),
        "media download service starting"
    );
    println!("Serving on http://{addr} (downloads: {})", dir.display());

    server::serve(AppState::new(manager, dir), addr).await
}
