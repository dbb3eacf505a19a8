use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// HTTP listener settings (optional `[server]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default loopback only).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Settings handed to the yt-dlp engine (optional `[engine]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable; looked up on PATH when unset.
    pub ytdlp_path: Option<PathBuf>,
    /// Path to ffmpeg; `FFMPEG_PATH` env and PATH are tried as well.
    pub ffmpeg_path: Option<PathBuf>,
    pub proxy_enabled: bool,
    pub proxy_url: Option<String>,
    /// Netscape cookie jar passed to yt-dlp when present and non-empty.
    /// Defaults to `$XDG_CONFIG_HOME/mdl/cookies.txt`.
    pub cookies_path: Option<PathBuf>,
    /// Hand transfers to aria2c.
    pub use_aria2: bool,
    /// yt-dlp rate limit, e.g. "2M". "0" disables.
    pub limit_rate: Option<String>,
    pub embed_chapters: bool,
    pub embed_subtitles: bool,
    pub save_thumbnail: bool,
    pub embed_thumbnail: bool,
    /// Container used when merging separate video and audio streams.
    pub merge_output_format: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            proxy_enabled: false,
            proxy_url: None,
            cookies_path: None,
            use_aria2: false,
            limit_rate: None,
            embed_chapters: false,
            embed_subtitles: false,
            save_thumbnail: false,
            embed_thumbnail: false,
            merge_output_format: "mp4".to_string(),
        }
    }
}

impl EngineConfig {
    /// Proxy URL if the proxy is enabled and non-blank.
    pub fn effective_proxy(&self) -> Option<&str> {
        if !self.proxy_enabled {
            return None;
        }
        self.proxy_url
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Global configuration loaded from `~/.config/mdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdlConfig {
    /// Maximum number of tasks that may be queued or running at once.
    pub max_concurrent_downloads: usize,
    /// Output directory; `$XDG_DATA_HOME/mdl/downloads` when unset.
    #[serde(default)]
    pub downloads_dir: Option<PathBuf>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for MdlConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            downloads_dir: None,
            server: None,
            engine: EngineConfig::default(),
        }
    }
}

impl MdlConfig {
    /// Reject settings that would leave the service unable to run anything.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 {
            bail!("max_concurrent_downloads must be at least 1");
        }
        Ok(())
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Resolve the downloads directory: explicit override, then config, then XDG default.
    pub fn resolve_downloads_dir(&self, cli_override: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = cli_override {
            return Ok(dir.to_path_buf());
        }
        if let Some(ref dir) = self.downloads_dir {
            return Ok(dir.clone());
        }
        default_downloads_dir()
    }

    /// Cookie jar path: configured value or the XDG default.
    pub fn cookies_path(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.engine.cookies_path {
            return Some(p.clone());
        }
        xdg::BaseDirectories::with_prefix("mdl")
            .ok()
            .map(|x| x.get_config_home().join("mdl").join("cookies.txt"))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

pub fn default_downloads_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mdl")?;
    Ok(xdg_dirs.get_data_home().join("mdl").join("downloads"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<MdlConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: MdlConfig = toml::from_str(&data)?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
