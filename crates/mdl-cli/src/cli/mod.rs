//! CLI for the MDL media download service.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use mdl_core::config;

use commands::{
    run_completions, run_delete, run_get, run_info, run_list, run_manpage, run_serve, ServeArgs,
};

/// Top-level CLI for the MDL media download service.
#[derive(Debug, Parser)]
#[command(name = "mdl")]
#[command(about = "MDL: media download service backed by yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the HTTP API server.
    Serve {
        /// Address to bind (default from config, else 127.0.0.1).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (default from config, else 5000).
        #[arg(long)]
        port: Option<u16>,
        /// Directory finished downloads are written to.
        #[arg(long, value_name = "DIR")]
        downloads_dir: Option<PathBuf>,
        /// Load this TOML config instead of the XDG one.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print metadata for a URL without downloading it.
    Info {
        /// Media page URL.
        url: String,
    },

    /// Download one or more URLs in the foreground.
    Get {
        /// Media page URLs.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Extract audio only.
        #[arg(long)]
        audio_only: bool,
        /// Output container or audio codec (e.g. mp4, mkv, mp3).
        #[arg(long)]
        format: Option<String>,
        /// Video quality (best, 4K, 1080p, 720p, worst).
        #[arg(long)]
        quality: Option<String>,
        /// Directory to write into.
        #[arg(long, value_name = "DIR")]
        downloads_dir: Option<PathBuf>,
    },

    /// List files in the downloads directory.
    List,

    /// Delete a file from the downloads directory.
    Delete {
        /// File name relative to the downloads directory.
        filename: String,
    },

    /// Print a shell completion script.
    Completions {
        /// Target shell.
        shell: Shell,
    },

    /// Print the man page in roff format.
    Manpage,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // These do not touch config or the filesystem.
        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Manpage => return run_manpage(),
            _ => {}
        }

        let cfg = match &cli.command {
            CliCommand::Serve {
                config: Some(path), ..
            } => config::load_from_path(path)?,
            _ => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Serve {
                host,
                port,
                downloads_dir,
                ..
            } => {
                run_serve(
                    &cfg,
                    ServeArgs {
                        host,
                        port,
                        downloads_dir,
                    },
                )
                .await?
            }
            CliCommand::Info { url } => run_info(&cfg, &url).await?,
            CliCommand::Get {
                urls,
                audio_only,
                format,
                quality,
                downloads_dir,
            } => {
                let options = mdl_core::DownloadOptions {
                    audio_only,
                    format,
                    quality,
                };
                run_get(&cfg, &urls, options, downloads_dir.as_deref()).await?
            }
            CliCommand::List => run_list(&cfg).await?,
            CliCommand::Delete { filename } => run_delete(&cfg, &filename).await?,
            CliCommand::Completions { .. } | CliCommand::Manpage => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
