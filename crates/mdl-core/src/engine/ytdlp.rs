//! Engine backed by the `yt-dlp` executable, run as a child process.

use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::config::{EngineConfig, MdlConfig};
use crate::progress::ProgressSink;

use super::args::{build_download_args, find_ffmpeg};
use super::parse::{parse_progress_line, progress_template};
use super::{DownloadOptions, Engine, EngineError, MediaInfo};

/// Shape of the subset of `yt-dlp -J` output we use.
#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    view_count: Option<u64>,
    thumbnail: Option<String>,
}

impl From<RawInfo> for MediaInfo {
    fn from(raw: RawInfo) -> Self {
        MediaInfo {
            title: raw.title.unwrap_or_else(|| "Unknown title".to_string()),
            duration: raw.duration.unwrap_or(0.0),
            uploader: raw.uploader.unwrap_or_else(|| "Unknown uploader".to_string()),
            view_count: raw.view_count.unwrap_or(0),
            thumbnail: raw.thumbnail.unwrap_or_default(),
        }
    }
}

/// Shared, stateless engine: every `run` gets its own child process and sink.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    program: PathBuf,
    config: EngineConfig,
    output_dir: PathBuf,
    cookies: Option<PathBuf>,
}

impl YtDlpEngine {
    pub fn new(cfg: &MdlConfig, output_dir: PathBuf) -> Self {
        let program = cfg
            .engine
            .ytdlp_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));
        Self {
            program,
            config: cfg.engine.clone(),
            output_dir,
            cookies: cfg.cookies_path(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child, EngineError> {
        cmd.spawn().map_err(|source| EngineError::Unavailable {
            program: self.program.display().to_string(),
            source,
        })
    }
}

/// Pick the most useful line of yt-dlp's stderr for an error message.
fn error_from_stderr(stderr: &str, fallback: impl FnOnce() -> String) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .map(str::to_string)
        .unwrap_or_else(fallback)
}

fn drain_stderr(stream: impl Read + Send + 'static) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut collected = String::new();
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        while let Ok(n) = reader.read_until(b'\n', &mut buf) {
            if n == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            tracing::debug!("yt-dlp: {}", line.trim_end());
            collected.push_str(&line);
            buf.clear();
        }
        collected
    })
}

impl Engine for YtDlpEngine {
    fn fetch_info(&self, url: &str) -> Result<MediaInfo, EngineError> {
        tracing::info!(url, "fetching media info");
        let mut cmd = self.command();
        cmd.args(["-J", "--no-warnings", "--no-playlist"]);
        if let Some(proxy) = self.config.effective_proxy() {
            cmd.args(["--proxy", proxy]);
        }
        cmd.arg("--").arg(url);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = self.spawn(&mut cmd)?.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let msg = error_from_stderr(&stderr, || format!("yt-dlp exited with {}", output.status));
            tracing::error!(url, "failed to fetch media info: {}", msg);
            return Err(EngineError::Failed(msg));
        }
        let info: MediaInfo = serde_json::from_slice::<RawInfo>(&output.stdout)?.into();
        tracing::info!(url, title = %info.title, "fetched media info");
        Ok(info)
    }

    fn run(
        &self,
        url: &str,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(), EngineError> {
        let ffmpeg = find_ffmpeg(self.config.ffmpeg_path.as_deref());
        match (&ffmpeg, options.audio_only) {
            (None, false) => {
                tracing::error!("{}", EngineError::MissingFfmpeg);
                return Err(EngineError::MissingFfmpeg);
            }
            (Some(path), _) => tracing::debug!(path = %path.display(), "ffmpeg found"),
            (None, true) => {}
        }

        let args = build_download_args(
            options,
            &self.config,
            &self.output_dir,
            self.cookies.as_deref(),
            ffmpeg.as_deref(),
        );
        tracing::info!(url, ?options, "starting yt-dlp");

        let mut cmd = self.command();
        cmd.args(&args)
            .arg("--newline")
            .arg("--progress-template")
            .arg(progress_template())
            .arg("--")
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = self.spawn(&mut cmd)?;

        let stderr_handle = child.stderr.take().map(drain_stderr);
        let read_result = match child.stdout.take() {
            Some(stdout) => forward_progress(stdout, sink),
            None => Ok(()),
        };
        if let Err(e) = read_result {
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Io(e));
        }

        let status = child.wait()?;
        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if status.success() {
            tracing::info!(url, "yt-dlp finished");
            Ok(())
        } else {
            let msg = error_from_stderr(&stderr, || format!("yt-dlp exited with {}", status));
            Err(EngineError::Failed(msg))
        }
    }
}

/// Read stdout until EOF, reporting every recognised progress line.
fn forward_progress(stdout: impl Read, sink: &dyn ProgressSink) -> std::io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(event) = parse_progress_line(&line) {
            sink.report(event);
        }
    }
}
