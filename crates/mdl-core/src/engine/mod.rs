//! Extraction/encoding engine interface.
//!
//! The task manager treats an engine as a slow, possibly failing black box
//! with two blocking operations. The progress sink is an argument of `run`,
//! never state stored on the engine, so one engine value can serve many
//! workers at once.

mod args;
mod parse;
mod ytdlp;

use serde::{Deserialize, Serialize};

use crate::progress::ProgressSink;

pub use args::{build_download_args, find_ffmpeg, quality_format};
pub use parse::{parse_progress_line, PROGRESS_PREFIX};
pub use ytdlp::YtDlpEngine;

/// Longest error text shown to users.
const MAX_ERROR_LEN: usize = 500;

/// Per-download options sent by the client; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadOptions {
    /// Extract audio only.
    pub audio_only: bool,
    /// Target container/codec (`mp3`, `m4a`, `mp4`, `mkv`, `webm`, ...).
    pub format: Option<String>,
    /// `best`, `4K`, `1080p`, `720p` or `worst`.
    pub quality: Option<String>,
}

impl DownloadOptions {
    pub fn audio_format(&self) -> &str {
        self.format.as_deref().unwrap_or("mp3")
    }

    pub fn video_format(&self) -> &str {
        self.format.as_deref().unwrap_or("mp4")
    }

    pub fn quality(&self) -> &str {
        self.quality.as_deref().unwrap_or("best")
    }
}

/// Metadata shown before a download starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    /// Seconds.
    pub duration: f64,
    pub uploader: String,
    pub view_count: u64,
    pub thumbnail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{program} could not be started: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("FFmpeg not found. It is required to merge video and audio. Please install FFmpeg and ensure it's in the system's PATH.")]
    MissingFfmpeg,
    #[error("{0}")]
    Failed(String),
    #[error("invalid metadata from engine: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("engine I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Error text safe to show to end users.
    pub fn user_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Engine contract consumed by the task manager.
pub trait Engine: Send + Sync {
    /// Fetch metadata without downloading.
    fn fetch_info(&self, url: &str) -> Result<MediaInfo, EngineError>;

    /// Download `url`, reporting progress to `sink`. Blocks until the
    /// transfer and any post-processing finish or fail.
    fn run(
        &self,
        url: &str,
        options: &DownloadOptions,
        sink: &dyn ProgressSink,
    ) -> Result<(), EngineError>;
}

/// Strip terminal escapes and the `ERROR: ` prefix; trim and bound the length.
pub fn sanitize_error_message(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                // CSI: parameters until a final byte in '@'..='~'
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            continue;
        }
        if c.is_control() && c != '\n' {
            continue;
        }
        out.push(c);
    }
    let mut msg = out.trim();
    if let Some(rest) = msg.strip_prefix("ERROR:") {
        msg = rest.trim_start();
    }
    let msg: String = msg.chars().take(MAX_ERROR_LEN).collect();
    if msg.is_empty() {
        "Unknown download error".to_string()
    } else {
        msg
    }
}
