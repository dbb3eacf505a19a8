//! yt-dlp command-line construction from user options and engine config.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;

use super::DownloadOptions;

const DEFAULT_VIDEO_FORMAT: &str = "bestvideo+bestaudio/best";
const SUBTITLE_LANGS: &str = "en,en.*,live_chat";
const ARIA2_ARGS: &str = "-x 16 -s 16 -k 1M";

/// yt-dlp format selector for a quality preset.
pub fn quality_format(quality: &str) -> &'static str {
    match quality {
        "best" => DEFAULT_VIDEO_FORMAT,
        "4K" => "bestvideo[height<=2160]+bestaudio/best[height<=2160]",
        "1080p" => "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
        "720p" => "bestvideo[height<=720]+bestaudio/best[height<=720]",
        "worst" => "worstvideo+worstaudio/worst",
        _ => DEFAULT_VIDEO_FORMAT,
    }
}

/// Locate ffmpeg: `FFMPEG_PATH`, then the configured path, then PATH.
pub fn find_ffmpeg(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = env::var_os("FFMPEG_PATH").map(PathBuf::from) {
        if p.is_file() {
            return Some(p);
        }
    }
    if let Some(p) = configured {
        if p.is_file() {
            return Some(p.to_path_buf());
        }
    }
    search_path(ffmpeg_name())
}

fn ffmpeg_name() -> &'static str {
    if cfg!(windows) {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

fn search_path(program: &str) -> Option<PathBuf> {
    let paths: OsString = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn non_empty_file(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Arguments for one download, excluding progress flags and the URL.
pub fn build_download_args(
    options: &DownloadOptions,
    cfg: &EngineConfig,
    output_dir: &Path,
    cookies: Option<&Path>,
    ffmpeg: Option<&Path>,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-warnings".into(),
        "--force-ipv4".into(),
        "-o".into(),
        output_dir.join("%(title)s.%(ext)s").to_string_lossy().into_owned(),
        "--merge-output-format".into(),
        cfg.merge_output_format.clone(),
    ];
    if let Some(ffmpeg) = ffmpeg {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.to_string_lossy().into_owned());
    }

    let proxy = cfg.effective_proxy();
    if let Some(proxy) = proxy {
        args.push("--proxy".into());
        args.push(proxy.to_string());
    }

    if let Some(cookies) = cookies.filter(|p| non_empty_file(p)) {
        args.push("--cookies".into());
        args.push(cookies.to_string_lossy().into_owned());
    }

    if cfg.use_aria2 {
        let mut aria2 = ARIA2_ARGS.to_string();
        if let Some(proxy) = proxy {
            aria2.push_str(&format!(" --all-proxy={}", proxy));
        }
        args.push("--downloader".into());
        args.push("aria2c".into());
        args.push("--downloader-args".into());
        args.push(format!("aria2c:{}", aria2));
    }

    if let Some(rate) = cfg
        .limit_rate
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && *r != "0")
    {
        args.push("--limit-rate".into());
        args.push(rate.to_uppercase());
    }

    if cfg.embed_chapters {
        args.push("--embed-chapters".into());
    }

    if options.audio_only {
        args.push("-f".into());
        args.push("bestaudio/best".into());
        args.push("--extract-audio".into());
        args.push("--audio-format".into());
        args.push(options.audio_format().to_string());
        args.push("--audio-quality".into());
        args.push("192K".into());
    } else {
        args.push("-f".into());
        args.push(quality_format(options.quality()).into());
        let video_format = options.video_format();
        if video_format != "mp4" {
            args.push("--recode-video".into());
            args.push(video_format.to_string());
        }
    }

    if cfg.embed_subtitles {
        args.push("--write-subs".into());
        args.push("--sub-langs".into());
        args.push(SUBTITLE_LANGS.into());
        args.push("--embed-subs".into());
    }

    if cfg.save_thumbnail {
        args.push("--write-thumbnail".into());
        if cfg.embed_thumbnail {
            args.push("--embed-thumbnail".into());
        }
    }

    args
}
