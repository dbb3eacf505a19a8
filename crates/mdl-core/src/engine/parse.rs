//! Parse yt-dlp stdout lines into progress events.
//!
//! Progress lines come from `--progress-template` with a fixed prefix and
//! space-separated fields; yt-dlp prints `NA` for missing values. The
//! filename is last so that spaces in it survive.

use crate::progress::{ProgressEvent, TransferProgress};

/// Marker at the start of every templated progress line.
pub const PROGRESS_PREFIX: &str = "mdl-progress";

/// Value for yt-dlp's `--progress-template`.
pub(super) fn progress_template() -> String {
    format!(
        "download:{} %(progress.status)s %(progress.downloaded_bytes)s %(progress.total_bytes)s \
         %(progress.total_bytes_estimate)s %(progress.speed)s %(progress.eta)s %(progress.filename)s",
        PROGRESS_PREFIX
    )
}

/// Post-processor banners printed once the raw transfer is done.
const POSTPROCESSOR_TAGS: &[&str] = &[
    "[Merger]",
    "[ExtractAudio]",
    "[VideoConvertor]",
    "[VideoRemuxer]",
    "[EmbedSubtitle]",
    "[EmbedThumbnail]",
    "[Metadata]",
    "[FixupM3u8]",
    "[FixupM4a]",
];

fn number(field: &str) -> Option<f64> {
    match field {
        "NA" | "None" | "" => None,
        s => s.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0),
    }
}

fn bytes(field: &str) -> Option<u64> {
    number(field).map(|v| v as u64)
}

/// Parse one stdout line. Returns `None` for lines that carry no progress.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();
    if POSTPROCESSOR_TAGS.iter().any(|tag| line.starts_with(tag)) {
        return Some(ProgressEvent::Finished { filename: None });
    }

    let rest = line.strip_prefix(PROGRESS_PREFIX)?.trim_start();
    let mut fields = rest.splitn(7, ' ');
    let status = fields.next()?;
    let downloaded = fields.next().unwrap_or("NA");
    let total = fields.next().unwrap_or("NA");
    let estimate = fields.next().unwrap_or("NA");
    let speed = fields.next().unwrap_or("NA");
    let eta = fields.next().unwrap_or("NA");
    let filename = fields
        .next()
        .map(str::trim)
        .filter(|f| !f.is_empty() && *f != "NA")
        .map(str::to_string);

    match status {
        "downloading" => Some(ProgressEvent::Transfer(TransferProgress {
            downloaded: bytes(downloaded).unwrap_or(0),
            total: bytes(total).or_else(|| bytes(estimate)),
            speed: number(speed),
            eta: bytes(eta),
        })),
        "finished" => Some(ProgressEvent::Finished { filename }),
        "error" => Some(ProgressEvent::Failed { reason: None }),
        _ => None,
    }
}
