//! Source URL validation for submitted tasks.
//!
//! Clients send raw strings; the task manager only accepts trimmed,
//! absolute `http`/`https` URLs so nothing else reaches the engine.

/// Why a submitted URL was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidUrl {
    #[error("URL must not be empty")]
    Empty,
    #[error("invalid URL: {0}")]
    Malformed(String),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Trim and validate a source URL, returning it in its submitted form.
pub fn normalize_source_url(raw: &str) -> Result<String, InvalidUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InvalidUrl::Empty);
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| InvalidUrl::Malformed(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(InvalidUrl::UnsupportedScheme(other.to_string())),
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(InvalidUrl::Malformed("missing host".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Keep the non-blank entries of a batch, trimmed, in order.
pub fn non_blank_urls<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    raw.into_iter()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}
