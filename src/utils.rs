//! Helpers for object key derivation, log formatting, and directory checks.

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Extension given to raw artifact keys.
pub const ARTIFACT_EXTENSION: &str = "pdf";

/// Extension given to translated output keys.
pub const TRANSLATED_EXTENSION: &str = "txt";

/// Derive the raw-bucket key for an artifact URL.
///
/// The key is the URL's last non-empty path segment plus `.pdf`, so
/// `https://arxiv.org/pdf/2501.01234v1` maps to `2501.01234v1.pdf`. A segment
/// that already carries the extension is used as is.
///
/// # Errors
///
/// [`PipelineError::InvalidArtifactUrl`] if the URL does not parse or has no
/// path segment to name the object after.
pub fn artifact_key(artifact_url: &str) -> Result<String> {
    let invalid = || PipelineError::InvalidArtifactUrl(artifact_url.to_string());
    let url = Url::parse(artifact_url).map_err(|_| invalid())?;
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or_else(invalid)?;

    let suffix = format!(".{ARTIFACT_EXTENSION}");
    if segment.ends_with(&suffix) {
        Ok(segment.to_string())
    } else {
        Ok(format!("{segment}{suffix}"))
    }
}

/// Derive the translated-bucket key for a raw object key on `date`.
///
/// The last extension of the key's file name is swapped for `.txt` and the
/// result is nested under a `YYYY-MM-DD/` folder:
///
/// ```ignore
/// assert_eq!(translated_key("paper.pdf", date), "2025-01-01/paper.txt");
/// ```
pub fn translated_key(object_key: &str, date: NaiveDate) -> String {
    let name_start = object_key.rfind('/').map_or(0, |i| i + 1);
    let stem = match object_key[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &object_key[..name_start + dot],
        _ => object_key,
    };
    format!(
        "{}/{stem}.{TRANSLATED_EXTENSION}",
        date.format("%Y-%m-%d")
    )
}

/// Truncate a string for logging purposes.
///
/// Strings longer than `max` bytes are cut at the nearest char boundary and
/// suffixed with `"…(+N bytes)"`.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= max)
        .last()
        .unwrap_or(0);
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Directory is writable");
    Ok(())
}
