//! Plain-text resume bodies used as cover-letter context.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::generation::single_component;

const DEFAULT_PRESET: &str = "simple";

/// Maps a resume template name to its resume-body file stem:
/// `"Resume – Systemdev"` → `"systemdev"`, empty → `"simple"`.
///
/// `None` when the stem is not a plain file name.
pub fn resume_preset(template: &str) -> Option<String> {
    let lower = template.trim().to_lowercase();
    let preset = lower
        .strip_prefix("resume – ")
        .or_else(|| lower.strip_prefix("resume - "))
        .unwrap_or(&lower)
        .trim();
    if preset.is_empty() {
        return Some(DEFAULT_PRESET.to_string());
    }
    single_component(preset).map(|_| preset.to_string())
}

/// Loads `<dir>/<preset>.txt`, falling back to the text of `<dir>/<preset>.pdf`.
///
/// Best effort: a missing or unreadable resume is logged and yields an empty body.
pub async fn load_resume_body(dir: &Path, preset: &str) -> String {
    let txt = dir.join(format!("{preset}.txt"));
    match tokio::fs::read_to_string(&txt).await {
        Ok(body) => return body,
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            warn!("Could not read resume {}: {e}", txt.display());
            return String::new();
        }
        Err(_) => {}
    }

    let pdf = dir.join(format!("{preset}.pdf"));
    if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
        warn!(
            "No resume body found at {} or {}; continuing without one",
            txt.display(),
            pdf.display()
        );
        return String::new();
    }

    match extract_pdf_text(pdf.clone()).await {
        Ok(body) => {
            info!("Loaded resume body from {}", pdf.display());
            body
        }
        Err(e) => {
            warn!("Could not extract text from {}: {e}", pdf.display());
            String::new()
        }
    }
}

async fn extract_pdf_text(path: PathBuf) -> anyhow::Result<String> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path)).await??;
    Ok(text)
}
