use std::path::{Path, PathBuf};

use crate::model::TestCase;
use crate::reporter::display::clean_title;
use crate::tracker::Attachment;

/// Which failure artifact a file is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Screenshot,
    Video,
    Trace,
}

impl ArtifactKind {
    /// Log message sent with the uploaded file.
    pub fn caption(self) -> &'static str {
        match self {
            Self::Screenshot => "📷 Last seen screenshot",
            Self::Video => "🎥 Recorded video",
            Self::Trace => "🧭 Recorded trace",
        }
    }
}

/// An artifact file that could not be loaded.
#[derive(Debug, thiserror::Error)]
#[error("couldn't read artifact {}: {source}", .path.display())]
pub struct ArtifactError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// MIME type from the file extension.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Read a file into an [`Attachment`] named after the file.
///
/// # Errors
///
/// Returns [`ArtifactError`] if the file cannot be read.
pub fn load(path: &Path) -> Result<Attachment, ArtifactError> {
    let content = std::fs::read(path).map_err(|source| ArtifactError {
        path: path.to_owned(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_owned());
    Ok(Attachment {
        name,
        mime: mime_for(path).to_owned(),
        content,
    })
}

fn resolve(path: &Path, output_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        output_dir.join(path)
    }
}

/// Where the runner leaves the failure screenshot when none is listed.
pub fn default_screenshot_path(test: &TestCase, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.failed.png", clean_title(&test.title)))
}

/// Screenshot path of a failed test: the listed one, else the runner default.
pub fn screenshot_path(test: &TestCase, output_dir: &Path) -> PathBuf {
    test.artifacts
        .screenshot
        .as_deref()
        .map(|p| resolve(p, output_dir))
        .unwrap_or_else(|| default_screenshot_path(test, output_dir))
}

/// Artifact paths to try for a failed test, screenshot first.
pub fn candidates(test: &TestCase, output_dir: &Path) -> Vec<(ArtifactKind, PathBuf)> {
    let bundle = &test.artifacts;
    let mut found = vec![(ArtifactKind::Screenshot, screenshot_path(test, output_dir))];
    if let Some(video) = &bundle.video {
        found.push((ArtifactKind::Video, resolve(video, output_dir)));
    }
    if let Some(trace) = &bundle.trace {
        found.push((ArtifactKind::Trace, resolve(trace, output_dir)));
    }
    found
}

fn try_load(test: &TestCase, path: &Path) -> Option<Attachment> {
    match load(path) {
        Ok(attachment) => Some(attachment),
        Err(err) if err.source.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(%err, test = %test.title, "artifact unavailable");
            None
        }
        Err(err) => {
            tracing::warn!(%err, test = %test.title, "continuing without artifact");
            None
        }
    }
}

/// Load every available artifact of a failed test. Missing files are skipped.
pub fn collect(test: &TestCase, output_dir: &Path) -> Vec<(ArtifactKind, Attachment)> {
    candidates(test, output_dir)
        .into_iter()
        .filter_map(|(kind, path)| try_load(test, &path).map(|attachment| (kind, attachment)))
        .collect()
}

/// The failure screenshot alone, if one can be read. Other artifacts are not touched.
pub fn screenshot(test: &TestCase, output_dir: &Path) -> Option<Attachment> {
    try_load(test, &screenshot_path(test, output_dir))
}
