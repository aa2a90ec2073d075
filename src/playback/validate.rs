//! Request validation
//!
//! Normalizes caller input into a classified, sandboxed media source before
//! anything reaches the queue. Local paths are resolved against a single
//! configured media root; anything resolving outside it is rejected, as are
//! missing files and extensions outside the allow-list. URLs are only
//! accepted from trusted attachment hosts and re-prefixed with https.

use crate::error::{Error, Result};
use crate::playback::request::MediaSource;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Accepted local file extensions (lowercase)
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["mp3", "ogg", "wav"];

/// Validates and classifies raw playback sources
#[derive(Debug, Clone)]
pub struct RequestValidator {
    root: PathBuf,
    trusted_hosts: Vec<String>,
}

impl RequestValidator {
    /// Create a validator rooted at `root` (must exist)
    pub fn new(root: impl AsRef<Path>, trusted_hosts: Vec<String>) -> Result<Self> {
        let root = root.as_ref().canonicalize().map_err(|e| {
            Error::Config(format!(
                "Media root {} is not accessible: {}",
                root.as_ref().display(),
                e
            ))
        })?;
        Ok(Self {
            root,
            trusted_hosts,
        })
    }

    /// The canonical media root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Classify a raw source string as a trusted URL or a sandboxed local file
    pub fn classify(&self, raw: &str) -> Result<MediaSource> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Validation("Empty source".to_string()));
        }

        // Strip known protocol prefixes; trusted hosts come back as https
        let remainder = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        if let Some(rest) = remainder {
            if self
                .trusted_hosts
                .iter()
                .any(|host| rest.starts_with(host.as_str()))
            {
                return Ok(MediaSource::Remote(format!("https://{}", rest)));
            }
        }

        // Everything else is a local file under the media root
        let resolved = normalize(&self.root.join(trimmed));
        if !resolved.starts_with(&self.root) {
            return Err(Error::Validation(format!(
                "Path escapes media root: {}",
                trimmed
            )));
        }
        if !resolved.is_file() {
            return Err(Error::Validation(format!(
                "File not found: {}",
                trimmed
            )));
        }
        if !has_allowed_extension(&resolved) {
            return Err(Error::Validation(format!(
                "Unsupported extension: {}",
                trimmed
            )));
        }

        debug!(path = %resolved.display(), "Classified local source");
        Ok(MediaSource::Local(resolved))
    }

    /// Expand paths and directories into concrete file lists
    ///
    /// Directories are walked recursively and filtered by the extension
    /// allow-list; URLs and plain file entries pass through unchanged and
    /// are validated individually at enqueue time.
    pub fn expand_sources(&self, items: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        for item in items {
            let trimmed = item.trim();
            if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
                expanded.push(trimmed.to_string());
                continue;
            }

            let resolved = normalize(&self.root.join(trimmed));
            if resolved.starts_with(&self.root) && resolved.is_dir() {
                for entry in WalkDir::new(&resolved)
                    .sort_by_file_name()
                    .into_iter()
                    .filter_map(|e| e.ok())
                {
                    let path = entry.path();
                    if entry.file_type().is_file() && has_allowed_extension(path) {
                        expanded.push(path.display().to_string());
                    }
                }
            } else {
                expanded.push(trimmed.to_string());
            }
        }
        expanded
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
///
/// Keeps the traversal guard independent of symlink resolution and lets it
/// run before the existence check.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
