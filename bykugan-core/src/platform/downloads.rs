//! Directory-backed download affordance
//!
//! `create_object_url` stages the blob in a hidden temporary file next to
//! its destination, `trigger_download` moves it into place under the
//! suggested name and `revoke_object_url` removes whatever is still staged.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{DownloadProvider, ObjectUrl};
use crate::config::DEFAULT_FILENAME;
use crate::error::{RecorderError, Result};
use crate::types::Blob;

/// Saves recordings into a directory
pub struct DirectoryDownloads {
    /// Destination directory
    dir: PathBuf,
    /// Staged blobs by object URL
    staged: Mutex<HashMap<ObjectUrl, NamedTempFile>>,
    /// Files written so far, oldest first
    saved: Mutex<Vec<PathBuf>>,
    /// Object URL counter
    next_id: AtomicU64,
}

impl DirectoryDownloads {
    /// Save into `dir`, creating it on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            staged: Mutex::new(HashMap::new()),
            saved: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Save into the user's download directory
    pub fn user_default() -> Self {
        let dir = dirs::download_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    /// Destination directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the most recent saved file
    pub fn last_saved(&self) -> Option<PathBuf> {
        self.saved.lock().last().cloned()
    }

    /// Number of blobs staged but not yet saved or revoked
    pub fn staged_count(&self) -> usize {
        self.staged.lock().len()
    }
}

impl DownloadProvider for DirectoryDownloads {
    fn create_object_url(&self, blob: &Blob) -> Result<ObjectUrl> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            RecorderError::download(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let mut staged = tempfile::Builder::new()
            .prefix(".bykugan-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        staged.write_all(blob.as_bytes())?;
        staged.flush()?;

        let url = ObjectUrl::new(format!(
            "blob:bykugan/{}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        debug!(
            "Staged {} bytes ({}) at {:?} as {}",
            blob.size(),
            blob.mime_type(),
            staged.path(),
            url
        );

        self.staged.lock().insert(url.clone(), staged);
        Ok(url)
    }

    fn trigger_download(&self, url: &ObjectUrl, filename: &str) -> Result<()> {
        let staged = self
            .staged
            .lock()
            .remove(url)
            .ok_or_else(|| RecorderError::download(format!("Unknown object URL {}", url)))?;

        let target = unique_path(&self.dir, &sanitize_filename(filename));
        staged.persist(&target).map_err(|e| {
            RecorderError::download(format!("Failed to write {}: {}", target.display(), e.error))
        })?;

        info!("Saved recording to {}", target.display());
        self.saved.lock().push(target);
        Ok(())
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        // Dropping the temp file removes it from disk
        if self.staged.lock().remove(url).is_some() {
            debug!("Revoked {} before it was saved", url);
        }
    }
}

/// Keep only the final path component and drop characters no filesystem likes
pub fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        DEFAULT_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// `dir/name`, or `dir/stem (n).ext` if that already exists
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let ext = path.extension().and_then(|e| e.to_str());

    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
