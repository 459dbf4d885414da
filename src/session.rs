//! Per-request working directories
//!
//! Every request gets its own directory under a shared root. The directory
//! is removed when its [`Session`] is dropped, whether the request succeeded
//! or failed, so no artifact outlives the request that made it.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::Result;

const SESSION_PREFIX: &str = "session-";

/// Parent directory of all sessions
#[derive(Debug, Clone)]
pub struct SessionRoot {
    path: PathBuf,
}

impl SessionRoot {
    /// Use `path` as the root, creating it if needed.
    ///
    /// Creation is idempotent, so several processes may race on it.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// `<system temp>/pdf-studio`
    pub fn default_location() -> PathBuf {
        std::env::temp_dir().join("pdf-studio")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a fresh, uniquely named session directory
    pub fn acquire(&self) -> Result<Session> {
        // The root may have been removed behind our back
        fs::create_dir_all(&self.path)?;
        let dir = tempfile::Builder::new()
            .prefix(SESSION_PREFIX)
            .tempdir_in(&self.path)?;
        debug!(path = %dir.path().display(), "session opened");
        Ok(Session { dir })
    }

    /// Remove leftover session directories; returns how many were removed.
    ///
    /// Only a safety net for sessions lost to a crash: live sessions clean
    /// up after themselves.
    pub fn purge(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let is_session = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SESSION_PREFIX));
            if !is_session {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("cannot remove {}: {}", entry.path().display(), e),
            }
        }
        Ok(removed)
    }
}

/// One request's working directory, removed on drop
#[derive(Debug)]
pub struct Session {
    dir: TempDir,
}

impl Session {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Store a file in the session under a sanitized version of `name`
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(sanitize_file_name(name));
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove the directory now, reporting failures that drop would ignore
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(path = %path.display(), "session closed");
        Ok(())
    }
}

/// Keep only the final path component and replace characters that are
/// awkward in file names
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "upload".to_string(),
        trimmed => trimmed.to_string(),
    }
}
