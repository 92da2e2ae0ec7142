//! File system state for one invocation
//!
//! Modification times are looked up once and cached; a missing file reads as
//! [`MISSING_FILE_TIME`]. Content hashes use SHA-256, as recorded in build info.

use crate::error::{BuildError, BuildResult};
use dashmap::DashMap;
use filetime::FileTime;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Modification time reported for files that do not exist
pub const MISSING_FILE_TIME: SystemTime = UNIX_EPOCH;

/// Cached view of file modification times
#[derive(Debug, Default)]
pub struct FileSystemState {
    mtimes: DashMap<PathBuf, SystemTime>,
}

impl FileSystemState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modification time of `path`, or [`MISSING_FILE_TIME`]
    pub fn modified(&self, path: &Path) -> SystemTime {
        if let Some(time) = self.mtimes.get(path) {
            return *time;
        }

        let time = read_modified(path);
        *self.mtimes.entry(path.to_path_buf()).or_insert(time)
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.modified(path) != MISSING_FILE_TIME
    }

    /// Drop the cached time of a file this invocation rewrote
    pub fn invalidate(&self, path: &Path) {
        self.mtimes.remove(path);
    }

    /// Set the modification time of an existing file
    pub fn touch(&self, path: &Path, time: SystemTime) -> BuildResult<()> {
        filetime::set_file_mtime(path, FileTime::from_system_time(time))
            .map_err(|e| BuildError::io(path, e))?;
        trace!(path = %path.display(), "touched");
        self.mtimes.insert(path.to_path_buf(), time);
        Ok(())
    }
}

fn read_modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(MISSING_FILE_TIME)
}

/// SHA-256 of a file's content, hex encoded
pub fn hash_file(path: &Path) -> BuildResult<String> {
    let content = fs::read(path).map_err(|e| BuildError::io(path, e))?;
    Ok(hash_content(&content))
}

pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_epoch() {
        let temp_dir = TempDir::new().unwrap();
        let state = FileSystemState::new();
        let path = temp_dir.path().join("missing.kl");
        assert_eq!(state.modified(&path), MISSING_FILE_TIME);
        assert!(!state.exists(&path));
    }

    #[test]
    fn test_modified_is_cached_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.kl");
        fs::write(&path, "a").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        filetime::set_file_mtime(&path, FileTime::from_system_time(past)).unwrap();

        let state = FileSystemState::new();
        let first = state.modified(&path);

        let later = SystemTime::now() - Duration::from_secs(60);
        filetime::set_file_mtime(&path, FileTime::from_system_time(later)).unwrap();
        assert_eq!(state.modified(&path), first);

        state.invalidate(&path);
        assert!(state.modified(&path) > first);
    }

    #[test]
    fn test_touch_updates_disk_and_cache() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.out");
        fs::write(&path, "a").unwrap();
        let state = FileSystemState::new();
        let past = SystemTime::now() - Duration::from_secs(7200);
        state.modified(&path);

        state.touch(&path, past).unwrap();
        let on_disk = fs::metadata(&path).unwrap().modified().unwrap();
        let diff = on_disk
            .duration_since(past)
            .unwrap_or_else(|e| e.duration());
        assert!(diff < Duration::from_secs(1));
        assert_eq!(state.modified(&path), past);
    }

    #[test]
    fn test_touch_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let state = FileSystemState::new();
        assert!(state
            .touch(&temp_dir.path().join("none"), SystemTime::now())
            .is_err());
    }

    #[test]
    fn test_hash_is_content_based() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.kl");
        let b = temp_dir.path().join("b.kl");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_eq!(hash_file(&a).unwrap(), hash_content(b"same"));
        assert_ne!(hash_content(b"same"), hash_content(b"other"));
    }
}
