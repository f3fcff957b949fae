//! Mtime-based freshness detection for cache entries.
//!
//! A cache entry is fresh when it exists and its modification time is not
//! older than the source it was derived from. Staleness is detected at
//! request time; nothing tracks it proactively.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file.
///
/// Returns `None` if the file doesn't exist or mtime cannot be read.
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if a cache entry is fresh relative to the given source mtime.
///
/// Returns `true` if the entry exists and is at least as new as the
/// source, meaning regeneration can be skipped.
pub fn is_entry_fresh(entry: &Path, source_mtime: Option<SystemTime>) -> bool {
    let Some(source_time) = source_mtime else {
        return false;
    };

    entry
        .metadata()
        .and_then(|m| m.modified())
        .map(|entry_time| entry_time >= source_time)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_mtime_missing() {
        assert!(get_mtime(Path::new("/nonexistent/file.css")).is_none());
    }

    #[test]
    fn test_entry_fresh_same_or_newer() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.css");
        let entry = dir.path().join("a.cached");
        fs::write(&source, "x").unwrap();
        fs::write(&entry, "y").unwrap();

        // entry written after (or at the same instant as) the source
        assert!(is_entry_fresh(&entry, get_mtime(&source)));
    }

    #[test]
    fn test_entry_stale_when_source_newer() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.css");
        let entry = dir.path().join("a.cached");
        fs::write(&entry, "y").unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&source, "x").unwrap();

        assert!(!is_entry_fresh(&entry, get_mtime(&source)));
    }

    #[test]
    fn test_entry_missing_is_stale() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.css");
        fs::write(&source, "x").unwrap();

        assert!(!is_entry_fresh(&dir.path().join("missing"), get_mtime(&source)));
    }

    #[test]
    fn test_missing_source_is_stale() {
        let dir = TempDir::new().unwrap();
        let entry = dir.path().join("a.cached");
        fs::write(&entry, "y").unwrap();

        assert!(!is_entry_fresh(&entry, None));
    }
}
