//! Content-addressed disk cache for minified assets.
//!
//! One flat directory; each entry is named by the blake3 hash of the
//! absolute source path plus the source extension. Validity is a plain
//! mtime comparison at request time. Writes are atomic (temp file +
//! rename), so two concurrent regenerations of the same stale asset are
//! benign: both produce identical bytes and the last rename wins.

mod key;
pub mod mtime;

pub use key::CacheKey;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::AssetKind;

/// Cache-layer errors. Propagated, never swallowed.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("source file not found: `{0}`")]
    SourceNotFound(PathBuf),

    #[error("I/O error at `{0}`")]
    Io(PathBuf, #[source] io::Error),
}

/// The cache service value handed to call sites; no global state.
#[derive(Debug, Clone)]
pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::Io(self.dir.clone(), e))
    }

    /// Remove every entry and recreate the empty directory.
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir).map_err(|e| CacheError::Io(self.dir.clone(), e))?;
        }
        self.ensure_dir()
    }

    /// On-disk location an entry for `source` would live at.
    pub fn entry_path(&self, source: &Path) -> PathBuf {
        let extension = AssetKind::from_path(source)
            .cache_extension()
            .unwrap_or("raw");
        self.dir.join(CacheKey::for_path(source).filename(extension))
    }

    /// True when an entry exists and is at least as new as the source.
    pub fn is_valid(&self, source: &Path) -> bool {
        mtime::is_entry_fresh(&self.entry_path(source), mtime::get_mtime(source))
    }

    /// Location of a valid entry, or `None`.
    pub fn resolve(&self, source: &Path) -> Option<PathBuf> {
        let entry = self.entry_path(source);
        mtime::is_entry_fresh(&entry, mtime::get_mtime(source)).then_some(entry)
    }

    /// Write `bytes` under the deterministic key for `source`, replacing
    /// any prior entry atomically.
    ///
    /// The cache directory is not created here; a missing directory is an
    /// I/O error for the caller, not something to paper over.
    pub fn store(&self, source: &Path, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let entry = self.entry_path(source);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| CacheError::Io(self.dir.clone(), e))?;
        tmp.write_all(bytes)
            .map_err(|e| CacheError::Io(entry.clone(), e))?;
        tmp.persist(&entry)
            .map_err(|e| CacheError::Io(entry.clone(), e.error))?;
        Ok(entry)
    }

    /// The one entry point callers use: cached bytes when valid, otherwise
    /// regenerate through `minifier`, store, and return the fresh bytes.
    ///
    /// Never returns stale content and never skips minification silently.
    pub fn serve<F>(&self, source: &Path, minifier: F) -> Result<Vec<u8>, CacheError>
    where
        F: Fn(&str) -> String,
    {
        if let Some(entry) = self.resolve(source) {
            crate::debug!("cache"; "hit {}", CacheKey::for_path(source));
            return fs::read(&entry).map_err(|e| CacheError::Io(entry, e));
        }

        let raw = read_source(source)?;
        let minified = minifier(&raw);
        self.store(source, minified.as_bytes())?;
        crate::debug!("cache"; "stored {}", CacheKey::for_path(source));
        Ok(minified.into_bytes())
    }
}

/// Read a source file as text; a missing file is its own error kind.
fn read_source(path: &Path) -> Result<String, CacheError> {
    match fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(CacheError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => Err(CacheError::Io(path.to_path_buf(), e)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minify::minify_css;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AssetCache, PathBuf) {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::new(dir.path().join("cache"));
        cache.ensure_dir().unwrap();
        let source = dir.path().join("app.css");
        fs::write(&source, "a { color: #ffffff; margin: 0px; }").unwrap();
        (dir, cache, source)
    }

    #[test]
    fn test_serve_matches_direct_minify() {
        let (_dir, cache, source) = setup();

        let direct = minify_css("a { color: #ffffff; margin: 0px; }");
        let first = cache.serve(&source, minify_css).unwrap();
        assert_eq!(first, direct.as_bytes());

        // second call comes from the cache, byte-identical
        let second = cache.serve(&source, minify_css).unwrap();
        assert_eq!(second, first);
        assert!(cache.is_valid(&source));
    }

    #[test]
    fn test_resolve_none_before_store() {
        let (_dir, cache, source) = setup();
        assert!(!cache.is_valid(&source));
        assert!(cache.resolve(&source).is_none());
    }

    #[test]
    fn test_invalidation_on_source_change() {
        let (_dir, cache, source) = setup();

        cache.serve(&source, minify_css).unwrap();
        assert!(cache.is_valid(&source));

        thread::sleep(Duration::from_millis(10));
        fs::write(&source, "b { padding: 0.50em; }").unwrap();
        assert!(!cache.is_valid(&source));

        let regenerated = cache.serve(&source, minify_css).unwrap();
        assert_eq!(regenerated, b"b{padding:.5em}");
        assert!(cache.is_valid(&source));
    }

    #[test]
    fn test_store_overwrites() {
        let (_dir, cache, source) = setup();
        cache.store(&source, b"one").unwrap();
        let entry = cache.store(&source, b"two").unwrap();
        assert_eq!(fs::read(entry).unwrap(), b"two");
    }

    #[test]
    fn test_source_not_found() {
        let (dir, cache, _) = setup();
        let missing = dir.path().join("missing.css");
        match cache.serve(&missing, minify_css) {
            Err(CacheError::SourceNotFound(p)) => assert_eq!(p, missing),
            other => panic!("expected SourceNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_store_without_dir_is_io_error() {
        let dir = TempDir::new().unwrap();
        let cache = AssetCache::new(dir.path().join("never-created"));
        let source = dir.path().join("app.css");
        fs::write(&source, "a{}").unwrap();
        assert!(matches!(
            cache.store(&source, b"x"),
            Err(CacheError::Io(_, _))
        ));
    }

    #[test]
    fn test_clear() {
        let (_dir, cache, source) = setup();
        cache.serve(&source, minify_css).unwrap();
        assert!(cache.is_valid(&source));

        cache.clear().unwrap();
        assert!(!cache.is_valid(&source));
        assert!(cache.dir().exists());
    }

    #[test]
    fn test_distinct_sources_distinct_entries() {
        let (dir, cache, source) = setup();
        let other = dir.path().join("other.css");
        fs::write(&other, "x { margin: 0px; }").unwrap();

        cache.serve(&source, minify_css).unwrap();
        cache.serve(&other, minify_css).unwrap();
        assert_ne!(cache.entry_path(&source), cache.entry_path(&other));
        assert_eq!(cache.serve(&other, minify_css).unwrap(), b"x{margin:0}");
    }
}
