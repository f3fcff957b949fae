//! Content-addressed cache keys (blake3 over the source path).

use std::path::Path;

/// A 256-bit cache key: blake3 of the absolute source path.
///
/// Two different paths colliding is a theoretical, non-handled risk, the
/// usual trade of hash-based naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Derive the key for a source path.
    pub fn for_path(path: &Path) -> Self {
        let bytes = path.as_os_str().as_encoded_bytes();
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Get the raw bytes.
    #[allow(dead_code)]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Full hex rendering, used as the cache file stem.
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// Cache filename: `<hex>.<ext>`.
    pub fn filename(&self, extension: &str) -> String {
        format!("{}.{}", self.to_hex(), extension)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display first 16 chars of hex for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deterministic() {
        let a = CacheKey::for_path(&PathBuf::from("/srv/site/app.css"));
        let b = CacheKey::for_path(&PathBuf::from("/srv/site/app.css"));
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_distinct_paths_distinct_keys() {
        let a = CacheKey::for_path(&PathBuf::from("/srv/site/app.css"));
        let b = CacheKey::for_path(&PathBuf::from("/srv/site/app.js"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_filename_shape() {
        let key = CacheKey::for_path(&PathBuf::from("/srv/site/app.css"));
        let name = key.filename("css");
        assert_eq!(name.len(), 64 + 4);
        assert!(name.ends_with(".css"));
    }

    #[test]
    fn test_display_truncated() {
        let key = CacheKey::for_path(&PathBuf::from("/srv/site/app.css"));
        assert_eq!(format!("{key}").len(), 16);
    }
}
