//! Asset kind dispatch.

use std::path::Path;

use crate::utils::mime;

/// Kind of servable asset, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Stylesheet, minified and cached.
    Css,
    /// Script, minified and cached.
    Js,
    /// Markup, minified per request, never cached.
    Html,
    /// Everything else, served raw.
    Other,
}

impl AssetKind {
    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(path.extension().and_then(|e| e.to_str()))
    }

    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("css") => Self::Css,
            Some("js") => Self::Js,
            Some("html" | "htm") => Self::Html,
            _ => Self::Other,
        }
    }

    /// Only css/js artifacts go through the disk cache.
    #[allow(dead_code)]
    pub fn is_cacheable(self) -> bool {
        matches!(self, Self::Css | Self::Js)
    }

    /// Response content type for minified output.
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            Self::Css => Some("text/css"),
            Self::Js => Some("application/javascript"),
            Self::Html => Some(mime::types::HTML),
            Self::Other => None,
        }
    }

    /// Cache file suffix.
    pub fn cache_extension(self) -> Option<&'static str> {
        match self {
            Self::Css => Some("css"),
            Self::Js => Some("js"),
            Self::Html | Self::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_path() {
        assert_eq!(AssetKind::from_path(&PathBuf::from("a/app.css")), AssetKind::Css);
        assert_eq!(AssetKind::from_path(&PathBuf::from("app.JS")), AssetKind::Js);
        assert_eq!(AssetKind::from_path(&PathBuf::from("index.html")), AssetKind::Html);
        assert_eq!(AssetKind::from_path(&PathBuf::from("logo.png")), AssetKind::Other);
        assert_eq!(AssetKind::from_path(&PathBuf::from("no_extension")), AssetKind::Other);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(AssetKind::Css.content_type(), Some("text/css"));
        assert_eq!(AssetKind::Js.content_type(), Some("application/javascript"));
        assert_eq!(AssetKind::Other.content_type(), None);
    }

    #[test]
    fn test_cacheable() {
        assert!(AssetKind::Css.is_cacheable());
        assert!(AssetKind::Js.is_cacheable());
        assert!(!AssetKind::Html.is_cacheable());
        assert!(!AssetKind::Other.is_cacheable());
    }
}
