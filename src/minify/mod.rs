//! Minification pipelines for stylesheets, scripts and markup.
//!
//! Each pipeline is a pure function over text: an ordered list of passes,
//! every pass a single rewrite of the whole input, composing left to right.
//! Protected spans (strings, preserved comments, regex literals) are never
//! rewritten; malformed input degrades to leaving the offending span
//! untouched, never to an error.

mod css;
mod html;
mod js;
mod scan;

pub use css::minify_css;
pub use html::minify_html;
pub use js::minify_js;

use crate::core::AssetKind;

/// Minify content for the given asset kind.
///
/// Returns `None` for kinds this engine does not transform.
pub fn minify(kind: AssetKind, content: &str) -> Option<String> {
    match kind {
        AssetKind::Css => Some(minify_css(content)),
        AssetKind::Js => Some(minify_js(content)),
        AssetKind::Html => Some(minify_html(content)),
        AssetKind::Other => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch() {
        assert_eq!(minify(AssetKind::Css, "a { }").as_deref(), Some(""));
        assert_eq!(minify(AssetKind::Js, "a = 1 ;").as_deref(), Some("a=1"));
        assert_eq!(minify(AssetKind::Html, "<p>x</p>").as_deref(), Some("<p>x</p>"));
        assert_eq!(minify(AssetKind::Other, "raw"), None);
    }
}
