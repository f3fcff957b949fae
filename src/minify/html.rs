//! Markup minification pipeline.
//!
//! Attribute whitespace normalization, inline style/script delegation to
//! the stylesheet and script pipelines, then an ordered list of structural
//! whitespace rules. Ordinary comments act as atomic tokens through the
//! structural rules (a guard alternative re-emits them) and are stripped at
//! the end; IE conditional comments are segmented out up front and emerge
//! byte-identical.
//!
//! The rule order is a compatibility contract: the `img`/`input` marker
//! pair (appended early, removed late) keeps the required space after void
//! elements alive through the tag-to-tag collapses. Do not reorder.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::css::minify_css;
use super::js::minify_js;

/// Guard alternative shared by the structural rules: an HTML comment
/// matches first and is re-emitted unchanged.
const COMMENT_GUARD: &str = r"(?s)(<!--.*?-->)|";

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<([^/\s<>!]+)(\s[^<>]*?)?\s*(/?)>").unwrap());

static RE_STYLE_ATTR_DQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)(<[^<>]*?\sstyle=")([^"<>]*)("[\s/>])"#).unwrap());

static RE_STYLE_ATTR_SQ: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)(<[^<>]*?\sstyle=')([^'<>]*)('[\s/>])").unwrap());

static RE_STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style([^>]*)>(.*?)</style>").unwrap());

static RE_SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script([^>]*)>(.*?)</script>").unwrap());

static RE_VOID_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{COMMENT_GUARD}<(img|input)(>| [^>]*>)")).unwrap()
});

static RE_INTERTAG_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}>(\n+|\s\s+)<")).unwrap());

static RE_WS_BEFORE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}([^>])\s+(</[^<>]*>)")).unwrap());

static RE_WS_AFTER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}(<[^/<>]*>)\s+([^<\s])")).unwrap());

static RE_BETWEEN_OPENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}(<[^/<>]*>)\s+(<[^/<>]*>)")).unwrap());

static RE_BETWEEN_CLOSES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}(</[^<>]*>)\s+(</[^<>]*>)")).unwrap());

static RE_LONG_WS_AFTER_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{COMMENT_GUARD}(</[^<>]*>)\s+(\s)([^\s<])")).unwrap()
});

static RE_LONG_WS_BEFORE_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{COMMENT_GUARD}([^>\s])\s+(\s<[^/<>]*/?>)")).unwrap()
});

static RE_LONG_WS_AFTER_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{COMMENT_GUARD}(<[^/<>]*/?>)\s+(\s)([^\s<])")).unwrap()
});

static RE_EMPTY_BODY_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}(<[^/<>]*>)\s+(</[^<>]*>)")).unwrap());

static RE_VOID_UNMARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{COMMENT_GUARD}<(img|input)(>| [^>]*>)</(img|input)>")).unwrap()
});

static RE_NBSP_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{COMMENT_GUARD}(?:&nbsp;){{2,}}([^<\s])")).unwrap());

static RE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\s*<!--.*?-->\s*").unwrap());

static RE_TEXT_NEWLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^>\n])\n+(<[^!])").unwrap());

static RE_BOUNDARY_TRAILING_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">(\n+|\s\s+)$").unwrap());

static RE_BOUNDARY_LEADING_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\n+|\s\s+)<").unwrap());

/// Minify a markup document.
///
/// Empty and whitespace-only input is returned unchanged. IE conditional
/// comments (`<!--[if ...]`) pass through byte-identical.
pub fn minify_html(input: &str) -> String {
    if input.trim().is_empty() {
        return input.to_string();
    }

    let text = input.replace('\r', "");
    let mut parts = split_conditional_comments(&text);

    for part in &mut parts {
        let Part::Text(t) = part else { continue };
        let mut s = normalize_tag_attributes(t);
        if s.contains(" style=") {
            s = minify_style_attributes(&s);
        }
        if s.contains("</style>") {
            s = RE_STYLE_BLOCK
                .replace_all(&s, |caps: &Captures| {
                    format!("<style{}>{}</style>", &caps[1], minify_css(&caps[2]))
                })
                .into_owned();
        }
        if s.contains("</script>") {
            s = RE_SCRIPT_BLOCK
                .replace_all(&s, |caps: &Captures| {
                    format!("<script{}>{}</script>", &caps[1], minify_js(&caps[2]))
                })
                .into_owned();
        }
        s = structural_passes(&s);
        s = RE_COMMENT.replace_all(&s, "").into_owned();
        s = RE_TEXT_NEWLINE_TAG.replace_all(&s, "$1$2").into_owned();
        *t = s;
    }

    collapse_boundary_whitespace(&mut parts);

    let joined: String = parts
        .into_iter()
        .map(|p| match p {
            Part::Text(t) | Part::Conditional(t) => t,
        })
        .collect();
    joined.trim().to_string()
}

// ============================================================================
// Conditional comment segmentation
// ============================================================================

enum Part {
    Text(String),
    /// `<!--[if ...]...-->`, emitted byte-identical.
    Conditional(String),
}

fn split_conditional_comments(text: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut rest = text;
    let mut plain = String::new();

    while let Some(open) = rest.find("<!--") {
        let Some(close) = rest[open + 4..].find("-->") else {
            break; // unterminated, treat as plain text
        };
        let end = open + 4 + close + 3;
        let body = &rest[open + 4..open + 4 + close];
        if is_conditional(body) {
            plain.push_str(&rest[..open]);
            parts.push(Part::Text(std::mem::take(&mut plain)));
            parts.push(Part::Conditional(rest[open..end].to_string()));
        } else {
            plain.push_str(&rest[..end]);
        }
        rest = &rest[end..];
    }
    plain.push_str(rest);
    parts.push(Part::Text(plain));
    parts
}

fn is_conditional(body: &str) -> bool {
    body.strip_prefix("[if")
        .and_then(|r| r.chars().next())
        .is_some_and(char::is_whitespace)
}

// ============================================================================
// Tag attributes
// ============================================================================

/// Single space between attributes, no whitespace before `>` / `/>`.
/// A tag with an unterminated quote is left alone.
fn normalize_tag_attributes(text: &str) -> String {
    RE_TAG
        .replace_all(text, |caps: &Captures| {
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            match normalize_attrs(attrs) {
                Some(normalized) => format!("<{}{}{}>", &caps[1], normalized, &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn normalize_attrs(raw: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = raw.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.peek() {
            None => break,
            Some('=') => return None, // stray equals, bail
            Some(_) => {}
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                break;
            }
            name.push(c);
            chars.next();
        }
        out.push(' ');
        out.push_str(&name);

        // optional value
        let mut ahead = chars.clone();
        while ahead.peek().is_some_and(|c| c.is_whitespace()) {
            ahead.next();
        }
        if ahead.peek() != Some(&'=') {
            continue; // boolean attribute
        }
        ahead.next();
        while ahead.peek().is_some_and(|c| c.is_whitespace()) {
            ahead.next();
        }
        chars = ahead;
        out.push('=');

        match chars.peek() {
            Some(&q @ ('"' | '\'')) => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == q {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return None; // unterminated quote
                }
                out.push(q);
                out.push_str(&value);
                out.push(q);
            }
            _ => {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    out.push(c);
                    chars.next();
                }
            }
        }
    }
    Some(out)
}

// ============================================================================
// Inline style attributes
// ============================================================================

fn minify_style_attributes(text: &str) -> String {
    let css_attr = |caps: &Captures| {
        format!("{}{}{}", &caps[1], minify_css(&caps[2]), &caps[3])
    };
    let text = RE_STYLE_ATTR_DQ.replace_all(text, css_attr);
    RE_STYLE_ATTR_SQ.replace_all(&text, css_attr).into_owned()
}

// ============================================================================
// Structural whitespace rules
// ============================================================================

fn structural_passes(text: &str) -> String {
    // mark void elements so the space after them survives the collapses
    let s = guarded(&RE_VOID_MARK, text, |caps| {
        format!("<{0}{1}</{0}>", &caps[2], &caps[3])
    });
    let s = guarded(&RE_INTERTAG_WS, &s, |_| "><".to_string());
    let s = guarded(&RE_WS_BEFORE_CLOSE, &s, |caps| {
        format!("{}{}", &caps[2], &caps[3])
    });
    let s = guarded(&RE_WS_AFTER_OPEN, &s, |caps| {
        format!("{}{}", &caps[2], &caps[3])
    });
    let s = guarded_until_stable(&RE_BETWEEN_OPENS, &s);
    let s = guarded_until_stable(&RE_BETWEEN_CLOSES, &s);
    let s = guarded(&RE_LONG_WS_AFTER_CLOSE, &s, |caps| {
        format!("{}{}{}", &caps[2], &caps[3], &caps[4])
    });
    let s = guarded(&RE_LONG_WS_BEFORE_OPEN, &s, |caps| {
        format!("{}{}", &caps[2], &caps[3])
    });
    let s = guarded(&RE_LONG_WS_AFTER_OPEN, &s, |caps| {
        format!("{}{}{}", &caps[2], &caps[3], &caps[4])
    });
    let s = guarded_until_stable(&RE_EMPTY_BODY_WS, &s);
    // reset the void-element markers
    let s = guarded(&RE_VOID_UNMARK, &s, |caps| {
        if caps[2] == caps[4] {
            format!("<{}{}", &caps[2], &caps[3])
        } else {
            caps[0].to_string()
        }
    });
    guarded(&RE_NBSP_RUN, &s, |caps| format!("&nbsp; {}", &caps[2]))
}

/// Apply a structural rule; the comment guard group is re-emitted verbatim.
fn guarded(re: &Regex, text: &str, f: impl Fn(&Captures) -> String) -> String {
    re.replace_all(text, |caps: &Captures| match caps.get(1) {
        Some(comment) => comment.as_str().to_string(),
        None => f(caps),
    })
    .into_owned()
}

/// Tag-pair collapses chain (`<a> <b> <c>`); iterate until stable.
fn guarded_until_stable(re: &Regex, text: &str) -> String {
    let mut cur = text.to_string();
    loop {
        let next = guarded(re, &cur, |caps| format!("{}{}", &caps[2], &caps[3]));
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

/// Apply the between-tags rule across conditional comment boundaries:
/// a conditional starts with `<` and ends with `>`.
fn collapse_boundary_whitespace(parts: &mut [Part]) {
    let conditional_at: Vec<bool> = parts
        .iter()
        .map(|p| matches!(p, Part::Conditional(_)))
        .collect();
    for (i, part) in parts.iter_mut().enumerate() {
        let Part::Text(t) = part else { continue };
        if i + 1 < conditional_at.len() && conditional_at[i + 1] {
            *t = RE_BOUNDARY_TRAILING_WS.replace(t, ">").into_owned();
        }
        if i > 0 && conditional_at[i - 1] {
            *t = RE_BOUNDARY_LEADING_WS.replace(t, "<").into_owned();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_whitespace() {
        assert_eq!(
            minify_html("<div   class=\"a\"   >Hello</div>"),
            "<div class=\"a\">Hello</div>"
        );
        assert_eq!(
            minify_html("<input   type=text    value='b' >"),
            "<input type=text value='b'>"
        );
    }

    #[test]
    fn test_conditional_comment_byte_identical() {
        let cc = "<!--[if IE]><p>old</p><![endif]-->";
        assert_eq!(minify_html(cc), cc);
    }

    #[test]
    fn test_ordinary_comment_removed_conditional_kept() {
        let html = "<div>x</div><!-- note --><!--[if lt IE 9]><script src=\"shim.js\"></script><![endif]-->";
        assert_eq!(
            minify_html(html),
            "<div>x</div><!--[if lt IE 9]><script src=\"shim.js\"></script><![endif]-->"
        );
    }

    #[test]
    fn test_empty_input_identity() {
        assert_eq!(minify_html(""), "");
        assert_eq!(minify_html(" \n "), " \n ");
    }

    #[test]
    fn test_intertag_whitespace() {
        assert_eq!(
            minify_html("<div>\n  <span>x</span>\n</div>"),
            "<div><span>x</span></div>"
        );
        // close-to-open single spaces may separate words and survive
        assert_eq!(minify_html("<ul> <li>a</li> <li>b</li> </ul>"), "<ul><li>a</li> <li>b</li></ul>");
    }

    #[test]
    fn test_text_edges() {
        assert_eq!(minify_html("<p>  hello  </p>"), "<p>hello</p>");
        assert_eq!(minify_html("<b>a</b>  tail  <b>c</b>"), "<b>a</b> tail <b>c</b>");
    }

    #[test]
    fn test_word_space_across_inline_tags() {
        // the single word-separating space must survive
        assert_eq!(minify_html("<b>one</b> two <b>three</b>"), "<b>one</b> two <b>three</b>");
    }

    #[test]
    fn test_void_element_space_preserved() {
        assert_eq!(
            minify_html("<input type=\"a\"> <input type=\"b\">"),
            "<input type=\"a\"> <input type=\"b\">"
        );
        assert_eq!(minify_html("<img src=\"x.png\"> caption"), "<img src=\"x.png\"> caption");
    }

    #[test]
    fn test_style_block() {
        assert_eq!(
            minify_html("<style type=\"text/css\">\na { color: #ffffff; }\n</style>"),
            "<style type=\"text/css\">a{color:#fff}</style>"
        );
    }

    #[test]
    fn test_script_block() {
        assert_eq!(
            minify_html("<script>\nvar a = { 'foo': 1 };\n</script>"),
            "<script>var a={foo:1}</script>"
        );
    }

    #[test]
    fn test_inline_style_attribute() {
        assert_eq!(
            minify_html("<div style=\"margin: 0px; color: #ffffff;\">x</div>"),
            "<div style=\"margin:0;color:#fff;\">x</div>"
        );
        assert_eq!(
            minify_html("<div style='padding: 0.50em'>x</div>"),
            "<div style='padding:.5em'>x</div>"
        );
    }

    #[test]
    fn test_nbsp_run() {
        assert_eq!(minify_html("<p>a&nbsp;&nbsp;&nbsp;b</p>"), "<p>a&nbsp; b</p>");
    }

    #[test]
    fn test_unterminated_quote_leaves_tag() {
        assert_eq!(minify_html("<div class=\"a>b</div>"), "<div class=\"a>b</div>");
    }

    #[test]
    fn test_comment_content_protected_until_removed() {
        // tags inside an ordinary comment never leak into the output
        assert_eq!(minify_html("<p>a</p> <!-- <div>  x </div> --> <p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "<div   class=\"a\"   >Hello</div>",
            "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>",
            "<input type=\"a\"> <input type=\"b\">",
            "<!--[if IE]><p>old</p><![endif]--><p>  new  </p>",
            "<b>one</b> two <b>three</b>",
        ];
        for input in inputs {
            let once = minify_html(input);
            assert_eq!(minify_html(&once), once, "not idempotent for {input:?}");
        }
    }
}
