//! Script minification pipeline.
//!
//! Ordered passes over span-scanned text. String and regex literals are
//! protected spans; no pass may alter a byte inside them. Comments vanish
//! unless they carry a `!` or `@cc_on` marker.

use std::sync::LazyLock;

use regex::Regex;

use super::scan::{self, Span, SpanKind};

static RE_PUNCTUATION_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([!%&*()\-=+\[\]\{\}|;:,.<>?/])\s*").unwrap());

static RE_SEMI_BEFORE_BRACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";+\}").unwrap());

static RE_IDENT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:\d+|[a-z_][a-z0-9_]*)$").unwrap());

static RE_IDENT_MEMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z_][a-z0-9_]*$").unwrap());

/// Minify a script.
///
/// Empty and whitespace-only input is returned unchanged.
pub fn minify_js(input: &str) -> String {
    if input.trim().is_empty() {
        return input.to_string();
    }

    let mut spans = scan::scan_js(input);
    strip_comments(&mut spans);
    trim_around_strings(&mut spans);

    for span in spans.iter_mut().filter(|s| s.is_code()) {
        let code = RE_PUNCTUATION_WS.replace_all(&span.text, "$1");
        span.text = RE_SEMI_BEFORE_BRACE.replace_all(&code, "}").into_owned();
    }

    unquote_object_keys(&mut spans);
    dot_member_access(&mut spans);

    let mut spans = scan::coalesce(spans);
    trim_outer(&mut spans);
    scan::join(&spans)
}

// ============================================================================
// Comments
// ============================================================================

/// Drop comments; `/*!` and `/*@cc_on` blocks survive verbatim, as does an
/// unterminated block comment.
fn strip_comments(spans: &mut Vec<Span>) {
    spans.retain(|span| {
        if span.kind != SpanKind::Comment {
            return true;
        }
        if span.text.starts_with("//") {
            return false;
        }
        span.text[2..].starts_with('!')
            || span.text[2..].starts_with("@cc_on")
            || !span.text.ends_with("*/")
    });
    let merged = scan::coalesce(std::mem::take(spans));
    *spans = merged;
}

// ============================================================================
// Whitespace
// ============================================================================

/// Remove whitespace directly adjacent to string literals.
///
/// `return 'x'` -> `return'x'` stays parseable; the quote separates the
/// tokens on its own.
fn trim_around_strings(spans: &mut [Span]) {
    for i in 0..spans.len() {
        if spans[i].kind != SpanKind::Str {
            continue;
        }
        if i > 0 && spans[i - 1].is_code() {
            let prev = &mut spans[i - 1];
            prev.text = prev.text.trim_end().to_string();
        }
        if i + 1 < spans.len() && spans[i + 1].is_code() {
            let next = &mut spans[i + 1];
            next.text = next.text.trim_start().to_string();
        }
    }
}

// ============================================================================
// Object keys and member access
// ============================================================================

/// `{'foo':1}` -> `{foo:1}` for single-quoted identifier or digit keys.
/// Double-quoted keys stay quoted.
fn unquote_object_keys(spans: &mut Vec<Span>) {
    for i in 0..spans.len() {
        let Some((quote, content)) = quoted(&spans[i]) else {
            continue;
        };
        if quote != '\'' || !RE_IDENT_KEY.is_match(&content) {
            continue;
        }
        let preceded = i > 0
            && spans[i - 1].is_code()
            && spans[i - 1].text.ends_with(['{', ',']);
        let followed = spans
            .get(i + 1)
            .is_some_and(|s| s.is_code() && s.text.starts_with(':'));
        if preceded && followed {
            spans[i] = Span::code(content);
        }
    }
}

/// `foo['bar']` -> `foo.bar` when the subscript is an identifier string
/// and the bracket follows an identifier, `)` or `]`.
///
/// Chained subscripts (`a['b']['c']`) expose a new rewrite site each time
/// one collapses; iterate until stable.
fn dot_member_access(spans: &mut Vec<Span>) {
    loop {
        *spans = scan::coalesce(std::mem::take(spans));
        let mut changed = false;
        for i in 0..spans.len() {
            let Some((_, content)) = quoted(&spans[i]) else {
                continue;
            };
            if !RE_IDENT_MEMBER.is_match(&content) {
                continue;
            }
            let preceded = i > 0 && spans[i - 1].is_code() && {
                let prev = &spans[i - 1].text;
                let mut rev = prev.chars().rev();
                rev.next() == Some('[')
                    && rev
                        .next()
                        .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ')' | ']'))
            };
            let followed = spans
                .get(i + 1)
                .is_some_and(|s| s.is_code() && s.text.starts_with(']'));
            if preceded && followed {
                let prev = &mut spans[i - 1];
                prev.text.pop();
                spans[i] = Span::code(format!(".{content}"));
                let next = &mut spans[i + 1];
                next.text.remove(0);
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

/// Quote character and inner content of a terminated string span.
fn quoted(span: &Span) -> Option<(char, String)> {
    if span.kind != SpanKind::Str || span.text.len() < 2 {
        return None;
    }
    let quote = span.text.chars().next()?;
    if !span.text.ends_with(quote) {
        return None;
    }
    Some((quote, span.text[1..span.text.len() - 1].to_string()))
}

fn trim_outer(spans: &mut Vec<Span>) {
    if let Some(first) = spans.first_mut()
        && first.is_code()
    {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = spans.last_mut()
        && last.is_code()
    {
        // end of input closes the last statement like a brace would
        last.text = last.text.trim_end().trim_end_matches(';').to_string();
    }
    spans.retain(|s| !s.text.is_empty());
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_keys() {
        assert_eq!(
            minify_js("var a = { 'foo': 1, 'bar-baz': 2 };"),
            "var a={foo:1,'bar-baz':2}"
        );
    }

    #[test]
    fn test_member_access() {
        assert_eq!(minify_js("foo['bar'] = 1;"), "foo.bar=1");
        assert_eq!(minify_js("foo()['bar'] = 1;"), "foo().bar=1");
        assert_eq!(minify_js("a['b']['c'] = 1;"), "a.b.c=1");
        // non-identifier subscripts stay bracketed
        assert_eq!(minify_js("foo['bar-baz'] = 1;"), "foo['bar-baz']=1");
        assert_eq!(minify_js("foo['0'] = 1;"), "foo['0']=1");
    }

    #[test]
    fn test_double_quoted_keys_kept() {
        assert_eq!(minify_js("var a = { \"foo\": 1 };"), "var a={\"foo\":1}");
    }

    #[test]
    fn test_empty_input_identity() {
        assert_eq!(minify_js(""), "");
        assert_eq!(minify_js("  \n "), "  \n ");
    }

    #[test]
    fn test_comments_stripped() {
        assert_eq!(minify_js("var a = 1; // count\nvar b = 2;"), "var a=1;var b=2");
        assert_eq!(minify_js("a(); /* step */ b();"), "a();b()");
    }

    #[test]
    fn test_preserved_comments() {
        assert_eq!(minify_js("/*! license */\nvar a = 1;"), "/*! license */\nvar a=1");
        assert_eq!(
            minify_js("/*@cc_on var ie = 1; @*/ var a = 1;"),
            "/*@cc_on var ie = 1; @*/ var a=1"
        );
    }

    #[test]
    fn test_string_content_untouched() {
        assert_eq!(
            minify_js("var s = 'a  //  b  /* c */';"),
            "var s='a  //  b  /* c */'"
        );
        assert_eq!(minify_js("var u = \"http://x/y\";"), "var u=\"http://x/y\"");
    }

    #[test]
    fn test_regex_literal_untouched() {
        assert_eq!(minify_js("var re = /a ; b, {c}/g;"), "var re=/a ; b, {c}/g");
        assert_eq!(minify_js("if (/x y/.test(s)) { go(); }"), "if(/x y/.test(s)){go()}");
    }

    #[test]
    fn test_division_collapses() {
        assert_eq!(minify_js("var x = a / b;"), "var x=a/b");
    }

    #[test]
    fn test_semicolon_before_brace() {
        assert_eq!(minify_js("function f() { return 1; }"), "function f(){return 1}");
        assert_eq!(minify_js("if (x) { a(); b(); }"), "if(x){a();b()}");
    }

    #[test]
    fn test_space_trim_around_strings() {
        assert_eq!(minify_js("return 'x';"), "return'x'");
        assert_eq!(minify_js("case 'a': break;"), "case'a':break");
    }

    #[test]
    fn test_keyword_then_regex() {
        // the literal is protected; only the trailing semicolon goes
        assert_eq!(minify_js("return /ab c/.test(s);"), "return /ab c/.test(s)");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "var a = { 'foo': 1, 'bar-baz': 2 };",
            "foo['bar'] = 1; // tail\nvar re = /a b/g;",
            "function f() { return 'x  y'; }",
            "/*! keep */ a = b / c;",
        ];
        for input in inputs {
            let once = minify_js(input);
            assert_eq!(minify_js(&once), once, "not idempotent for {input:?}");
        }
    }
}
