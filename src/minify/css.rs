//! Stylesheet minification pipeline.
//!
//! Ordered passes over span-scanned text; string literals and preserved
//! comments are protected spans that no pass may rewrite. The pass order is
//! load-bearing: later passes assume earlier ones already ran.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::scan::{self, Span, SpanKind};

/// Units a zero-valued length sheds (`0px` -> `0`).
const DROPPABLE_UNITS: &str = "cm|em|ex|in|mm|pc|pt|px|vh|vw|%";

static RE_ZERO_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)([\s:])0(?:{DROPPABLE_UNITS})")).unwrap()
});

static RE_ZERO_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i):(0\s+0|0\s+0\s+0\s+0)(;|\}|!important)").unwrap());

static RE_BG_POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(background-position):0(;|\})").unwrap());

static RE_ZERO_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\s:,\-])0+\.(\d+)").unwrap());

static RE_HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\s:,\-])#([0-9a-fA-F]{6,})").unwrap());

static RE_BORDER_NONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\{;])(border|outline):none(;|\}|!)").unwrap());

static RE_EMPTY_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\{\}])[^\s\{\}]+\{\}").unwrap());

static RE_EMPTY_RULE_AT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s\{\}]+\{\}").unwrap());

static RE_UNQUOTABLE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z_][a-z0-9_\-]*$").unwrap());

/// Minify a stylesheet.
///
/// Empty and whitespace-only input is returned unchanged.
pub fn minify_css(input: &str) -> String {
    if input.trim().is_empty() {
        return input.to_string();
    }

    let mut spans = scan::scan_css(input);
    strip_comments(&mut spans);
    let mut spans = collapse_whitespace(spans);

    rewrite_code(&mut spans, |code| {
        // decimal first: `0.0px` -> `0px` must still shed its unit below
        let code = RE_ZERO_DECIMAL.replace_all(code, trim_zero_decimal);
        let code = RE_ZERO_UNIT.replace_all(&code, "${1}0");
        let code = RE_ZERO_SHORTHAND.replace_all(&code, ":0$2");
        RE_BG_POSITION.replace_all(&code, "$1:0 0$2").into_owned()
    });

    unquote_values(&mut spans);
    unquote_urls(&mut spans);
    let mut spans = scan::coalesce(spans);

    for (idx, span) in spans.iter_mut().enumerate() {
        if !span.is_code() {
            continue;
        }
        let code = RE_HEX_COLOR.replace_all(&span.text, squeeze_hex_color);
        let code = replace_until_stable(&RE_BORDER_NONE, &code, "$1$2:0$3");
        span.text = remove_empty_rules(&code, idx == 0);
    }

    trim_outer(&mut spans);
    scan::join(&spans)
}

// ============================================================================
// Comment stripping
// ============================================================================

/// Drop block comments except `/*!` banners; an unterminated comment is
/// left in place verbatim.
fn strip_comments(spans: &mut Vec<Span>) {
    spans.retain(|span| {
        span.kind != SpanKind::Comment
            || span.text.starts_with("/*!")
            || !span.text.ends_with("*/")
    });
    let merged = scan::coalesce(std::mem::take(spans));
    *spans = merged;
}

// ============================================================================
// Whitespace collapse
// ============================================================================

#[derive(Clone)]
enum Tok {
    Ch(char),
    Lit(Span),
}

/// Collapse insignificant whitespace outside protected spans.
///
/// Whitespace around rule punctuation, attribute operators, `!important`
/// and after `[ ( :` / before `] )` is removed; a semicolon directly before
/// `}` is dropped; anything else collapses to the first character of the
/// run, so single spaces between value tokens survive (`margin:0 auto`).
fn collapse_whitespace(spans: Vec<Span>) -> Vec<Span> {
    let mut toks: Vec<Tok> = Vec::new();
    for span in spans {
        if span.is_code() {
            toks.extend(span.text.chars().map(Tok::Ch));
        } else {
            toks.push(Tok::Lit(span));
        }
    }

    let mut out: Vec<Tok> = Vec::with_capacity(toks.len());
    let mut i = 0;
    while i < toks.len() {
        match &toks[i] {
            Tok::Lit(_) => {
                out.push(toks[i].clone());
                i += 1;
            }
            Tok::Ch(c) if c.is_whitespace() => {
                let first = *c;
                let mut j = i;
                while matches!(toks.get(j), Some(Tok::Ch(c)) if c.is_whitespace()) {
                    j += 1;
                }
                if !ws_is_insignificant(&out, &toks, j) {
                    out.push(Tok::Ch(first));
                }
                i = j;
            }
            Tok::Ch(';') => {
                let mut j = i + 1;
                while matches!(toks.get(j), Some(Tok::Ch(c)) if c.is_whitespace()) {
                    j += 1;
                }
                if !matches!(toks.get(j), Some(Tok::Ch('}'))) {
                    out.push(Tok::Ch(';'));
                }
                i += 1;
            }
            Tok::Ch(c) => {
                out.push(Tok::Ch(*c));
                i += 1;
            }
        }
    }

    rebuild(out)
}

fn ws_is_insignificant(out: &[Tok], toks: &[Tok], next: usize) -> bool {
    if out.is_empty() {
        return true; // leading whitespace
    }
    if let Some(Tok::Ch(p)) = out.last()
        && "{};,>~=([:".contains(*p)
    {
        return true;
    }
    if trailing_code(out, 10).eq_ignore_ascii_case("!important") {
        return true;
    }
    match toks.get(next) {
        None => true,
        Some(Tok::Lit(_)) => false,
        Some(Tok::Ch(n)) => {
            if "{};,>~])=".contains(*n) {
                return true;
            }
            if "*$~^|".contains(*n) && matches!(toks.get(next + 1), Some(Tok::Ch('='))) {
                return true;
            }
            if upcoming_code(toks, next, 10).eq_ignore_ascii_case("!important") {
                return true;
            }
            // whitespace before a declaration colon goes; before a selector
            // pseudo-class colon it separates a descendant combinator
            if *n == ':' && !colon_opens_selector(toks, next + 1) {
                return true;
            }
            false
        }
    }
}

/// Contiguous code characters at the tail of the output, most recent last.
fn trailing_code(out: &[Tok], max: usize) -> String {
    let tail: Vec<char> = out
        .iter()
        .rev()
        .map_while(|t| match t {
            Tok::Ch(c) => Some(*c),
            Tok::Lit(_) => None,
        })
        .take(max)
        .collect();
    tail.into_iter().rev().collect()
}

/// Contiguous code characters starting at `from`.
fn upcoming_code(toks: &[Tok], from: usize, max: usize) -> String {
    toks[from..]
        .iter()
        .map_while(|t| match t {
            Tok::Ch(c) => Some(*c),
            Tok::Lit(_) => None,
        })
        .take(max)
        .collect()
}

/// True when scanning forward from a colon hits `{` before `}`, i.e. the
/// colon belongs to a selector, not a declaration.
fn colon_opens_selector(toks: &[Tok], from: usize) -> bool {
    for tok in &toks[from..] {
        match tok {
            Tok::Lit(_) => continue,
            Tok::Ch('{') => return true,
            Tok::Ch('}') => return false,
            Tok::Ch(_) => continue,
        }
    }
    false
}

fn rebuild(toks: Vec<Tok>) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut code = String::new();
    for tok in toks {
        match tok {
            Tok::Ch(c) => code.push(c),
            Tok::Lit(span) => {
                if !code.is_empty() {
                    spans.push(Span::code(std::mem::take(&mut code)));
                }
                spans.push(span);
            }
        }
    }
    if !code.is_empty() {
        spans.push(Span::code(code));
    }
    spans
}

// ============================================================================
// Numeric rewrites
// ============================================================================

/// `0.50` -> `.5`, `0.0` -> `0`; only zero-integer decimals qualify.
fn trim_zero_decimal(caps: &Captures) -> String {
    let frac = caps[2].trim_end_matches('0');
    if frac.is_empty() {
        format!("{}0", &caps[1])
    } else {
        format!("{}.{}", &caps[1], frac)
    }
}

/// `#ffffff` -> `#fff` when each channel repeats its digit. Longer hex
/// runs (8-digit colors) are matched whole and left alone.
fn squeeze_hex_color(caps: &Captures) -> String {
    let digits: Vec<char> = caps[2].chars().collect();
    let pairs_repeat = digits.len() == 6
        && digits
            .chunks(2)
            .all(|pair| pair[0].eq_ignore_ascii_case(&pair[1]));
    if pairs_repeat {
        format!("{}#{}{}{}", &caps[1], digits[0], digits[2], digits[4])
    } else {
        caps[0].to_string()
    }
}

// ============================================================================
// String unquoting
// ============================================================================

/// `'foo'` -> `foo` for identifier-like values, except after `content:`
/// where quoting is semantically required.
fn unquote_values(spans: &mut Vec<Span>) {
    for i in 0..spans.len() {
        let Some(content) = quoted_content(&spans[i]) else {
            continue;
        };
        if !RE_UNQUOTABLE_VALUE.is_match(&content) {
            continue;
        }
        if i > 0
            && spans[i - 1].is_code()
            && ends_with_ignore_case(&spans[i - 1].text, "content:")
        {
            continue;
        }
        let Some(next) = following_char(spans, i) else {
            continue;
        };
        if next.is_whitespace() || "{}];,".contains(next) {
            spans[i] = Span::code(content);
        }
    }
}

/// `url('a.png')` -> `url(a.png)` when the target has no whitespace.
fn unquote_urls(spans: &mut Vec<Span>) {
    for i in 0..spans.len() {
        let Some(content) = quoted_content(&spans[i]) else {
            continue;
        };
        if content.is_empty() || content.chars().any(char::is_whitespace) {
            continue;
        }
        let preceded_by_url = i > 0 && spans[i - 1].is_code() && {
            let prev = &spans[i - 1].text;
            ends_with_ignore_case(prev, "url(") && {
                let before = prev.chars().rev().nth(4);
                !before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            }
        };
        let followed_by_paren = spans
            .get(i + 1)
            .is_some_and(|s| s.is_code() && s.text.starts_with(')'));
        if preceded_by_url && followed_by_paren {
            spans[i] = Span::code(content);
        }
    }
}

/// Content of a properly terminated string span, quotes stripped.
fn quoted_content(span: &Span) -> Option<String> {
    if span.kind != SpanKind::Str || span.text.len() < 2 {
        return None;
    }
    let quote = span.text.chars().next()?;
    if !span.text.ends_with(quote) {
        return None; // unterminated, leave alone
    }
    Some(span.text[1..span.text.len() - 1].to_string())
}

fn following_char(spans: &[Span], i: usize) -> Option<char> {
    spans.get(i + 1).and_then(|s| s.text.chars().next())
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text[text.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

// ============================================================================
// Rule-level cleanup
// ============================================================================

/// Remove `selector{}` blocks. Applied to fixpoint so adjacent empty rules
/// sharing a brace all disappear.
fn remove_empty_rules(code: &str, at_text_start: bool) -> String {
    let mut cur = code.to_string();
    loop {
        let mut next = RE_EMPTY_RULE.replace_all(&cur, "$1").into_owned();
        if at_text_start {
            next = RE_EMPTY_RULE_AT_START.replace(&next, "").into_owned();
        }
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

fn replace_until_stable(re: &Regex, text: &str, rep: &str) -> String {
    let mut cur = text.to_string();
    loop {
        let next = re.replace_all(&cur, rep).into_owned();
        if next == cur {
            return cur;
        }
        cur = next;
    }
}

fn rewrite_code(spans: &mut [Span], f: impl Fn(&str) -> String) {
    for span in spans.iter_mut().filter(|s| s.is_code()) {
        span.text = f(&span.text);
    }
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
        last.text = last.text.trim_end().to_string();
    }
    spans.retain(|s| !s.text.is_empty());
}

// ============================================================================
// Tests
// ============================================================================
