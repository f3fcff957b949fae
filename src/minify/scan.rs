//! Span scanners for the minification pipelines.
//!
//! A single forward pass splits source text into *code* spans and
//! *protected* spans (string literals, comments, JS regex literals).
//! Every later pass rewrites code spans only, so protected content can
//! never be altered by a pattern rule. Unterminated literals are protected
//! to end of input and emitted verbatim rather than rejected.

/// Classification of a scanned span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Plain code, fair game for pattern rules.
    Code,
    /// String literal, quotes included.
    Str,
    /// Comment, delimiters included.
    Comment,
    /// JS regex literal, slashes and flags included.
    Regex,
}

/// A contiguous piece of the input with uniform handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub text: String,
}

impl Span {
    pub fn code(text: impl Into<String>) -> Self {
        Self {
            kind: SpanKind::Code,
            text: text.into(),
        }
    }

    fn new(kind: SpanKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn is_code(&self) -> bool {
        self.kind == SpanKind::Code
    }
}

/// Reassemble spans into a single string.
pub fn join(spans: &[Span]) -> String {
    let mut out = String::with_capacity(spans.iter().map(|s| s.text.len()).sum());
    for span in spans {
        out.push_str(&span.text);
    }
    out
}

/// Merge adjacent code spans and drop empty spans.
///
/// Passes that remove comments or unquote strings leave the list
/// fragmented; merging restores pattern visibility across the seam.
pub fn coalesce(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.is_code() && span.is_code() => last.text.push_str(&span.text),
            _ => out.push(span),
        }
    }
    out
}

// ============================================================================
// CSS scanner
// ============================================================================

/// Split CSS into code spans, string literals and block comments.
pub fn scan_css(input: &str) -> Vec<Span> {
    let chars: Vec<char> = input.chars().collect();
    let mut spans = Vec::new();
    let mut code = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            q @ ('"' | '\'') => {
                flush(&mut spans, &mut code);
                let end = scan_string(&chars, i, q);
                spans.push(Span::new(SpanKind::Str, collect(&chars, i, end)));
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                flush(&mut spans, &mut code);
                let end = scan_block_comment(&chars, i);
                spans.push(Span::new(SpanKind::Comment, collect(&chars, i, end)));
                i = end;
            }
            c => {
                code.push(c);
                i += 1;
            }
        }
    }
    flush(&mut spans, &mut code);
    spans
}

// ============================================================================
// JS scanner
// ============================================================================

/// Keywords after which a `/` opens a regex literal, not division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
];

/// Split JS into code spans, string literals, comments and regex literals.
pub fn scan_js(input: &str) -> Vec<Span> {
    let chars: Vec<char> = input.chars().collect();
    let mut spans = Vec::new();
    let mut code = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            q @ ('"' | '\'') => {
                flush(&mut spans, &mut code);
                let end = scan_string(&chars, i, q);
                spans.push(Span::new(SpanKind::Str, collect(&chars, i, end)));
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                flush(&mut spans, &mut code);
                let mut end = i;
                while end < chars.len() && chars[end] != '\n' {
                    end += 1;
                }
                spans.push(Span::new(SpanKind::Comment, collect(&chars, i, end)));
                i = end;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                flush(&mut spans, &mut code);
                let end = scan_block_comment(&chars, i);
                spans.push(Span::new(SpanKind::Comment, collect(&chars, i, end)));
                i = end;
            }
            '/' => {
                if regex_allowed(&code, &spans)
                    && let Some(end) = scan_regex(&chars, i)
                {
                    flush(&mut spans, &mut code);
                    spans.push(Span::new(SpanKind::Regex, collect(&chars, i, end)));
                    i = end;
                } else {
                    code.push('/');
                    i += 1;
                }
            }
            c => {
                code.push(c);
                i += 1;
            }
        }
    }
    flush(&mut spans, &mut code);
    spans
}

/// Decide whether a `/` at the current position may open a regex literal.
///
/// Division context: the previous significant token is an identifier tail,
/// a digit, `)`, `]`, or a string/regex literal. Keywords like `return` are
/// identifier-shaped but still admit a regex.
fn regex_allowed(code: &str, spans: &[Span]) -> bool {
    let mut prev = code.trim_end();
    if prev.is_empty() {
        for span in spans.iter().rev() {
            match span.kind {
                SpanKind::Comment => continue,
                SpanKind::Str | SpanKind::Regex => return false,
                SpanKind::Code => {
                    prev = span.text.trim_end();
                    break;
                }
            }
        }
    }
    let Some(last) = prev.chars().last() else {
        return true;
    };
    match last {
        ')' | ']' => false,
        c if is_ident_char(c) => {
            let word: String = prev
                .chars()
                .rev()
                .take_while(|&c| is_ident_char(c))
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            REGEX_PRECEDING_KEYWORDS.contains(&word.as_str())
        }
        _ => true,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Scan a regex literal starting at the opening `/`.
///
/// Returns the exclusive end index (flags included), or `None` when the
/// span does not look like a literal: no closing `/` before the line ends,
/// or a follower that does not terminate an expression.
fn scan_regex(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    loop {
        let c = *chars.get(i)?;
        match c {
            '\n' => return None,
            '\\' => i += 2,
            '[' if !in_class => {
                in_class = true;
                i += 1;
            }
            ']' if in_class => {
                in_class = false;
                i += 1;
            }
            '/' if !in_class => {
                i += 1;
                break;
            }
            _ => i += 1,
        }
    }
    while i < chars.len() && matches!(chars[i], 'g' | 'i' | 'm' | 'u' | 'y') {
        i += 1;
    }
    match chars.get(i) {
        None => Some(i),
        Some(c) if c.is_whitespace() || matches!(c, '.' | ',' | ';' | ')' | ']' | '}') => Some(i),
        Some(_) => None,
    }
}

// ============================================================================
// Shared scanning helpers
// ============================================================================

/// Scan a quoted string from the opening quote; backslash escapes the next
/// character. An unterminated string runs to end of input.
fn scan_string(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Scan a `/* ... */` comment; unterminated runs to end of input.
fn scan_block_comment(chars: &[char], start: usize) -> usize {
    let mut i = start + 2;
    while i < chars.len() {
        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

fn collect(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end.min(chars.len())].iter().collect()
}

fn flush(spans: &mut Vec<Span>, code: &mut String) {
    if !code.is_empty() {
        spans.push(Span::code(std::mem::take(code)));
    }
}

// ============================================================================
// Tests
// ============================================================================
