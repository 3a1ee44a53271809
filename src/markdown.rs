/// Markdown-style inline markup: cleanup passes, visibility checks, and
/// the span parser used for text lines
///
/// The structural normalizer embeds formatting as literal marker text
/// (`**`, `_`, `[text](url)`), so nested or overlapping source elements
/// can produce doubled markers. The ordered cleanup passes here collapse
/// those before any line is classified.
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{SpanStyle, StyledSpan};

// =============================================================================
// Pre-compiled regex patterns using std::sync::LazyLock (Rust 1.80+)
// =============================================================================

// -- Emphasis-marker cleanup patterns, applied in declaration order --
static RE_BOLD_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{4,}").expect("valid bold-run regex"));
static RE_ITALIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("valid italic-run regex"));
static RE_TRIPLE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*{3}([^*]+?)\*{3}").expect("valid triple-emphasis regex"));
static RE_BOLD_PADDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*[ \t]*([^*]*?)[ \t]*\*\*").expect("valid bold-padding regex")
});
static RE_ITALIC_PADDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_[ \t]*([^_]*?)[ \t]*_").expect("valid italic-padding regex")
});

/// Characters the pipeline treats as markdown punctuation rather than text
const MARKER_CHARS: &[char] = &['*', '_', '~', '#', '[', ']', '(', ')', '!', '`'];

/// Collapse redundant or overlapping emphasis markers on one line
///
/// - `****text****` (doubled bold) collapses to `**text**`
/// - `__text__` (doubled italic) collapses to `_text_`
/// - `***text***` becomes the canonical nested form `_**text**_`
/// - whitespace trapped against markers is trimmed: `** text **` → `**text**`
///
/// The result is additionally whitespace-trimmed.
#[must_use = "returns the cleaned line"]
pub fn clean_line(line: &str) -> String {
    let cleaned = RE_BOLD_RUN.replace_all(line, "**");
    let cleaned = RE_ITALIC_RUN.replace_all(&cleaned, "_");
    let cleaned = RE_TRIPLE_EMPHASIS.replace_all(&cleaned, "_**$1**_");
    let cleaned = RE_BOLD_PADDING.replace_all(&cleaned, "**$1**");
    let cleaned = RE_ITALIC_PADDING.replace_all(&cleaned, "_${1}_");
    cleaned.trim().to_string()
}

/// Whether `c` counts as markdown punctuation
#[inline]
fn is_marker_char(c: char) -> bool {
    MARKER_CHARS.contains(&c)
}

/// Shared visibility predicate: does `s` contain any character that is
/// neither whitespace nor markdown punctuation?
///
/// This single predicate gates every emission decision in the pipeline
/// (implicit-title detection, caption suppression, the final "did we
/// produce any text" check), so all call sites agree by construction.
#[inline]
#[must_use]
pub fn has_visible_text(s: &str) -> bool {
    s.chars().any(|c| !c.is_whitespace() && !is_marker_char(c))
}

/// Strip all markdown punctuation from `s` and trim the result
///
/// Used to turn a marked-up line into a plain chapter title.
#[must_use = "returns the stripped text"]
pub fn strip_markdown(s: &str) -> String {
    s.chars()
        .filter(|c| !is_marker_char(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse one cleaned line into a sequence of styled spans
///
/// Recognizes `**bold**`, `_italic_`, `~~strikethrough~~` and
/// `[text](url)` links, including nesting (`**bold _italic_ bold**`).
/// Unterminated markers are kept as literal text.
#[must_use = "returns the parsed spans"]
pub fn parse_spans(line: &str) -> Vec<StyledSpan> {
    let mut spans = Vec::new();
    collect_spans(line, SpanStyle::PLAIN, None, &mut spans);
    spans
}

fn collect_spans(text: &str, style: SpanStyle, link: Option<&str>, out: &mut Vec<StyledSpan>) {
    let bytes = text.as_bytes();
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some((inner, delim_len, inner_style)) = match_emphasis(text, i, style) {
            flush_plain(&text[plain_start..i], style, link, out);
            collect_spans(inner, inner_style, link, out);
            i += delim_len * 2 + inner.len();
            plain_start = i;
            continue;
        }

        if bytes[i] == b'[' {
            if let Some((label, url, consumed)) = match_link(&text[i..]) {
                flush_plain(&text[plain_start..i], style, link, out);
                collect_spans(label, style, Some(url), out);
                i += consumed;
                plain_start = i;
                continue;
            }
        }

        // Advance one whole character (markers are all ASCII, text may not be)
        i += text[i..].chars().next().map_or(1, char::len_utf8);
    }

    flush_plain(&text[plain_start..], style, link, out);
}

/// Try to match an emphasis pair starting at byte offset `i`
///
/// Returns `(inner_text, delimiter_len, style_with_flag)` on success.
fn match_emphasis(text: &str, i: usize, style: SpanStyle) -> Option<(&str, usize, SpanStyle)> {
    let rest = &text[i..];

    if let Some(tail) = rest.strip_prefix("**") {
        let close = tail.find("**")?;
        let inner = &tail[..close];
        if inner.is_empty() {
            return None;
        }
        return Some((inner, 2, SpanStyle { bold: true, ..style }));
    }

    if let Some(tail) = rest.strip_prefix("~~") {
        let close = tail.find("~~")?;
        let inner = &tail[..close];
        if inner.is_empty() {
            return None;
        }
        return Some((
            inner,
            2,
            SpanStyle {
                strikethrough: true,
                ..style
            },
        ));
    }

    if let Some(tail) = rest.strip_prefix('_') {
        let close = tail.find('_')?;
        let inner = &tail[..close];
        if inner.is_empty() {
            return None;
        }
        return Some((
            inner,
            1,
            SpanStyle {
                italic: true,
                ..style
            },
        ));
    }

    None
}

/// Try to match `[label](url)` at the start of `rest`
///
/// Returns `(label, url, total_bytes_consumed)` on success.
fn match_link(rest: &str) -> Option<(&str, &str, usize)> {
    let body = rest.strip_prefix('[')?;
    let label_end = body.find("](")?;
    let label = &body[..label_end];
    let after_label = &body[label_end + 2..];
    let url_end = after_label.find(')')?;
    let url = &after_label[..url_end];
    if url.is_empty() {
        return None;
    }
    // '[' + label + "](" + url + ')'
    Some((label, url, 1 + label_end + 2 + url_end + 1))
}

fn flush_plain(segment: &str, style: SpanStyle, link: Option<&str>, out: &mut Vec<StyledSpan>) {
    if segment.is_empty() {
        return;
    }
    out.push(StyledSpan {
        text: segment.to_string(),
        style,
        link: link.map(ToString::to_string),
    });
}
