/// Line classifier: turns the normalized line sequence into content units
///
/// One pass over the region's lines. Each non-blank line is cleaned of
/// redundant emphasis markers, then dispatched to exactly one branch:
/// image marker, separator, implicit chapter title, or text line.
use std::sync::LazyLock;

use regex::Regex;

use crate::images::{decode_image, ImageSource};
use crate::markdown::{clean_line, has_visible_text, parse_spans, strip_markdown};
use crate::types::{ContentUnit, ParseDiagnostic, ParseOptions, Reporter, StyledSpan};

/// Matches a whole line of the form `[[payload|caption]]`
static RE_IMAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[\[([^\[\]|]+)\|(.*)\]\]$").expect("valid image-marker regex")
});

/// Prefix distinguishing remote image payloads from archive basenames
const REMOTE_TAG: &str = "REMOTE:";

/// Classification state for one region, explicit so the caller owns it
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClassifierState {
    /// Whether this region's implicit chapter title has been emitted
    pub title_emitted: bool,
}

/// Classify one region's lines into content units.
///
/// `detect_title` enables implicit chapter-title detection: the first
/// line with visible text becomes the region's `Chapter` unit, inserted
/// at the front of the region's list rather than appended, and is
/// consumed (it never doubles as a text line).
pub(crate) fn classify_lines(
    lines: &[String],
    detect_title: bool,
    mut images: Option<&mut (dyn ImageSource + '_)>,
    options: &ParseOptions,
    state: &mut ClassifierState,
    reporter: &mut Reporter<'_>,
) -> Vec<ContentUnit> {
    let mut units = Vec::new();

    for raw in lines {
        if options.is_cancelled() {
            break;
        }
        if raw.trim().is_empty() {
            continue;
        }

        let line = clean_line(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = RE_IMAGE_MARKER.captures(&line) {
            classify_image(&caps[1], &caps[2], images.as_deref_mut(), reporter, &mut units);
            continue;
        }

        if line == "---" || line == "***" {
            units.push(ContentUnit::Separator);
            continue;
        }

        if detect_title && !state.title_emitted {
            let title = strip_markdown(&line);
            if has_visible_text(&title) {
                units.insert(0, ContentUnit::chapter(title));
                state.title_emitted = true;
                continue;
            }
        }

        if has_visible_text(&line) {
            units.push(ContentUnit::TextLine {
                spans: parse_spans(&line),
            });
        }
    }

    units
}

/// Resolve one image marker into its unit pair, or drop it
///
/// Remote payloads pass straight through; local payloads must resolve
/// and decode, otherwise the image and its caption both disappear.
fn classify_image(
    payload: &str,
    caption: &str,
    images: Option<&mut (dyn ImageSource + '_)>,
    reporter: &mut Reporter<'_>,
    units: &mut Vec<ContentUnit>,
) {
    if let Some(url) = payload.strip_prefix(REMOTE_TAG) {
        units.push(ContentUnit::RemoteImage {
            url: url.to_string(),
        });
        units.push(caption_line(caption));
        return;
    }

    let Some(images) = images else {
        // Marker without an archive has nothing to resolve against
        reporter.report(ParseDiagnostic::MissingImageEntry {
            src: payload.to_string(),
        });
        return;
    };

    match images.read(payload).and_then(|bytes| decode_image(&bytes)) {
        Some(image) => {
            units.push(ContentUnit::LocalImage { image });
            units.push(caption_line(caption));
        }
        None => {
            reporter.report(ParseDiagnostic::ImageDecodeFailed {
                name: payload.to_string(),
            });
        }
    }
}

fn caption_line(caption: &str) -> ContentUnit {
    ContentUnit::TextLine {
        spans: vec![StyledSpan::italic(caption.to_string())],
    }
}
