/// Common types for reader-content conversion
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// One element of the pipeline's typed output sequence
///
/// A successfully parsed document yields these in reading order. The
/// reader UI renders the list directly in a virtualized scrolling view.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentUnit {
    /// Chapter boundary
    ///
    /// `nested` distinguishes sub-chapters from top-level ones; no
    /// current producer emits `true`, the model keeps the field for the
    /// reader contract.
    Chapter {
        /// Chapter title with all markdown stripped
        title: String,
        /// Sub-chapter marker (always `false` today)
        nested: bool,
    },

    /// One paragraph/line of renderable prose with inline formatting resolved
    TextLine {
        /// Styled spans in display order
        spans: Vec<StyledSpan>,
    },

    /// Visual section break (rendered from `---` or `***` markers)
    Separator,

    /// Successfully resolved and decoded local image
    LocalImage {
        /// Decoded render-ready RGBA bitmap
        image: RgbaImage,
    },

    /// Reference to a network-hosted image, fetched later by the UI layer
    RemoteImage {
        /// Absolute https URL
        url: String,
    },
}

impl ContentUnit {
    /// Creates a flat (non-nested) chapter boundary unit.
    #[inline]
    #[must_use = "creates a chapter unit"]
    pub const fn chapter(title: String) -> Self {
        Self::Chapter {
            title,
            nested: false,
        }
    }

    /// Returns `true` for text-line units.
    #[inline]
    #[must_use]
    pub const fn is_text_line(&self) -> bool {
        matches!(self, Self::TextLine { .. })
    }

    /// Returns `true` for chapter-boundary units.
    #[inline]
    #[must_use]
    pub const fn is_chapter(&self) -> bool {
        matches!(self, Self::Chapter { .. })
    }
}

/// A run of text with uniform inline styling
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyledSpan {
    /// Span text with markers removed
    pub text: String,

    /// Inline style flags
    pub style: SpanStyle,

    /// Hyperlink target, if the span came from `[text](url)` markup
    pub link: Option<String>,
}

impl StyledSpan {
    /// Creates an unstyled span.
    #[inline]
    #[must_use = "creates a plain text span"]
    pub const fn plain(text: String) -> Self {
        Self {
            text,
            style: SpanStyle::PLAIN,
            link: None,
        }
    }

    /// Creates an italic span (used for image captions).
    #[inline]
    #[must_use = "creates an italic text span"]
    pub const fn italic(text: String) -> Self {
        Self {
            text,
            style: SpanStyle {
                bold: false,
                italic: true,
                strikethrough: false,
            },
            link: None,
        }
    }
}

/// Inline style flags accumulated while parsing markdown spans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanStyle {
    /// Bold (`**text**`)
    pub bold: bool,

    /// Italic (`_text_`)
    pub italic: bool,

    /// Strikethrough (`~~text~~`)
    pub strikethrough: bool,
}

impl SpanStyle {
    /// No styling applied.
    pub const PLAIN: Self = Self {
        bold: false,
        italic: false,
        strikethrough: false,
    };
}

/// Options controlling one parse invocation
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Emit `Chapter` units (import-time preview parsing may disable this)
    pub include_chapters: bool,

    /// Cooperative cancellation flag, checked between containers and lines
    ///
    /// When set mid-parse the call abandons work and returns the uniform
    /// empty result.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl ParseOptions {
    /// Creates options for a full reader parse (chapters included).
    #[inline]
    #[must_use = "creates parse options"]
    pub const fn new() -> Self {
        Self {
            include_chapters: true,
            cancel: None,
        }
    }

    /// Creates options for an import-time preview parse (no chapters).
    #[inline]
    #[must_use = "creates parse options"]
    pub const fn preview() -> Self {
        Self {
            include_chapters: false,
            cancel: None,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

impl Default for ParseOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Observable record of a recoverable, silently-resolved failure
///
/// The pipeline never aborts a parse over one bad element; integrators who
/// want a partial-failure indicator can collect these through the optional
/// sink on [`parse_document_with_diagnostics`](crate::parse_document_with_diagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseDiagnostic {
    /// Local `<img>`/`<image>` source had no matching archive entry
    MissingImageEntry {
        /// The `src` attribute as written in the document
        src: String,
    },

    /// Archive entry resolved but its bytes failed to decode
    ImageDecodeFailed {
        /// Lowercased basename of the entry
        name: String,
    },

    /// Anchor dropped to plain text (non-http scheme or blank text)
    DroppedAnchor {
        /// The `href` attribute as written in the document
        href: String,
    },

    /// Chapter container had no usable heading; title defaulted
    MissingChapterHeading,

    /// Parse abandoned through the cooperative cancellation flag
    Cancelled,
}

/// Internal fan-out for diagnostics: log line plus optional caller sink
pub(crate) struct Reporter<'a> {
    sink: Option<&'a mut dyn FnMut(ParseDiagnostic)>,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn FnMut(ParseDiagnostic)) -> Self {
        Self { sink: Some(sink) }
    }

    pub(crate) const fn none() -> Self {
        Self { sink: None }
    }

    pub(crate) fn report(&mut self, diagnostic: ParseDiagnostic) {
        log::debug!("parse diagnostic: {diagnostic:?}");
        if let Some(sink) = self.sink.as_mut() {
            sink(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_defaults() {
        let full = ParseOptions::new();
        assert!(full.include_chapters);
        assert!(full.cancel.is_none());
        assert!(!full.is_cancelled());

        let preview = ParseOptions::preview();
        assert!(!preview.include_chapters);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let opts = ParseOptions {
            include_chapters: true,
            cancel: Some(Arc::clone(&flag)),
        };
        assert!(!opts.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(opts.is_cancelled());
    }

    #[test]
    fn test_chapter_constructor_is_flat() {
        let unit = ContentUnit::chapter("Prologue".to_string());
        assert_eq!(
            unit,
            ContentUnit::Chapter {
                title: "Prologue".to_string(),
                nested: false
            }
        );
        assert!(unit.is_chapter());
        assert!(!unit.is_text_line());
    }
}
