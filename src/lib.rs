//! # reader-text
//!
//! Converts HTML-shaped book documents into typed, renderable reader content.
//!
//! This crate is the document-to-reader-text pipeline of an e-book reader:
//! it takes one HTML/XHTML document (an EPUB chapter file, an FB2 body
//! reinterpreted as HTML, or a flat HTML/MD file) and produces a flat,
//! ordered sequence of content units suitable for a virtualized scrolling
//! view.
//!
//! ## Pipeline
//!
//! | Stage | Responsibility |
//! |-------|----------------|
//! | Structural normalizer | Walks the parsed tree and emits flat text with markdown-style markers for emphasis, headings, rules, links, and images |
//! | Chapter segmenter | Picks the explicit (container-class) or implicit (first-visible-line) chapter convention and splits the document into regions |
//! | Line classifier | Cleans redundant emphasis markers and turns every non-blank line into a chapter, separator, image, or text unit |
//! | Image resolver | Resolves local image markers against the book archive's image entries and decodes them into render-ready bitmaps |
//!
//! ## Quick Start
//!
//! ```rust
//! use reader_text::{parse_document, ContentUnit, ParseOptions};
//!
//! let html = "<h2>Chapter One</h2><p>It was a <b>dark</b> night.</p>";
//! let units = parse_document(html, None, &ParseOptions::new());
//!
//! assert!(matches!(&units[0], ContentUnit::Chapter { title, .. } if title == "Chapter One"));
//! assert!(units[1].is_text_line());
//! ```
//!
//! ### Archive-backed books
//!
//! ```rust,no_run
//! use std::fs::File;
//!
//! use reader_text::{parse_document, ParseOptions, ZipImageSource};
//!
//! let mut images = ZipImageSource::from_reader(File::open("book.epub")?)?;
//!
//! let html = "..."; // one spine document extracted by the format layer
//! let units = parse_document(html, Some(&mut images), &ParseOptions::new());
//! # Ok::<(), reader_text::ReaderError>(())
//! ```
//!
//! ## Output Shape
//!
//! | Unit | Meaning |
//! |------|---------|
//! | `Chapter` | Chapter boundary with markdown-stripped title |
//! | `TextLine` | One line of prose as styled spans (bold/italic/strikethrough/link) |
//! | `Separator` | Visual section break (`---` / `***`) |
//! | `LocalImage` | Decoded RGBA bitmap resolved from the archive |
//! | `RemoteImage` | URL reference resolved later by the UI's image loader |
//!
//! An **empty** result means the document is unparseable: no usable text,
//! or no chapter when chapter emission was requested. The pipeline never
//! aborts over a single bad element; images that fail to resolve or decode
//! are dropped together with their captions, and non-http links degrade to
//! plain text. Pass a sink to [`parse_document_with_diagnostics`] to
//! observe those silent drops.

/// Line classification into typed content units
mod classify;
/// Error types for archive and decode handling
pub mod error;
/// Image resolution against archive image entries
pub mod images;
/// Markdown-style inline markup: cleanup, visibility, span parsing
pub mod markdown;
/// Structural normalization of the parsed document tree
mod normalize;
/// Chapter segmentation and the top-level parse entry points
mod segment;
/// Common types for reader content
pub mod types;

// Re-export commonly used items
pub use error::{ReaderError, Result};
pub use images::{ImageSource, ZipImageSource};
pub use segment::{parse_document, parse_document_with_diagnostics};
pub use types::{ContentUnit, ParseDiagnostic, ParseOptions, SpanStyle, StyledSpan};
