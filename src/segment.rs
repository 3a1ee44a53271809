/// Chapter segmentation and the top-level parse entry points
///
/// Per document, one of two conventions applies:
///
/// - **explicit**: at least one element carries the well-known chapter
///   container class. Each container contributes a `Chapter` unit titled
///   from its first direct heading child, followed by the container's
///   classified content, with a `Separator` between containers.
/// - **implicit**: no container matches; the whole body is one region
///   and its first visible line becomes the retroactive chapter title.
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::classify::{classify_lines, ClassifierState};
use crate::images::ImageSource;
use crate::markdown::has_visible_text;
use crate::normalize::flatten_region;
use crate::types::{ContentUnit, ParseDiagnostic, ParseOptions, Reporter};

/// Well-known explicit chapter container class
static CHAPTER_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".chapter-tab").expect("valid chapter-container selector"));

/// Title used when a chapter container has no usable heading
const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

/// Convert an HTML-shaped document into its ordered content-unit list.
///
/// `images` supplies the archive image-entry index for archive-backed
/// formats; pass `None` for flat HTML/XML files (local images are then
/// dropped). An empty result means the document is unparseable: no
/// usable text, or no chapter when `options.include_chapters` is set.
///
/// This function never fails outright; every per-element problem is
/// resolved by a local default or silent omission.
#[must_use = "returns the document's content units"]
pub fn parse_document(
    html: &str,
    images: Option<&mut dyn ImageSource>,
    options: &ParseOptions,
) -> Vec<ContentUnit> {
    parse_with(html, images, options, Reporter::none())
}

/// Like [`parse_document`], reporting every silently-resolved failure
/// (dropped images, degraded anchors, defaulted titles) to `sink`.
#[must_use = "returns the document's content units"]
pub fn parse_document_with_diagnostics(
    html: &str,
    images: Option<&mut dyn ImageSource>,
    options: &ParseOptions,
    sink: &mut dyn FnMut(ParseDiagnostic),
) -> Vec<ContentUnit> {
    parse_with(html, images, options, Reporter::new(sink))
}

fn parse_with(
    html: &str,
    mut images: Option<&mut dyn ImageSource>,
    options: &ParseOptions,
    mut reporter: Reporter<'_>,
) -> Vec<ContentUnit> {
    let document = Html::parse_document(html);
    let containers: Vec<ElementRef<'_>> = document.select(&CHAPTER_CONTAINER).collect();

    let units = if containers.is_empty() {
        parse_implicit(&document, &mut images, options, &mut reporter)
    } else {
        parse_containers(&containers, &mut images, options, &mut reporter)
    };

    if options.is_cancelled() {
        reporter.report(ParseDiagnostic::Cancelled);
        return Vec::new();
    }

    // A parse that produced no text (or no chapter when one was asked
    // for) failed as a whole; callers get the uniform empty result.
    let has_text = units.iter().any(ContentUnit::is_text_line);
    let has_chapter = units.iter().any(ContentUnit::is_chapter);
    if !has_text || (options.include_chapters && !has_chapter) {
        return Vec::new();
    }
    units
}

/// Implicit convention: the whole document is one region.
fn parse_implicit(
    document: &Html,
    images: &mut Option<&mut dyn ImageSource>,
    options: &ParseOptions,
    reporter: &mut Reporter<'_>,
) -> Vec<ContentUnit> {
    let lines = flatten_region(document.root_element(), None, images.as_deref(), reporter);
    let mut state = ClassifierState::default();
    classify_lines(
        &lines,
        options.include_chapters,
        images.as_deref_mut(),
        options,
        &mut state,
        reporter,
    )
}

/// Explicit convention: one region per chapter container, in document
/// order, with implicit title detection disabled (the title was already
/// taken from the container's heading).
fn parse_containers(
    containers: &[ElementRef<'_>],
    images: &mut Option<&mut dyn ImageSource>,
    options: &ParseOptions,
    reporter: &mut Reporter<'_>,
) -> Vec<ContentUnit> {
    let mut units = Vec::new();

    for (index, container) in containers.iter().enumerate() {
        if options.is_cancelled() {
            break;
        }
        if index > 0 {
            units.push(ContentUnit::Separator);
        }

        let heading = first_heading(*container);
        if options.include_chapters {
            let title = heading.map_or_else(String::new, heading_text);
            if has_visible_text(&title) {
                units.push(ContentUnit::chapter(title));
            } else {
                reporter.report(ParseDiagnostic::MissingChapterHeading);
                units.push(ContentUnit::chapter(UNKNOWN_CHAPTER.to_string()));
            }
        }

        let lines = flatten_region(*container, heading, images.as_deref(), reporter);
        // title_emitted pre-set: the heading already supplied it
        let mut state = ClassifierState {
            title_emitted: true,
        };
        units.extend(classify_lines(
            &lines,
            false,
            images.as_deref_mut(),
            options,
            &mut state,
            reporter,
        ));
    }

    units
}

/// First direct heading child of a chapter container
fn first_heading(container: ElementRef<'_>) -> Option<ElementRef<'_>> {
    container
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            matches!(
                el.value().name(),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
            )
        })
}

fn heading_text(heading: ElementRef<'_>) -> String {
    heading
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
