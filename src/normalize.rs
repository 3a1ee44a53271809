/// Structural normalizer: rewrites a parsed document region into flat,
/// marker-annotated text
///
/// The walk embeds every piece of formatting and image information as
/// plain-text markers the line classifier understands:
///
/// - bold/strong and h1-h3 become `**text**`, em/i become `_text_`
/// - anchors with an http(s) target become `[text](url)`
/// - horizontal rules become a standalone `---` line
/// - images become `[[name|caption]]` / `[[REMOTE:url|caption]]` lines
/// - manual line breaks inside paragraphs and anchors are collapsed so
///   they cannot split a sentence across output lines
///
/// Scraper's tree is read-only, which keeps the whole pass pure: the
/// walk emits into a buffer instead of mutating nodes, and the buffer
/// split on newlines is the region's line sequence.
use scraper::ElementRef;

use crate::images::ImageSource;
use crate::markdown::has_visible_text;
use crate::types::{ParseDiagnostic, Reporter};

/// Elements that terminate an output line when they close
const BLOCK_TAGS: &[&str] = &[
    "div",
    "section",
    "article",
    "blockquote",
    "ul",
    "ol",
    "li",
    "dl",
    "dt",
    "dd",
    "table",
    "tr",
    "pre",
    "figure",
    "figcaption",
    "header",
    "footer",
    "main",
];

/// Inline flags inherited while descending the tree
#[derive(Debug, Clone, Copy, Default)]
struct TextContext {
    in_paragraph: bool,
    in_anchor: bool,
}

impl TextContext {
    const fn paragraph(self) -> Self {
        Self {
            in_paragraph: true,
            ..self
        }
    }

    const fn anchor(self) -> Self {
        Self {
            in_anchor: true,
            ..self
        }
    }
}

/// Flatten one region (the whole document body, or one chapter container)
/// into its marker-annotated line sequence.
///
/// `skip` excludes a single child element from the walk; the segmenter
/// uses it to keep an explicitly-extracted chapter heading out of the
/// region's content.
pub(crate) fn flatten_region(
    root: ElementRef<'_>,
    skip: Option<ElementRef<'_>>,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
) -> Vec<String> {
    let mut out = String::new();
    emit_children(root, TextContext::default(), skip, images, reporter, &mut out);
    out.split('\n').map(ToString::to_string).collect()
}

fn emit_children(
    element: ElementRef<'_>,
    ctx: TextContext,
    skip: Option<ElementRef<'_>>,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
    out: &mut String,
) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if skip.is_some_and(|s| s.id() == child_element.id()) {
                continue;
            }
            emit_element(child_element, ctx, skip, images, reporter, out);
        } else if let Some(text) = child.value().as_text() {
            emit_text(text, ctx, out);
        }
    }
}

fn emit_element(
    element: ElementRef<'_>,
    ctx: TextContext,
    skip: Option<ElementRef<'_>>,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
    out: &mut String,
) {
    match element.value().name() {
        // Not reading content
        "title" | "script" | "style" => {}

        // Each paragraph becomes its own output line; manual breaks
        // inside it collapse to spaces
        "p" => {
            emit_children(element, ctx.paragraph(), skip, images, reporter, out);
            out.push('\n');
        }

        "br" => {
            if ctx.in_anchor {
                // removed entirely inside anchors
            } else if ctx.in_paragraph {
                out.push(' ');
            } else {
                out.push('\n');
            }
        }

        "hr" => out.push_str("\n---\n"),

        "b" | "strong" => {
            out.push_str("**");
            emit_children(element, ctx, skip, images, reporter, out);
            out.push_str("**");
        }

        "h1" | "h2" | "h3" => {
            out.push_str("**");
            emit_children(element, ctx, skip, images, reporter, out);
            out.push_str("**");
            out.push('\n');
        }

        "h4" | "h5" | "h6" => {
            emit_children(element, ctx, skip, images, reporter, out);
            out.push('\n');
        }

        "em" | "i" => {
            out.push('_');
            emit_children(element, ctx, skip, images, reporter, out);
            out.push('_');
        }

        "a" => emit_anchor(element, ctx, skip, images, reporter, out),

        // The HTML tree builder rewrites <image> start tags to <img>,
        // so SVG-style elements from FB2-derived trees land here too;
        // they carry xlink:href instead of src and are local-only.
        "img" | "image" => emit_img(element, images, reporter, out),

        name => {
            emit_children(element, ctx, skip, images, reporter, out);
            if BLOCK_TAGS.contains(&name) {
                out.push('\n');
            }
        }
    }
}

fn emit_text(text: &str, ctx: TextContext, out: &mut String) {
    if ctx.in_anchor {
        out.extend(text.chars().filter(|c| *c != '\n'));
    } else if ctx.in_paragraph {
        out.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c }));
    } else {
        out.push_str(text);
    }
}

/// Rewrite http(s) anchors with visible text as `[text](url)`;
/// everything else degrades to plain text.
fn emit_anchor(
    element: ElementRef<'_>,
    ctx: TextContext,
    skip: Option<ElementRef<'_>>,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
    out: &mut String,
) {
    let mut text = String::new();
    emit_children(element, ctx.anchor(), skip, images, reporter, &mut text);

    let href = element.value().attr("href").unwrap_or("").trim();
    if href.starts_with("http") && has_visible_text(&text) {
        let url = href
            .strip_prefix("http://")
            .map_or_else(|| href.to_string(), |rest| format!("https://{rest}"));
        out.push('[');
        out.push_str(&text);
        out.push_str("](");
        out.push_str(&url);
        out.push(')');
    } else {
        if !href.is_empty() {
            reporter.report(ParseDiagnostic::DroppedAnchor {
                href: href.to_string(),
            });
        }
        out.push_str(&text);
    }
}

fn emit_img(
    element: ElementRef<'_>,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
    out: &mut String,
) {
    let alt = element.value().attr("alt").unwrap_or("");

    let Some(src) = element.value().attr("src") else {
        // SVG-style reference; never remote
        let href = element
            .value()
            .attr("xlink:href")
            .or_else(|| element.value().attr("href"))
            .unwrap_or("");
        emit_local_image(href, alt, images, reporter, out);
        return;
    };

    let src = src.trim();
    if src.is_empty() {
        return;
    }

    if src.starts_with("http://") || src.starts_with("https://") {
        let caption = if has_visible_text(alt) {
            alt.to_string()
        } else {
            file_stem(basename(src))
        };
        out.push_str("\n[[REMOTE:");
        out.push_str(src);
        out.push('|');
        out.push_str(&caption);
        out.push_str("]]\n");
    } else {
        emit_local_image(src, alt, images, reporter, out);
    }
}

/// Emit a local image marker only when the archive index resolves the
/// basename; unresolvable images disappear without a placeholder.
fn emit_local_image(
    src: &str,
    alt: &str,
    images: Option<&dyn ImageSource>,
    reporter: &mut Reporter<'_>,
    out: &mut String,
) {
    let src = src.trim();
    if src.is_empty() {
        return;
    }

    let name = basename(src).to_lowercase();
    if !images.is_some_and(|source| source.contains(&name)) {
        reporter.report(ParseDiagnostic::MissingImageEntry {
            src: src.to_string(),
        });
        return;
    }

    let caption = if has_visible_text(alt) {
        alt.to_string()
    } else {
        file_stem(&name)
    };
    out.push_str("\n[[");
    out.push_str(&name);
    out.push('|');
    out.push_str(&caption);
    out.push_str("]]\n");
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn file_stem(name: &str) -> String {
    name.rsplit_once('.')
        .map_or(name, |(stem, _)| stem)
        .to_string()
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    struct FakeImages(Vec<String>);

    impl ImageSource for FakeImages {
        fn contains(&self, file_name: &str) -> bool {
            let lower = file_name.to_lowercase();
            self.0.iter().any(|n| *n == lower)
        }

        fn read(&mut self, _file_name: &str) -> Option<Vec<u8>> {
            None
        }

        fn entry_names(&self) -> &[String] {
            &self.0
        }
    }

    fn flatten(html: &str) -> Vec<String> {
        flatten_with_images(html, None)
    }

    fn flatten_with_images(html: &str, images: Option<&dyn ImageSource>) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut reporter = Reporter::none();
        flatten_region(document.root_element(), None, images, &mut reporter)
    }

    fn non_blank(lines: Vec<String>) -> Vec<String> {
        lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    #[test]
    fn test_paragraph_breaks_collapse_to_spaces() {
        let lines = non_blank(flatten("<p>Hello\nwide\nworld</p><p>Second</p>"));
        assert_eq!(lines, ["Hello wide world", "Second"]);
    }

    #[test]
    fn test_br_inside_paragraph() {
        let lines = non_blank(flatten("<p>one<br/>two</p>"));
        assert_eq!(lines, ["one two"]);
    }

    #[test]
    fn test_title_is_removed() {
        let lines = non_blank(flatten(
            "<html><head><title>Meta Title</title></head><body><p>Body</p></body></html>",
        ));
        assert_eq!(lines, ["Body"]);
    }

    #[test]
    fn test_emphasis_markers() {
        let lines = non_blank(flatten("<p><b>loud</b> and <em>soft</em></p>"));
        assert_eq!(lines, ["**loud** and _soft_"]);
    }

    #[test]
    fn test_headings_get_bold_markers() {
        let lines = non_blank(flatten("<h2>Chapter One</h2><p>Text</p>"));
        assert_eq!(lines, ["**Chapter One**", "Text"]);
        let lines = non_blank(flatten("<h5>Minor</h5>"));
        assert_eq!(lines, ["Minor"]);
    }

    #[test]
    fn test_horizontal_rule() {
        let lines = non_blank(flatten("<p>a</p><hr/><p>b</p>"));
        assert_eq!(lines, ["a", "---", "b"]);
    }

    #[test]
    fn test_http_anchor_rewritten_and_upgraded() {
        let lines = non_blank(flatten(
            r#"<p>see <a href="http://example.com/x">the site</a></p>"#,
        ));
        assert_eq!(lines, ["see [the site](https://example.com/x)"]);
    }

    #[test]
    fn test_relative_anchor_degrades_to_text() {
        let lines = non_blank(flatten(r##"<p><a href="#note-3">a note</a></p>"##));
        assert_eq!(lines, ["a note"]);
    }

    #[test]
    fn test_blank_http_anchor_degrades_to_text() {
        let lines = non_blank(flatten(r#"<p>x<a href="https://example.com"> </a>y</p>"#));
        assert_eq!(lines, ["x y"]);
    }

    #[test]
    fn test_remote_image_marker_with_alt_fallback() {
        let lines = non_blank(flatten(
            r#"<p><img src="https://example.com/pics/cat.jpg" alt=""/></p>"#,
        ));
        assert_eq!(lines, ["[[REMOTE:https://example.com/pics/cat.jpg|cat]]"]);
    }

    #[test]
    fn test_local_image_requires_archive_entry() {
        let images = FakeImages(vec!["cover.png".to_string()]);

        let found = non_blank(flatten_with_images(
            r#"<img src="images/Cover.PNG" alt="The Cover"/>"#,
            Some(&images),
        ));
        assert_eq!(found, ["[[cover.png|The Cover]]"]);

        let missing = non_blank(flatten_with_images(
            r#"<img src="missing.png" alt="x"/>"#,
            Some(&images),
        ));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_local_image_without_index_is_dropped() {
        let lines = non_blank(flatten(r#"<img src="cover.png" alt="x"/>"#));
        assert!(lines.is_empty());
    }

    #[test]
    fn test_svg_image_element() {
        let images = FakeImages(vec!["pic1.jpg".to_string()]);
        let lines = non_blank(flatten_with_images(
            r#"<div><image xlink:href="pic1.jpg"/></div>"#,
            Some(&images),
        ));
        assert_eq!(lines, ["[[pic1.jpg|pic1]]"]);
    }

    #[test]
    fn test_missing_image_reports_diagnostic() {
        let document = Html::parse_document(r#"<img src="gone.png" alt="x"/>"#);
        let mut seen = Vec::new();
        let mut sink = |d: ParseDiagnostic| seen.push(d);
        let mut reporter = Reporter::new(&mut sink);
        flatten_region(document.root_element(), None, None, &mut reporter);
        assert_eq!(
            seen,
            [ParseDiagnostic::MissingImageEntry {
                src: "gone.png".to_string()
            }]
        );
    }
}
