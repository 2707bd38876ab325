//! Plain-text → PDF document backend.
//!
//! Produces a PDF file using the standard Helvetica font with
//! WinAnsi encoding, so no font data needs to be embedded.  Text is wrapped
//! greedily on word boundaries using an average glyph width and broken onto
//! new pages when the next line would cross the bottom margin.
//!
//! Characters outside Latin-1 are written as `?`.

use async_trait::async_trait;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

use crate::config::Orientation;

use super::{ConversionResult, DocumentBackend, DocumentInput, FileType, PageLayout};

/// PostScript points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;
/// Line advance as a fraction of the font size, in millimetres per point.
const LINE_HEIGHT_MM_PER_PT: f32 = 0.4;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
/// Resource name of the page font.
const FONT_NAME: Name<'static> = Name(b"F1");

/// [`DocumentBackend`] that renders text into a PDF in-process.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfBackend;

#[async_trait]
impl DocumentBackend for PdfBackend {
    async fn convert(&self, input: DocumentInput) -> ConversionResult {
        let file_name = format!("{}.pdf", input.stem);
        let DocumentInput { text, layout, .. } = input;

        // Large inputs take a while to lay out; keep the runtime free.
        match tokio::task::spawn_blocking(move || render_pdf(&text, &layout)).await {
            Ok(bytes) => {
                log::info!("document: rendered {file_name} ({} bytes)", bytes.len());
                ConversionResult::completed(file_name, FileType::Document, bytes)
            }
            Err(e) => {
                log::error!("document: render task failed: {e}");
                ConversionResult::failed(file_name, FileType::Document, "Could not generate the PDF")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Resolved page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    width: f32,
    height: f32,
    margin: f32,
    font_size: f32,
    line_height: f32,
}

impl Geometry {
    fn from_layout(layout: &PageLayout) -> Self {
        let (w, h) = layout.page_size.dimensions_mm();
        let (w, h) = match layout.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        let font_size = if layout.font_size > 0.0 { layout.font_size } else { 12.0 };
        let margin = layout.margin_mm.max(0.0) * PT_PER_MM;
        Self {
            width: w * PT_PER_MM,
            height: h * PT_PER_MM,
            margin,
            font_size,
            line_height: font_size * LINE_HEIGHT_MM_PER_PT * PT_PER_MM,
        }
    }

    fn chars_per_line(&self) -> usize {
        let usable = (self.width - 2.0 * self.margin).max(0.0);
        ((usable / (self.font_size * AVG_GLYPH_EM)).floor() as usize).max(1)
    }

    fn lines_per_page(&self) -> usize {
        let usable = (self.height - 2.0 * self.margin).max(0.0);
        ((usable / self.line_height).floor() as usize).max(1)
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Wrap `text` into lines of at most `width` characters.
///
/// Existing line breaks are kept; words longer than a line are split.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r').replace('\t', "    ");
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word.iter());
            current_len += word.len();
        }
        lines.push(current);
    }

    // A trailing newline should not produce a blank trailing line.
    if lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Encode one line as WinAnsi bytes; characters outside Latin-1 become `?`.
fn encode_line(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c {
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u8,
            _ => b'?',
        })
        .collect()
}

fn content_stream(lines: &[String], g: &Geometry) -> Vec<u8> {
    let mut content = Content::new();
    content.begin_text();
    content.set_font(FONT_NAME, g.font_size);
    content.set_leading(g.line_height);
    content.next_line(g.margin, g.height - g.margin - g.font_size);
    for line in lines {
        content.show(Str(&encode_line(line)));
        content.next_line_using_leading();
    }
    content.end_text();
    content.finish()
}

// ---------------------------------------------------------------------------
// PDF assembly
// ---------------------------------------------------------------------------

/// Lay out `text` and serialise it as a PDF document.
pub fn render_pdf(text: &str, layout: &PageLayout) -> Vec<u8> {
    let g = Geometry::from_layout(layout);
    let lines = wrap_text(text, g.chars_per_line());
    let mut pages: Vec<&[String]> = lines.chunks(g.lines_per_page()).collect();
    if pages.is_empty() {
        pages.push(&[]);
    }

    // Object ids: 1 catalog, 2 page tree, 3 font, then (page, content) pairs.
    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let font_id = Ref::new(3);
    let page_ids: Vec<Ref> = (0..pages.len())
        .map(|i| Ref::new(4 + 2 * i as i32))
        .collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(pages.len() as i32);
    pdf.type1_font(font_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    for (lines, &page_id) in pages.iter().zip(&page_ids) {
        let content_id = Ref::new(page_id.get() + 1);
        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, g.width, g.height))
            .parent(tree_id)
            .contents(content_id);
        page.resources().fonts().pair(FONT_NAME, font_id);
        page.finish();
        pdf.stream(content_id, &content_stream(lines, &g));
    }

    pdf.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;

    fn layout() -> PageLayout {
        PageLayout {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 20.0,
            font_size: 12.0,
        }
    }

    fn as_text(pdf: &[u8]) -> String {
        String::from_utf8_lossy(pdf).into_owned()
    }

    fn page_count(pdf: &[u8]) -> usize {
        let text = as_text(pdf);
        text.matches("/Type /Page").count() - text.matches("/Type /Pages").count()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn keeps_blank_lines_and_splits_long_words() {
        let lines = wrap_text("a\n\nabcdefghij", 4);
        assert_eq!(lines, vec!["a", "", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn trailing_newline_is_not_a_line() {
        assert_eq!(wrap_text("one\r\ntwo\n", 20), vec!["one", "two"]);
    }

    #[test]
    fn encodes_latin1_and_replaces_the_rest() {
        assert_eq!(encode_line("a(b)c"), b"a(b)c".to_vec());
        assert_eq!(encode_line("é"), vec![0xE9]);
        assert_eq!(encode_line("€\u{7}"), b"??".to_vec());
    }

    #[test]
    fn produces_pdf_with_standard_font() {
        let pdf = render_pdf("Hello, PDF!", &layout());
        let text = as_text(&pdf);
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/BaseFont /Helvetica"));
        assert!(text.contains("/Encoding /WinAnsiEncoding"));
        assert!(text.contains("Hello, PDF!"));
        assert_eq!(page_count(&pdf), 1);
    }

    #[test]
    fn empty_text_yields_one_blank_page() {
        let pdf = render_pdf("", &layout());
        assert_eq!(page_count(&pdf), 1);
        assert!(as_text(&pdf).contains("/Count 1"));
    }

    #[test]
    fn long_text_spans_pages() {
        let g = Geometry::from_layout(&layout());
        let text = "line\n".repeat(g.lines_per_page() * 2 + 1);
        let pdf = render_pdf(&text, &layout());
        assert_eq!(page_count(&pdf), 3);
        assert!(as_text(&pdf).contains("/Count 3"));
    }

    #[test]
    fn landscape_swaps_page_dimensions() {
        let mut l = layout();
        l.orientation = Orientation::Landscape;
        let g = Geometry::from_layout(&l);
        assert!((g.width - 841.89).abs() < 0.01);
        assert!((g.height - 595.28).abs() < 0.01);
        assert!(as_text(&render_pdf("x", &l)).contains("/MediaBox"));
    }

    #[test]
    fn larger_font_fits_fewer_chars() {
        let mut big = layout();
        big.font_size = 24.0;
        let small = Geometry::from_layout(&layout());
        let large = Geometry::from_layout(&big);
        assert!(large.chars_per_line() < small.chars_per_line());
        assert!(large.lines_per_page() < small.lines_per_page());
    }

    #[tokio::test]
    async fn backend_names_output_after_stem() {
        let result = PdfBackend
            .convert(DocumentInput {
                stem: "report".into(),
                text: "body".into(),
                layout: layout(),
            })
            .await;
        assert!(result.success);
        assert_eq!(result.file_name, "report.pdf");
        assert_eq!(result.file_type, FileType::Document);
        assert_eq!(result.file_size, result.blob.as_ref().unwrap().len() as u64);
    }
}
