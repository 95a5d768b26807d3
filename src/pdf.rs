//! A4 pagination of a [`ReportDocument`] with `printpdf`.
//!
//! Blocks are placed top to bottom inside 20 mm margins. A block that does
//! not fit on the current page moves to the next one; tables break between
//! rows and repeat their header row on every continuation page. Text uses
//! the built-in Helvetica faces, measured with their standard AFM widths.

use std::{fs, path::Path};

use image::ImageFormat;
use log::debug;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rect, Rgb, path::PaintMode,
};

use crate::{
    compose::{Align, Block, HeadingLevel, ImageBlock, ReportDocument, Span, TableBlock},
    error::RenderError,
};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const PT_TO_MM: f32 = 25.4 / 72.0;
const ELLIPSIS: &str = "...";

const TABLE_FONT_PT: f32 = 10.0;
const TABLE_ROW_PT: f32 = 18.0;
const CELL_PADDING_PT: f32 = 6.0;
const GRID_THICKNESS_PT: f32 = 0.25;
const HEADER_FILL: (f32, f32, f32) = (240.0 / 255.0, 240.0 / 255.0, 240.0 / 255.0);
const GRID_COLOR: (f32, f32, f32) = (0.5, 0.5, 0.5);

/// Font size, line leading and surrounding space for a run of text, in points.
#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f32,
    leading: f32,
    space_before: f32,
    space_after: f32,
    bold: bool,
    centered: bool,
}

const TITLE_STYLE: TextStyle = TextStyle {
    size: 18.0,
    leading: 22.0,
    space_before: 0.0,
    space_after: 6.0,
    bold: true,
    centered: true,
};

const BODY_STYLE: TextStyle = TextStyle {
    size: 10.0,
    leading: 12.0,
    space_before: 0.0,
    space_after: 0.0,
    bold: false,
    centered: false,
};

const SECTION_STYLE: TextStyle = TextStyle {
    size: 14.0,
    leading: 18.0,
    space_before: 12.0,
    space_after: 6.0,
    bold: true,
    centered: false,
};

const SUBSECTION_STYLE: TextStyle = TextStyle {
    size: 12.0,
    leading: 14.4,
    space_before: 12.0,
    space_after: 6.0,
    bold: true,
    centered: false,
};

/// A finished PDF held in memory.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Renders `document` and writes it to `path`, replacing any existing file.
/// Returns the number of pages written.
pub fn write_pdf(document: &ReportDocument, path: &Path) -> Result<usize, RenderError> {
    let rendered = render_pdf(document)?;
    fs::write(path, &rendered.bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Wrote {} byte(s) across {} page(s) to {:?}",
        rendered.bytes.len(),
        rendered.pages,
        path
    );
    Ok(rendered.pages)
}

pub fn render_pdf(document: &ReportDocument) -> Result<RenderedPdf, RenderError> {
    let mut writer = PageWriter::new(&document.title)?;
    for (idx, block) in document.blocks.iter().enumerate() {
        match block {
            Block::Title(text) => writer.text(&[Span::bold(text.clone())], TITLE_STYLE, 0.0),
            Block::Paragraph(spans) => writer.text(spans, BODY_STYLE, 0.0),
            Block::Heading(level, text) => {
                let style = match level {
                    HeadingLevel::Section => SECTION_STYLE,
                    HeadingLevel::Subsection => SUBSECTION_STYLE,
                };
                // Keep a heading on the same page as the start of what follows.
                let follow = document
                    .blocks
                    .get(idx + 1)
                    .map(leading_height_mm)
                    .unwrap_or(0.0);
                writer.text(&[Span::bold(text.clone())], style, follow);
            }
            Block::Spacer(points) => writer.spacer(*points * PT_TO_MM),
            Block::Image(image) => writer.image(image)?,
            Block::Table(table) => writer.table(table),
        }
    }
    writer.finish()
}

/// Height of the part of `block` that must not be separated from a heading.
fn leading_height_mm(block: &Block) -> f32 {
    match block {
        Block::Image(image) => image.height_mm,
        Block::Table(_) => 2.0 * TABLE_ROW_PT * PT_TO_MM,
        Block::Paragraph(_) => BODY_STYLE.leading * PT_TO_MM,
        Block::Title(_) | Block::Heading(..) | Block::Spacer(_) => 0.0,
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn pick(&self, bold: bool) -> &IndirectFontRef {
        if bold { &self.bold } else { &self.regular }
    }
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    /// Top of the free area on the current page, measured from the page bottom.
    cursor: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, RenderError> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Layer 1",
        );
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(pdf_error)?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(pdf_error)?,
        };
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            fonts,
            cursor: content_top(),
            pages: 1,
        })
    }

    fn finish(self) -> Result<RenderedPdf, RenderError> {
        let pages = self.pages;
        let bytes = self.doc.save_to_bytes().map_err(pdf_error)?;
        Ok(RenderedPdf { bytes, pages })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            format!("Page {}", self.pages + 1),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = content_top();
        self.pages += 1;
    }

    fn at_page_top(&self) -> bool {
        self.cursor >= content_top() - f32::EPSILON
    }

    fn remaining(&self) -> f32 {
        self.cursor - MARGIN_MM
    }

    /// Starts a new page unless `height` fits below the cursor. A fresh page
    /// is never skipped, so oversized content still gets placed.
    fn reserve(&mut self, height: f32) {
        if height > self.remaining() && !self.at_page_top() {
            self.new_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        if height >= self.remaining() {
            self.new_page();
        } else if !self.at_page_top() {
            self.cursor -= height;
        }
    }

    fn text(&mut self, spans: &[Span], style: TextStyle, keep_with_next: f32) {
        let lines = wrap_spans(spans, style.size, CONTENT_WIDTH_MM);
        let leading = style.leading * PT_TO_MM;
        let block_height = lines.len() as f32 * leading + style.space_after * PT_TO_MM;
        let space_before = style.space_before * PT_TO_MM;
        self.reserve(space_before + block_height + keep_with_next);
        if !self.at_page_top() {
            self.cursor -= space_before;
        }

        for line in &lines {
            self.reserve(leading);
            let baseline = self.cursor - leading + (leading - style.size * PT_TO_MM) / 2.0
                + style.size * PT_TO_MM * 0.2;
            let line_width: f32 = line
                .iter()
                .map(|span| text_width_mm(&span.text, style.size, span.bold || style.bold))
                .sum();
            let mut x = if style.centered {
                MARGIN_MM + (CONTENT_WIDTH_MM - line_width).max(0.0) / 2.0
            } else {
                MARGIN_MM
            };
            self.set_fill((0.0, 0.0, 0.0));
            for span in line {
                let bold = span.bold || style.bold;
                self.layer.use_text(
                    span.text.as_str(),
                    style.size,
                    Mm(x),
                    Mm(baseline),
                    self.fonts.pick(bold),
                );
                x += text_width_mm(&span.text, style.size, bold);
            }
            self.cursor -= leading;
        }
        self.cursor -= style.space_after * PT_TO_MM;
    }

    fn image(&mut self, block: &ImageBlock) -> Result<(), RenderError> {
        self.reserve(block.height_mm);
        let decoded = image::load_from_memory_with_format(&block.chart.png, ImageFormat::Png)
            .map_err(|source| RenderError::Image { source })?;

        let dpi = block.chart.dpi;
        let natural_width = block.chart.width as f32 / dpi * 25.4;
        let natural_height = block.chart.height as f32 / dpi * 25.4;
        let x = MARGIN_MM + (CONTENT_WIDTH_MM - block.width_mm).max(0.0) / 2.0;
        let bottom = self.cursor - block.height_mm;

        Image::from_dynamic_image(&decoded).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(bottom)),
                scale_x: Some(block.width_mm / natural_width),
                scale_y: Some(block.height_mm / natural_height),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.cursor = bottom;
        Ok(())
    }

    fn table(&mut self, table: &TableBlock) {
        let row_height = TABLE_ROW_PT * PT_TO_MM;
        let left = MARGIN_MM + (CONTENT_WIDTH_MM - table.width_mm()).max(0.0) / 2.0;
        let first_rows = if table.rows.is_empty() { 1.0 } else { 2.0 };
        self.reserve(first_rows * row_height);
        self.table_header(table, left);

        for row in &table.rows {
            if row_height > self.remaining() {
                self.new_page();
                self.table_header(table, left);
            }
            self.table_row(table, left, row, false);
        }
    }

    fn table_header(&mut self, table: &TableBlock, left: f32) {
        let headers: Vec<String> = table
            .columns
            .iter()
            .map(|column| column.header.clone())
            .collect();
        self.table_row(table, left, &headers, true);
    }

    fn table_row(&mut self, table: &TableBlock, left: f32, cells: &[String], header: bool) {
        let row_height = TABLE_ROW_PT * PT_TO_MM;
        let padding = CELL_PADDING_PT * PT_TO_MM;
        let top = self.cursor;
        let bottom = top - row_height;
        let baseline = bottom + (row_height - TABLE_FONT_PT * PT_TO_MM) / 2.0
            + TABLE_FONT_PT * PT_TO_MM * 0.2;

        let mut x = left;
        for (idx, column) in table.columns.iter().enumerate() {
            let right = x + column.width_mm;
            let cell = Rect::new(Mm(x), Mm(bottom), Mm(right), Mm(top));
            if header {
                self.set_fill(HEADER_FILL);
                self.layer.add_rect(cell.with_mode(PaintMode::Fill));
            }
            self.set_stroke(GRID_COLOR, GRID_THICKNESS_PT);
            self.layer.add_rect(cell.with_mode(PaintMode::Stroke));

            let text = cells.get(idx).map(String::as_str).unwrap_or("");
            let available = column.width_mm - 2.0 * padding;
            let fitted = fit_text(text, TABLE_FONT_PT, header, available);
            // Header cells stay left-aligned, like the label column.
            let text_x = match (column.align, header) {
                (Align::Right, false) => {
                    right - padding - text_width_mm(&fitted, TABLE_FONT_PT, header)
                }
                _ => x + padding,
            };
            self.set_fill((0.0, 0.0, 0.0));
            self.layer.use_text(
                fitted,
                TABLE_FONT_PT,
                Mm(text_x),
                Mm(baseline),
                self.fonts.pick(header),
            );
            x = right;
        }
        self.cursor = bottom;
    }

    fn set_fill(&self, (r, g, b): (f32, f32, f32)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn set_stroke(&self, (r, g, b): (f32, f32, f32), thickness: f32) {
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(r, g, b, None)));
        self.layer.set_outline_thickness(thickness);
    }
}

fn content_top() -> f32 {
    PAGE_HEIGHT_MM - MARGIN_MM
}

fn pdf_error(err: printpdf::Error) -> RenderError {
    RenderError::Pdf {
        message: err.to_string(),
    }
}

/// Greedy word wrap over styled spans. Every returned line holds at least one
/// word, so a single overlong word overflows instead of looping.
fn wrap_spans(spans: &[Span], size: f32, max_width: f32) -> Vec<Vec<Span>> {
    let mut lines: Vec<Vec<Span>> = Vec::new();
    let mut line: Vec<Span> = Vec::new();
    let mut width = 0.0_f32;

    for span in spans {
        let pieces: Vec<&str> = span.text.split(' ').collect();
        for (piece_idx, piece) in pieces.iter().enumerate() {
            let trailing_space = piece_idx + 1 < pieces.len();
            let word = if trailing_space {
                format!("{piece} ")
            } else {
                (*piece).to_string()
            };
            if word.is_empty() {
                continue;
            }
            let word_width = text_width_mm(word.trim_end(), size, span.bold);
            if width + word_width > max_width && !line.is_empty() {
                lines.push(trim_line(std::mem::take(&mut line)));
                width = 0.0;
            }
            width += text_width_mm(&word, size, span.bold);
            match line.last_mut() {
                Some(last) if last.bold == span.bold => last.text.push_str(&word),
                _ => line.push(Span {
                    text: word,
                    bold: span.bold,
                }),
            }
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(trim_line(line));
    }
    lines
}

fn trim_line(mut line: Vec<Span>) -> Vec<Span> {
    if let Some(last) = line.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    line
}

/// Shortens `text` with a trailing ellipsis until it fits in `max_width`.
fn fit_text(text: &str, size: f32, bold: bool, max_width: f32) -> String {
    if text_width_mm(text, size, bold) <= max_width {
        return text.to_string();
    }
    let mut kept: String = text.to_string();
    while !kept.is_empty() {
        kept.pop();
        let candidate = format!("{}{ELLIPSIS}", kept.trim_end());
        if text_width_mm(&candidate, size, bold) <= max_width {
            return candidate;
        }
    }
    ELLIPSIS.to_string()
}

pub fn text_width_mm(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|ch| glyph_width(ch, bold)).sum();
    units as f32 / 1000.0 * size * PT_TO_MM
}

const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, //
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, //
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, //
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, //
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, //
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, //
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, //
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, //
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn glyph_width(ch: char, bold: bool) -> u32 {
    let table = if bold {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };
    let base = fold_accent(ch);
    match base as u32 {
        code @ 32..=126 => u32::from(table[(code - 32) as usize]),
        _ => 556,
    }
}

/// Latin-1 letters share the advance width of their unaccented base letter.
fn fold_accent(ch: char) -> char {
    match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ñ' => 'N',
        'Ò'..='Ö' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ì'..='ï' => 'i',
        'ñ' => 'n',
        'ò'..='ö' => 'o',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
