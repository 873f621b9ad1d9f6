use tracing::debug;

use super::pdf::{self, Canvas, Font, Rgb, PAGE_HEIGHT, PAGE_WIDTH, POINTS_PER_MM};
use super::{Backend, Renderer};
use crate::document::{CellStyle, Paragraph, Table, TextStyle};
use crate::error::ReportError;
use crate::scoring::Band;

const MARGIN: f32 = 20.0 * POINTS_PER_MM;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CELL_PADDING: f32 = 4.0;
const CELL_FONT_SIZE: f32 = 9.0;
const LINE_SPACING: f32 = 1.25;

const NAVY: Rgb = Rgb::hex(0x003366);
const GRID: Rgb = Rgb::hex(0x808080);
const LABEL_FILL: Rgb = Rgb::hex(0xE6E6E6);
const NOTE: Rgb = Rgb::hex(0x555555);

fn band_fill(band: Band) -> Rgb {
    match band {
        Band::Critical => Rgb::hex(0xFF6B6B),
        Band::Important => Rgb::hex(0xFFA500),
        Band::Moderate => Rgb::hex(0xFFD700),
        Band::Acceptable => Rgb::hex(0x90EE90),
    }
}

struct TextLook {
    font: Font,
    size: f32,
    color: Rgb,
    centered: bool,
    space_after: f32,
}

fn paragraph_look(style: TextStyle) -> TextLook {
    match style {
        TextStyle::Title => TextLook {
            font: Font::Bold,
            size: 16.0,
            color: NAVY,
            centered: true,
            space_after: 18.0,
        },
        TextStyle::Subtitle => TextLook {
            font: Font::Bold,
            size: 13.0,
            color: NAVY,
            centered: true,
            space_after: 30.0,
        },
        TextStyle::Body => TextLook {
            font: Font::Regular,
            size: 10.0,
            color: Rgb::BLACK,
            centered: false,
            space_after: 6.0,
        },
        TextStyle::Strong => TextLook {
            font: Font::Bold,
            size: 10.0,
            color: Rgb::BLACK,
            centered: false,
            space_after: 4.0,
        },
        TextStyle::Note => TextLook {
            font: Font::Regular,
            size: 10.0,
            color: NOTE,
            centered: false,
            space_after: 6.0,
        },
    }
}

fn heading_look(depth: usize) -> TextLook {
    TextLook {
        font: Font::Bold,
        size: match depth {
            0 => 14.0,
            1 => 12.0,
            _ => 11.0,
        },
        color: NAVY,
        centered: false,
        space_after: 8.0,
    }
}

/// (fill, text color, font) for a table cell.
fn cell_look(style: CellStyle) -> (Option<Rgb>, Rgb, Font) {
    match style {
        CellStyle::Body => (None, Rgb::BLACK, Font::Regular),
        CellStyle::Label => (Some(LABEL_FILL), Rgb::BLACK, Font::Bold),
        CellStyle::Header => (Some(NAVY), Rgb::WHITE, Font::Bold),
        CellStyle::Total => (Some(LABEL_FILL), Rgb::BLACK, Font::Bold),
        CellStyle::Band(band) => (Some(band_fill(band)), Rgb::BLACK, Font::Bold),
    }
}

/// Approximate advance width of `text`, in points.
fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(glyph_width).sum();
    let scale = match font {
        Font::Regular => 1.0,
        Font::Bold => 1.06,
    };
    units as f32 * scale * size / 1000.0
}

/// Helvetica advance widths in thousandths of an em, grouped by glyph shape.
fn glyph_width(ch: char) -> u32 {
    match ch {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | 'I' | 'f' | 't' | '[' | ']' => 278,
        'i' | 'j' | 'l' | '\'' | '|' => 222,
        'r' | '(' | ')' | '-' => 333,
        'm' | 'M' => 833,
        'w' | 'C' | 'D' | 'G' | 'H' | 'N' | 'O' | 'Q' | 'R' | 'U' => 722,
        'W' => 944,
        '%' => 889,
        '—' => 1000,
        'A'..='Z' => 667,
        _ => 556,
    }
}

/// Greedy word wrap to `max_width` points; words longer than a line are split.
fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font, size) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, font, size) <= max_width {
                current = word.to_string();
                continue;
            }
            for ch in word.chars() {
                current.push(ch);
                let too_wide = text_width(&current, font, size) > max_width;
                if too_wide && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Lays the tree out on fixed A4 pages and writes a single PDF file.
pub struct PaginatedRenderer {
    title: String,
    pages: Vec<Canvas>,
    /// Baseline cursor, measured from the bottom of the current page.
    cursor: f32,
}

impl PaginatedRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: vec![Canvas::default()],
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut Canvas {
        if self.pages.is_empty() {
            self.pages.push(Canvas::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Canvas::default());
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn page_is_fresh(&self) -> bool {
        self.pages.last().map_or(true, Canvas::is_empty)
    }

    /// Start a new page when `height` does not fit above the bottom margin.
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN && !self.page_is_fresh() {
            self.new_page();
        }
    }

    fn write_block(&mut self, text: &str, look: &TextLook) {
        let leading = look.size * LINE_SPACING;
        for line in wrap(text, look.font, look.size, CONTENT_WIDTH) {
            self.reserve(leading);
            let x = if look.centered {
                MARGIN + (CONTENT_WIDTH - text_width(&line, look.font, look.size)) / 2.0
            } else {
                MARGIN
            };
            self.cursor -= leading;
            let y = self.cursor;
            self.page().text((x, y), look.font, look.size, look.color, &line);
        }
        self.cursor -= look.space_after;
    }

    /// Whole cell lines that fit between the cursor and the bottom margin.
    fn lines_fitting(&self) -> usize {
        let room = self.cursor - MARGIN - 2.0 * CELL_PADDING;
        (room / (CELL_FONT_SIZE * LINE_SPACING)).floor().max(0.0) as usize
    }

    /// Draw a row, continuing it on following pages when it is taller than
    /// the space left. Every continuation repeats the cell fills and borders.
    fn place_row(&mut self, widths: &[f32], cells: &[(Vec<String>, CellStyle)]) {
        let leading = CELL_FONT_SIZE * LINE_SPACING;
        let line_count = cells.iter().map(|(lines, _)| lines.len()).max().unwrap_or(1);
        let height = line_count as f32 * leading + 2.0 * CELL_PADDING;
        self.reserve(height);
        if height <= self.cursor - MARGIN {
            let whole: Vec<(&[String], CellStyle)> = cells
                .iter()
                .map(|(lines, style)| (lines.as_slice(), *style))
                .collect();
            self.draw_row(widths, &whole, line_count);
            return;
        }

        let mut offset = 0;
        while offset < line_count {
            let mut fitting = self.lines_fitting();
            if fitting == 0 {
                self.new_page();
                fitting = self.lines_fitting();
            }
            let end = (offset + fitting.max(1)).min(line_count);
            let chunk: Vec<(&[String], CellStyle)> = cells
                .iter()
                .map(|(lines, style)| {
                    let from = offset.min(lines.len());
                    let to = end.min(lines.len());
                    (&lines[from..to], *style)
                })
                .collect();
            self.draw_row(widths, &chunk, end - offset);
            debug!(from = offset, to = end, "row continued across pages");
            offset = end;
            if offset < line_count {
                self.new_page();
            }
        }
    }

    fn draw_row(&mut self, widths: &[f32], cells: &[(&[String], CellStyle)], line_count: usize) {
        let leading = CELL_FONT_SIZE * LINE_SPACING;
        let height = line_count as f32 * leading + 2.0 * CELL_PADDING;
        let top = self.cursor;
        let bottom = top - height;
        let mut x = MARGIN;
        for ((lines, style), width) in cells.iter().zip(widths) {
            let (fill, color, font) = cell_look(*style);
            let canvas = self.page();
            if let Some(fill) = fill {
                canvas.fill_rect(x, bottom, *width, height, fill);
            }
            canvas.stroke_rect(x, bottom, *width, height, GRID, 0.5);
            let mut baseline = top - CELL_PADDING;
            for line in lines.iter() {
                baseline -= leading;
                let at = (x + CELL_PADDING, baseline + 2.0);
                canvas.text(at, font, CELL_FONT_SIZE, color, line);
            }
            x += width;
        }
        self.cursor = bottom;
    }
}

impl Renderer for PaginatedRenderer {
    fn begin_section(&mut self, title: Option<&str>, depth: usize) -> Result<(), ReportError> {
        if let Some(title) = title {
            let look = heading_look(depth);
            // keep a heading together with at least two lines of what follows
            self.reserve(look.size * LINE_SPACING + 30.0);
            self.cursor -= 6.0;
            self.write_block(title, &look);
        }
        Ok(())
    }

    fn end_section(&mut self, _depth: usize) -> Result<(), ReportError> {
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &Paragraph) -> Result<(), ReportError> {
        self.write_block(&paragraph.text, &paragraph_look(paragraph.style));
        Ok(())
    }

    fn table(&mut self, table: &Table) -> Result<(), ReportError> {
        let widths: Vec<f32> = table
            .column_widths
            .iter()
            .map(|mm| f32::from(*mm) * POINTS_PER_MM)
            .collect();
        for row in &table.rows {
            let cells: Vec<(Vec<String>, CellStyle)> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let (_, _, font) = cell_look(cell.style);
                    let inner = (width - 2.0 * CELL_PADDING).max(1.0);
                    (wrap(&cell.text, font, CELL_FONT_SIZE, inner), cell.style)
                })
                .collect();
            self.place_row(&widths, &cells);
        }
        self.cursor -= 8.0;
        Ok(())
    }

    fn page_break(&mut self) -> Result<(), ReportError> {
        self.new_page();
        Ok(())
    }

    fn rule(&mut self) -> Result<(), ReportError> {
        self.reserve(16.0);
        self.cursor -= 8.0;
        let y = self.cursor;
        self.page().line((MARGIN, y), (PAGE_WIDTH - MARGIN, y), GRID, 1.0);
        self.cursor -= 8.0;
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        debug!(pages = self.pages.len(), "paginated render completed");
        pdf::assemble(&self.pages, &self.title)
            .map_err(|err| ReportError::render(Backend::Paginated, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, ReportModel, Section};
    use crate::render::render_with;
    use lopdf::content::{Content, Operation};
    use lopdf::Document;

    fn model(nodes: Vec<Node>) -> ReportModel {
        ReportModel {
            title: "Test report".into(),
            nodes,
        }
    }

    fn render_pages(nodes: Vec<Node>) -> Vec<Vec<Operation>> {
        let bytes = render_with(&model(nodes), PaginatedRenderer::new("t")).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let raw = doc.get_page_content(*id).unwrap();
                Content::decode(&raw).unwrap().operations
            })
            .collect()
    }

    fn shown_text(ops: &[Operation]) -> Vec<String> {
        ops.iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
            .collect()
    }

    fn operand(op: &Operation, idx: usize) -> f32 {
        op.operands[idx].as_float().unwrap()
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap("alpha beta gamma delta", Font::Regular, 10.0, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), "alpha beta gamma delta");
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 60.0);
        }
    }

    #[test]
    fn splits_words_wider_than_a_line() {
        let lines = wrap("WWWWWWWWWWWWWWWW", Font::Bold, 10.0, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "WWWWWWWWWWWWWWWW");
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        assert_eq!(wrap("", Font::Regular, 10.0, 100.0), vec![String::new()]);
    }

    #[test]
    fn page_breaks_are_honored_verbatim() {
        let pages = render_pages(vec![
            Node::paragraph("one", TextStyle::Body),
            Node::PageBreak,
            Node::paragraph("two", TextStyle::Body),
            Node::PageBreak,
            Node::paragraph("three", TextStyle::Body),
        ]);
        assert_eq!(pages.len(), 3);
        assert_eq!(shown_text(&pages[2]), vec!["three"]);
    }

    #[test]
    fn long_tables_flow_onto_new_pages() {
        let mut table = Table::new(&[80, 80]);
        for idx in 0..120 {
            table = table.pair(format!("Row {idx}"), "value");
        }
        let pages = render_pages(vec![Node::Table(table)]);
        assert!(pages.len() > 1);
        let text: Vec<String> = pages.iter().flat_map(|ops| shown_text(ops)).collect();
        let first = text.iter().position(|t| t == "Row 0").unwrap();
        let last = text.iter().position(|t| t == "Row 119").unwrap();
        assert!(first < last);
    }

    #[test]
    fn oversized_cell_continues_on_following_pages() {
        let words: Vec<String> = (0..900).map(|idx| format!("word{idx}")).collect();
        let table = Table::new(&[50, 120]).pair("Description:", words.join(" "));
        let pages = render_pages(vec![Node::Table(table)]);
        assert!(pages.len() > 1);

        for ops in &pages {
            for op in ops {
                match op.operator.as_str() {
                    "Td" => assert!(operand(op, 1) >= MARGIN, "baseline below margin"),
                    "re" => assert!(operand(op, 1) >= MARGIN - 0.01, "cell below margin"),
                    _ => {}
                }
            }
            // every continuation redraws the borders of both columns
            let borders = ops.iter().filter(|op| op.operator == "S").count();
            assert!(borders >= 2);
        }

        let shown: Vec<String> = pages
            .iter()
            .flat_map(|ops| shown_text(ops))
            .flat_map(|line| line.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|token| token.starts_with("word"))
            .collect();
        assert_eq!(shown, words);
    }

    #[test]
    fn same_band_gets_same_fill() {
        let table = Table::new(&[30, 30])
            .styled_row(CellStyle::Band(Band::Critical), ["a", "b"])
            .styled_row(CellStyle::Band(Band::Acceptable), ["c", "d"])
            .styled_row(CellStyle::Band(Band::Critical), ["e", "f"]);
        let pages = render_pages(vec![Node::Table(table)]);
        let fills = |color: Rgb| {
            pages[0]
                .iter()
                .filter(|op| op.operator == "rg")
                .filter(|op| {
                    let rgb = Rgb(operand(op, 0), operand(op, 1), operand(op, 2));
                    (rgb.0 - color.0).abs() < 0.01
                        && (rgb.1 - color.1).abs() < 0.01
                        && (rgb.2 - color.2).abs() < 0.01
                })
                .count()
        };
        assert_eq!(fills(band_fill(Band::Critical)), 4);
        assert_eq!(fills(band_fill(Band::Acceptable)), 2);
    }

    #[test]
    fn output_is_deterministic() {
        let mut section = Section::titled("Heading");
        section.push(Node::paragraph("Körper — text", TextStyle::Body));
        let tree = model(vec![Node::Section(section), Node::Rule]);
        let first = render_with(&tree, PaginatedRenderer::new("t")).unwrap();
        let second = render_with(&tree, PaginatedRenderer::new("t")).unwrap();
        assert_eq!(first, second);
    }
}
