//! WordprocessingML back end. Output is a single-file Flat OPC package
//! (`pkg:package`) that word processors open as a regular document.

use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;

use super::{Backend, Renderer};
use crate::document::{CellStyle, Paragraph, Table, TextStyle};
use crate::error::ReportError;
use crate::scoring::Band;

const PKG_NS: &str = "http://schemas.microsoft.com/office/2006/xmlPackage";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const OFFICE_DOC_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const STYLES_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const RELS_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";
const DOCUMENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

/// Twentieths of a point per millimetre.
const TWIPS_PER_MM: f32 = 1440.0 / 25.4;

const NAVY: &str = "003366";
const GRID: &str = "808080";
const LABEL_FILL: &str = "E6E6E6";

fn band_fill(band: Band) -> &'static str {
    match band {
        Band::Critical => "FF6B6B",
        Band::Important => "FFA500",
        Band::Moderate => "FFD700",
        Band::Acceptable => "90EE90",
    }
}

/// Streams the tree into WordprocessingML body elements.
pub struct FlowRenderer {
    writer: Writer<Vec<u8>>,
}

impl FlowRenderer {
    /// Write the package prologue up to the open `w:body` element.
    pub fn new() -> Result<Self, ReportError> {
        let mut renderer = Self {
            writer: Writer::new(Vec::new()),
        };
        renderer.prologue()?;
        Ok(renderer)
    }

    fn emit(&mut self, event: Event<'_>) -> Result<(), ReportError> {
        self.writer
            .write_event(event)
            .map_err(|err| ReportError::render(Backend::Flow, err))
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.emit(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), ReportError> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), ReportError> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.emit(Event::Empty(start))
    }

    fn prologue(&mut self) -> Result<(), ReportError> {
        self.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        self.emit(Event::PI(BytesPI::new(r#"mso-application progid="Word.Document""#)))?;
        self.open("pkg:package", &[("xmlns:pkg", PKG_NS)])?;

        self.open(
            "pkg:part",
            &[("pkg:name", "/_rels/.rels"), ("pkg:contentType", RELS_TYPE)],
        )?;
        self.open("pkg:xmlData", &[])?;
        self.open("Relationships", &[("xmlns", REL_NS)])?;
        self.empty(
            "Relationship",
            &[("Id", "rId1"), ("Type", OFFICE_DOC_REL), ("Target", "word/document.xml")],
        )?;
        self.close("Relationships")?;
        self.close("pkg:xmlData")?;
        self.close("pkg:part")?;

        self.open(
            "pkg:part",
            &[
                ("pkg:name", "/word/_rels/document.xml.rels"),
                ("pkg:contentType", RELS_TYPE),
            ],
        )?;
        self.open("pkg:xmlData", &[])?;
        self.open("Relationships", &[("xmlns", REL_NS)])?;
        self.empty(
            "Relationship",
            &[("Id", "rId1"), ("Type", STYLES_REL), ("Target", "styles.xml")],
        )?;
        self.close("Relationships")?;
        self.close("pkg:xmlData")?;
        self.close("pkg:part")?;

        self.styles_part()?;

        self.open(
            "pkg:part",
            &[
                ("pkg:name", "/word/document.xml"),
                ("pkg:contentType", DOCUMENT_TYPE),
            ],
        )?;
        self.open("pkg:xmlData", &[])?;
        self.open("w:document", &[("xmlns:w", W_NS)])?;
        self.open("w:body", &[])
    }

    /// Paragraph styles referenced by headings and cover paragraphs.
    fn styles_part(&mut self) -> Result<(), ReportError> {
        self.open(
            "pkg:part",
            &[("pkg:name", "/word/styles.xml"), ("pkg:contentType", STYLES_TYPE)],
        )?;
        self.open("pkg:xmlData", &[])?;
        self.open("w:styles", &[("xmlns:w", W_NS)])?;

        self.open(
            "w:style",
            &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
        )?;
        self.empty("w:name", &[("w:val", "Normal")])?;
        self.open("w:rPr", &[])?;
        self.empty("w:sz", &[("w:val", "20")])?;
        self.close("w:rPr")?;
        self.close("w:style")?;

        let styles = [
            ("Title", "Title", 32, None),
            ("Subtitle", "Subtitle", 26, None),
            ("Heading1", "heading 1", 28, Some("0")),
            ("Heading2", "heading 2", 24, Some("1")),
            ("Heading3", "heading 3", 22, Some("2")),
        ];
        for (id, name, half_points, outline) in styles {
            let size = half_points.to_string();
            self.open("w:style", &[("w:type", "paragraph"), ("w:styleId", id)])?;
            self.empty("w:name", &[("w:val", name)])?;
            self.empty("w:basedOn", &[("w:val", "Normal")])?;
            self.open("w:pPr", &[])?;
            self.empty("w:keepNext", &[])?;
            self.empty("w:spacing", &[("w:before", "240"), ("w:after", "120")])?;
            if let Some(level) = outline {
                self.empty("w:outlineLvl", &[("w:val", level)])?;
            }
            self.close("w:pPr")?;
            self.open("w:rPr", &[])?;
            self.empty("w:b", &[])?;
            self.empty("w:color", &[("w:val", NAVY)])?;
            self.empty("w:sz", &[("w:val", size.as_str())])?;
            self.close("w:rPr")?;
            self.close("w:style")?;
        }

        self.close("w:styles")?;
        self.close("pkg:xmlData")?;
        self.close("pkg:part")
    }

    /// One `w:p` holding `text`; newlines become `w:br`.
    fn text_paragraph(
        &mut self,
        text: &str,
        style_id: Option<&str>,
        centered: bool,
        bold: bool,
        color: Option<&str>,
        italic: bool,
    ) -> Result<(), ReportError> {
        self.open("w:p", &[])?;
        if style_id.is_some() || centered {
            self.open("w:pPr", &[])?;
            if let Some(id) = style_id {
                self.empty("w:pStyle", &[("w:val", id)])?;
            }
            if centered {
                self.empty("w:jc", &[("w:val", "center")])?;
            }
            self.close("w:pPr")?;
        }
        for (idx, line) in text.split('\n').enumerate() {
            self.open("w:r", &[])?;
            if bold || italic || color.is_some() {
                self.open("w:rPr", &[])?;
                if bold {
                    self.empty("w:b", &[])?;
                }
                if italic {
                    self.empty("w:i", &[])?;
                }
                if let Some(color) = color {
                    self.empty("w:color", &[("w:val", color)])?;
                }
                self.close("w:rPr")?;
            }
            if idx > 0 {
                self.empty("w:br", &[])?;
            }
            self.open("w:t", &[("xml:space", "preserve")])?;
            self.emit(Event::Text(BytesText::new(line)))?;
            self.close("w:t")?;
            self.close("w:r")?;
        }
        self.close("w:p")
    }

    fn border_set(&mut self, tag: &str, edges: &[&str], size: &str) -> Result<(), ReportError> {
        self.open(tag, &[])?;
        for edge in edges {
            self.empty(
                edge,
                &[
                    ("w:val", "single"),
                    ("w:sz", size),
                    ("w:space", "0"),
                    ("w:color", GRID),
                ],
            )?;
        }
        self.close(tag)
    }
}

impl Renderer for FlowRenderer {
    fn begin_section(&mut self, title: Option<&str>, depth: usize) -> Result<(), ReportError> {
        if let Some(title) = title {
            let style = match depth {
                0 => "Heading1",
                1 => "Heading2",
                _ => "Heading3",
            };
            self.text_paragraph(title, Some(style), false, false, None, false)?;
        }
        Ok(())
    }

    fn end_section(&mut self, _depth: usize) -> Result<(), ReportError> {
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &Paragraph) -> Result<(), ReportError> {
        let text = paragraph.text.as_str();
        match paragraph.style {
            TextStyle::Title => self.text_paragraph(text, Some("Title"), true, false, None, false),
            TextStyle::Subtitle => {
                self.text_paragraph(text, Some("Subtitle"), true, false, None, false)
            }
            TextStyle::Body => self.text_paragraph(text, None, false, false, None, false),
            TextStyle::Strong => self.text_paragraph(text, None, false, true, None, false),
            TextStyle::Note => self.text_paragraph(text, None, false, false, Some("555555"), true),
        }
    }

    fn table(&mut self, table: &Table) -> Result<(), ReportError> {
        let widths: Vec<String> = table
            .column_widths
            .iter()
            .map(|mm| ((f32::from(*mm) * TWIPS_PER_MM).round() as u32).to_string())
            .collect();

        self.open("w:tbl", &[])?;
        self.open("w:tblPr", &[])?;
        self.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
        self.border_set(
            "w:tblBorders",
            &["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"],
            "4",
        )?;
        self.empty("w:tblLayout", &[("w:type", "fixed")])?;
        self.close("w:tblPr")?;

        self.open("w:tblGrid", &[])?;
        for width in &widths {
            self.empty("w:gridCol", &[("w:w", width.as_str())])?;
        }
        self.close("w:tblGrid")?;

        for row in &table.rows {
            self.open("w:tr", &[])?;
            for (cell, width) in row.iter().zip(&widths) {
                let (fill, bold, color) = match cell.style {
                    CellStyle::Body => (None, false, None),
                    CellStyle::Label | CellStyle::Total => (Some(LABEL_FILL), true, None),
                    CellStyle::Header => (Some(NAVY), true, Some("FFFFFF")),
                    CellStyle::Band(band) => (Some(band_fill(band)), true, None),
                };
                self.open("w:tc", &[])?;
                self.open("w:tcPr", &[])?;
                self.empty("w:tcW", &[("w:w", width.as_str()), ("w:type", "dxa")])?;
                if let Some(fill) = fill {
                    self.empty(
                        "w:shd",
                        &[("w:val", "clear"), ("w:color", "auto"), ("w:fill", fill)],
                    )?;
                }
                self.close("w:tcPr")?;
                self.text_paragraph(&cell.text, None, false, bold, color, false)?;
                self.close("w:tc")?;
            }
            self.close("w:tr")?;
        }
        self.close("w:tbl")?;
        // spacer so consecutive tables stay separate
        self.empty("w:p", &[])
    }

    fn page_break(&mut self) -> Result<(), ReportError> {
        self.open("w:p", &[])?;
        self.open("w:r", &[])?;
        self.empty("w:br", &[("w:type", "page")])?;
        self.close("w:r")?;
        self.close("w:p")
    }

    fn rule(&mut self) -> Result<(), ReportError> {
        self.open("w:p", &[])?;
        self.open("w:pPr", &[])?;
        self.open("w:pBdr", &[])?;
        self.empty(
            "w:bottom",
            &[
                ("w:val", "single"),
                ("w:sz", "6"),
                ("w:space", "1"),
                ("w:color", GRID),
            ],
        )?;
        self.close("w:pBdr")?;
        self.close("w:pPr")?;
        self.close("w:p")
    }

    fn finish(mut self) -> Result<Vec<u8>, ReportError> {
        // A4 portrait, 2 cm margins
        self.open("w:sectPr", &[])?;
        self.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
        self.empty(
            "w:pgMar",
            &[
                ("w:top", "1134"),
                ("w:right", "1134"),
                ("w:bottom", "1134"),
                ("w:left", "1134"),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        self.close("w:sectPr")?;
        self.close("w:body")?;
        self.close("w:document")?;
        self.close("pkg:xmlData")?;
        self.close("pkg:part")?;
        self.close("pkg:package")?;
        let bytes = self.writer.into_inner();
        debug!(bytes = bytes.len(), "flow render completed");
        Ok(bytes)
    }
}
