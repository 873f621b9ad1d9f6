//! Encoding-agnostic report tree shared by every renderer.

pub mod builder;
mod options;

use serde::Serialize;

use crate::scoring::Band;

pub use builder::build;
pub use options::ReportOptions;

/// Root of the intermediate document: an ordered list of top-level nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportModel {
    pub title: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Section(Section),
    Paragraph(Paragraph),
    Table(Table),
    PageBreak,
    Rule,
}

impl Node {
    pub fn paragraph(text: impl Into<String>, style: TextStyle) -> Self {
        Node::Paragraph(Paragraph {
            text: text.into(),
            style,
        })
    }
}

/// Titled group of nodes; untitled sections carry no heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: Option<String>,
    pub children: Vec<Node>,
}

impl Section {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            children: Vec::new(),
        }
    }

    pub fn untitled() -> Self {
        Self {
            title: None,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    Title,
    Subtitle,
    Body,
    Strong,
    Note,
}

/// Grid of cells with explicit column widths in millimetres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub column_widths: Vec<u16>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(column_widths: &[u16]) -> Self {
        Self {
            column_widths: column_widths.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    /// Append a row whose cells all share one style.
    pub fn styled_row<I, S>(self, style: CellStyle, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = texts
            .into_iter()
            .map(|text| Cell::new(text, style))
            .collect();
        self.row(cells)
    }

    /// A two-column label/value row.
    pub fn pair(self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.row(vec![
            Cell::new(label, CellStyle::Label),
            Cell::new(value, CellStyle::Body),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    pub style: CellStyle,
}

impl Cell {
    pub fn new(text: impl Into<String>, style: CellStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Style tag of a cell. `Band` marks cells colored after a severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStyle {
    Body,
    Label,
    Header,
    Total,
    Band(Band),
}

impl ReportModel {
    /// Every piece of text in document order: headings, paragraphs, then cells row by row.
    pub fn text_lines(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_text(&self.nodes, &mut out);
        out
    }

    /// Top-level section titles in order.
    pub fn section_titles(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Section(section) => section.title.as_deref(),
                _ => None,
            })
            .collect()
    }
}

fn collect_text<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Section(section) => {
                if let Some(title) = &section.title {
                    out.push(title);
                }
                collect_text(&section.children, out);
            }
            Node::Paragraph(paragraph) => out.push(&paragraph.text),
            Node::Table(table) => {
                for cell in table.rows.iter().flatten() {
                    out.push(&cell.text);
                }
            }
            Node::PageBreak | Node::Rule => {}
        }
    }
}
