//! Back ends turning a [`ReportModel`] into bytes.
//!
//! Each encoding implements [`Renderer`]; [`render_with`] owns the tree walk
//! so node order is identical for every back end.

#[cfg(feature = "flow")]
pub mod flow;
#[cfg(feature = "paginated")]
pub mod paginated;
#[cfg(feature = "paginated")]
mod pdf;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::{Node, Paragraph, ReportModel, Section, Table};
use crate::error::ReportError;

/// Output encodings a caller may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Fixed page size, explicit breaks (PDF).
    Paginated,
    /// Reflowing word-processing document (WordprocessingML).
    Flowing,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Paginated => "pdf",
            OutputFormat::Flowing => "xml",
        }
    }

    pub fn backend(self) -> Backend {
        match self {
            OutputFormat::Paginated => Backend::Paginated,
            OutputFormat::Flowing => Backend::Flow,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paginated" | "pdf" => Ok(OutputFormat::Paginated),
            "flowing" | "docx" => Ok(OutputFormat::Flowing),
            _ => Err(ReportError::UnsupportedFormat(value.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Paginated => f.write_str("paginated"),
            OutputFormat::Flowing => f.write_str("flowing"),
        }
    }
}

/// Renderer implementations compiled into this build, named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Paginated,
    Flow,
}

impl Backend {
    pub fn is_available(self) -> bool {
        match self {
            Backend::Paginated => cfg!(feature = "paginated"),
            Backend::Flow => cfg!(feature = "flow"),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Paginated => f.write_str("paginated"),
            Backend::Flow => f.write_str("flow"),
        }
    }
}

/// Node handlers an encoding must provide.
pub trait Renderer {
    /// `depth` is 0 for top-level sections.
    fn begin_section(&mut self, title: Option<&str>, depth: usize) -> Result<(), ReportError>;
    fn end_section(&mut self, depth: usize) -> Result<(), ReportError>;
    fn paragraph(&mut self, paragraph: &Paragraph) -> Result<(), ReportError>;
    fn table(&mut self, table: &Table) -> Result<(), ReportError>;
    fn page_break(&mut self) -> Result<(), ReportError>;
    fn rule(&mut self) -> Result<(), ReportError>;
    /// Produce the finished byte stream for the whole tree.
    fn finish(self) -> Result<Vec<u8>, ReportError>
    where
        Self: Sized;
}

/// Walk the tree depth-first in document order, feeding every node to `renderer`.
pub fn render_with<R: Renderer>(
    model: &ReportModel,
    mut renderer: R,
) -> Result<Vec<u8>, ReportError> {
    walk(&model.nodes, 0, &mut renderer)?;
    renderer.finish()
}

fn walk<R: Renderer>(nodes: &[Node], depth: usize, renderer: &mut R) -> Result<(), ReportError> {
    for node in nodes {
        match node {
            Node::Section(Section { title, children }) => {
                renderer.begin_section(title.as_deref(), depth)?;
                walk(children, depth + 1, renderer)?;
                renderer.end_section(depth)?;
            }
            Node::Paragraph(paragraph) => renderer.paragraph(paragraph)?,
            Node::Table(table) => renderer.table(table)?,
            Node::PageBreak => renderer.page_break()?,
            Node::Rule => renderer.rule()?,
        }
    }
    Ok(())
}

/// Fail with `BackendUnavailable` when `format` was compiled out.
pub fn ensure_available(format: OutputFormat) -> Result<(), ReportError> {
    let backend = format.backend();
    if backend.is_available() {
        Ok(())
    } else {
        Err(ReportError::BackendUnavailable { backend })
    }
}

/// Render `model` with the back end matching `format`.
pub fn render(model: &ReportModel, format: OutputFormat) -> Result<Vec<u8>, ReportError> {
    ensure_available(format)?;
    match format {
        #[cfg(feature = "paginated")]
        OutputFormat::Paginated => {
            render_with(model, paginated::PaginatedRenderer::new(&model.title))
        }
        #[cfg(feature = "flow")]
        OutputFormat::Flowing => render_with(model, flow::FlowRenderer::new()?),
        #[allow(unreachable_patterns)]
        other => Err(ReportError::BackendUnavailable {
            backend: other.backend(),
        }),
    }
}
