use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::document::{self, ReportModel, ReportOptions};
use crate::error::ReportError;
use crate::model::Document;
use crate::render::{self, OutputFormat};
use crate::stats;

/// Finished report bytes together with where they should be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledReport {
    pub format: OutputFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Runs validation, aggregation, model building and rendering in one call.
#[derive(Debug, Clone, Default)]
pub struct ReportCompiler {
    options: ReportOptions,
}

impl ReportCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Validate and aggregate `document`, then build its report tree.
    pub fn build_model(&self, document: &Document) -> Result<ReportModel, ReportError> {
        document.validate()?;
        let stats = stats::aggregate(document);
        Ok(document::build(document, &stats, &self.options))
    }

    /// Produce the full report in `format`. Any failure yields no bytes.
    #[instrument(
        skip(self, document),
        fields(organization = %document.organization.name, version = %document.version)
    )]
    pub fn compile(
        &self,
        document: &Document,
        format: OutputFormat,
        generated_on: NaiveDate,
    ) -> Result<CompiledReport, ReportError> {
        render::ensure_available(format)?;
        let model = self.build_model(document)?;
        let bytes = render::render(&model, format)?;
        let filename =
            suggested_filename(&self.options.artifact_kind, document, format, generated_on);
        info!(%filename, bytes = bytes.len(), "report compiled");
        Ok(CompiledReport {
            format,
            filename,
            bytes,
        })
    }

    /// Same as [`compile`](Self::compile) with the format given by name.
    pub fn compile_str(
        &self,
        document: &Document,
        format: &str,
        generated_on: NaiveDate,
    ) -> Result<CompiledReport, ReportError> {
        let format: OutputFormat = format.parse()?;
        self.compile(document, format, generated_on)
    }
}

/// `{kind}_{organization}_{version}_{YYYYMMDD}.{ext}` with spaces in the
/// organization name replaced by underscores.
pub fn suggested_filename(
    artifact_kind: &str,
    document: &Document,
    format: OutputFormat,
    generated_on: NaiveDate,
) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        artifact_kind,
        document.organization.name.replace(' ', "_"),
        document.version,
        generated_on.format("%Y%m%d"),
        format.extension()
    )
}
