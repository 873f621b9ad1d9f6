use std::fmt;

use thiserror::Error;

use crate::render::Backend;
use crate::scoring::ScoreError;

/// The entity graph is structurally incomplete for report generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("organization name must not be blank")]
    MissingOrganizationName,
    #[error("document version label must not be blank")]
    MissingVersion,
    #[error("work unit #{position} has a blank name")]
    MissingUnitName { position: usize },
    #[error("hazard #{sequence} in work unit `{unit}` has a blank category")]
    MissingCategory { unit: String, sequence: usize },
    #[error("hazard #{sequence} in work unit `{unit}` has no valid assessment")]
    UnassessedHazard {
        unit: String,
        sequence: usize,
        source: ScoreError,
    },
}

/// Failures surfaced by the compile pipeline. Nothing is returned alongside
/// an error: rendering is all-or-nothing.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid document: {0}")]
    Validation(#[from] ValidationError),
    #[error("unsupported format `{0}` (expected `paginated` or `flowing`)")]
    UnsupportedFormat(String),
    #[error("renderer backend `{backend}` is unavailable in this build")]
    BackendUnavailable { backend: Backend },
    #[error("{backend} renderer failed: {message}")]
    Render { backend: Backend, message: String },
}

impl ReportError {
    pub(crate) fn render(backend: Backend, err: impl fmt::Display) -> Self {
        ReportError::Render {
            backend,
            message: err.to_string(),
        }
    }
}
