use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use riskdoc_core::ReportOptions;
use serde::Deserialize;

/// CLI configuration: an optional file layered under `RISKDOC_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub report: ReportOptions,
    /// Where `render` writes when `--out-dir` is not given.
    pub output_dir: PathBuf,
    /// Directory searched for document ids when `--docs-dir` is not given.
    pub documents_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            report: ReportOptions::default(),
            output_dir: PathBuf::from("."),
            documents_dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    pub const ENV_PREFIX: &'static str = "RISKDOC";

    /// Load settings; a missing file is not an error, a malformed one is.
    ///
    /// Nested keys use `__` in variable names, e.g. `RISKDOC_REPORT__ARTIFACT_KIND`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(Self::ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );
        let config = builder.build().with_context(|| match path {
            Some(path) => format!("failed to read configuration from {}", path.display()),
            None => "failed to read configuration from environment".to_string(),
        })?;
        config
            .try_deserialize()
            .context("invalid configuration values")
    }
}
