use serde::{Deserialize, Serialize};

const DEFAULT_REGULATORY_CONTEXT: &str = "The single occupational risk assessment document \
is a legal obligation for every employer with at least one employee (French Labour Code, \
articles L4121-1 to L4121-5 and R4121-1 to R4121-4). It records every risk to the health \
and safety of workers together with the resulting prevention and protection actions.";

/// Locale-dependent prose and naming used while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub title: String,
    pub subtitle: String,
    /// Legal citation paragraph of the general information section.
    pub regulatory_context: String,
    /// Leading component of suggested filenames.
    pub artifact_kind: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "SINGLE DOCUMENT".into(),
            subtitle: "OCCUPATIONAL RISK ASSESSMENT".into(),
            regulatory_context: DEFAULT_REGULATORY_CONTEXT.into(),
            artifact_kind: "DUERP".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overrides_keep_defaults() {
        let options: ReportOptions =
            serde_json::from_str(r#"{"artifact_kind": "RISK"}"#).unwrap();
        assert_eq!(options.artifact_kind, "RISK");
        assert_eq!(options.title, ReportOptions::default().title);
        assert!(options.regulatory_context.contains("L4121-1"));
    }
}
