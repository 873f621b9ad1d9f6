use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::model::Document;

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Source of documents to compile.
pub trait DocumentRepository {
    /// Load the document stored under `id`.
    fn load_document(&self, id: &str) -> Result<Document>;
    /// Identifiers of every stored document, sorted.
    fn list_documents(&self) -> Result<Vec<String>>;
}

/// Reads documents from `<id>.json`, `<id>.yaml` or `<id>.yml` under a base directory.
pub struct FileDocumentRepository {
    base_path: PathBuf,
}

impl FileDocumentRepository {
    /// Create a repository rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn resolve(&self, id: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.base_path.join(format!("{id}.{ext}")))
            .find(|path| path.is_file())
    }

    /// Parse a single document file, picking the format from its extension.
    pub fn load_path(path: &Path) -> Result<Document> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read document at {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let document: Document = match ext.as_deref() {
            Some("json") => serde_json::from_str(&raw)
                .with_context(|| format!("invalid JSON document at {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid YAML document at {}", path.display()))?,
            _ => {
                return Err(anyhow!(
                    "unsupported document extension for {} (expected .json, .yaml or .yml)",
                    path.display()
                ))
            }
        };
        debug!(path = %path.display(), units = document.units.len(), "document loaded");
        Ok(document)
    }
}

impl DocumentRepository for FileDocumentRepository {
    fn load_document(&self, id: &str) -> Result<Document> {
        let path = self.resolve(id).ok_or_else(|| {
            anyhow!(
                "document `{id}` not found under {}",
                self.base_path.display()
            )
        })?;
        Self::load_path(&path)
    }

    fn list_documents(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_path).with_context(|| {
            format!(
                "failed to list documents in {}",
                self.base_path.display()
            )
        })?;
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let known = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if !known || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
