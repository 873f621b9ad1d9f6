pub mod compiler;
pub mod document;
pub mod error;
pub mod model;
pub mod render;
pub mod repository;
pub mod scoring;
pub mod stats;
pub mod summary;

pub use compiler::{suggested_filename, CompiledReport, ReportCompiler};
pub use document::{build, ReportModel, ReportOptions};
pub use error::{ReportError, ValidationError};
pub use model::{
    AuditEntry, AuditLog, ChangeKind, Document, Hazard, LifecycleStatus, Mitigation,
    MitigationStatus, Organization, Unit,
};
pub use render::{render, Backend, OutputFormat, Renderer};
pub use repository::{DocumentRepository, FileDocumentRepository};
pub use scoring::{classify, Assessment, Band, BandTable, ScoreClassifier, ScoreError};
pub use stats::{aggregate, DocumentStats, UnitStats};
pub use summary::{render_stats, StatsFormat};
