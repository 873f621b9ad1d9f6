//! Entity graph handed to the compiler: document, work units, hazards and
//! mitigation actions. Every collection keeps the order it was given in.

pub mod audit;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::scoring::{Assessment, Band, ScoreClassifier, ScoreError};
use crate::stats;

pub use audit::{AuditEntry, AuditError, AuditLog, AuditSnapshot, ChangeKind};

/// Lifecycle of a document; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    #[serde(alias = "brouillon")]
    Draft,
    #[serde(alias = "validé", alias = "valide")]
    Validated,
    #[serde(alias = "archivé", alias = "archive")]
    Archived,
}

impl LifecycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Draft => "draft",
            LifecycleStatus::Validated => "validated",
            LifecycleStatus::Archived => "archived",
        }
    }

    /// Only draft -> validated and validated -> archived are allowed.
    pub fn can_transition_to(self, next: LifecycleStatus) -> bool {
        matches!(
            (self, next),
            (LifecycleStatus::Draft, LifecycleStatus::Validated)
                | (LifecycleStatus::Validated, LifecycleStatus::Archived)
        )
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("cannot move document from {from} to {to}")]
    IllegalTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Implementation status of a mitigation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MitigationStatus {
    #[default]
    #[serde(alias = "planifié", alias = "planifie")]
    Planned,
    #[serde(alias = "en_cours")]
    InProgress,
    #[serde(alias = "réalisé", alias = "realise")]
    Completed,
}

impl MitigationStatus {
    pub const ALL: [MitigationStatus; 3] = [
        MitigationStatus::Planned,
        MitigationStatus::InProgress,
        MitigationStatus::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MitigationStatus::Planned => "planned",
            MitigationStatus::InProgress => "in progress",
            MitigationStatus::Completed => "completed",
        }
    }
}

/// Identity of the assessed organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headcount: Option<u32>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registration_id: None,
            address: None,
            activity: None,
            headcount: None,
        }
    }
}

/// Root of the entity graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub organization: Organization,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review: Option<NaiveDate>,
    /// Person responsible for the assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    /// Person responsible for validating the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub audit_log: AuditLog,
}

impl Document {
    pub fn new(
        organization: Organization,
        version: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            organization,
            version: version.into(),
            created_at,
            updated_at: created_at,
            next_review: None,
            evaluator: None,
            approver: None,
            status: LifecycleStatus::Draft,
            units: Vec::new(),
            audit_log: AuditLog::new(),
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Into<String>) -> Self {
        self.evaluator = Some(evaluator.into());
        self
    }

    pub fn hazards(&self) -> impl Iterator<Item = &Hazard> {
        self.units.iter().flat_map(|unit| unit.hazards.iter())
    }

    /// Check everything the report needs before any rendering work starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.organization.name.trim().is_empty() {
            return Err(ValidationError::MissingOrganizationName);
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::MissingVersion);
        }
        for (unit_idx, unit) in self.units.iter().enumerate() {
            if unit.name.trim().is_empty() {
                return Err(ValidationError::MissingUnitName {
                    position: unit_idx + 1,
                });
            }
            for (idx, hazard) in unit.hazards.iter().enumerate() {
                if hazard.category.trim().is_empty() {
                    return Err(ValidationError::MissingCategory {
                        unit: unit.name.clone(),
                        sequence: idx + 1,
                    });
                }
                if let Some(source) = hazard.assessment_error() {
                    return Err(ValidationError::UnassessedHazard {
                        unit: unit.name.clone(),
                        sequence: idx + 1,
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Counters written into audit entries.
    pub fn snapshot(&self) -> AuditSnapshot {
        let stats = stats::aggregate(self);
        AuditSnapshot {
            total_hazards: stats.total_hazards,
            critical_hazards: stats.band_count(Band::Critical),
            mitigations: stats.mitigation_count,
        }
    }

    /// Append a history entry carrying a fresh snapshot of the counters.
    pub fn record_assessment(
        &mut self,
        change: ChangeKind,
        description: Option<String>,
        evaluator: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        let entry = AuditEntry {
            at,
            version: self.version.clone(),
            change,
            description,
            evaluator,
            snapshot: self.snapshot(),
        };
        self.audit_log.append(entry)?;
        self.updated_at = at;
        Ok(())
    }

    /// Move the document forward in its lifecycle and record the change.
    pub fn transition(
        &mut self,
        to: LifecycleStatus,
        evaluator: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(to) {
            return Err(LifecycleError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        let (change, description) = match to {
            LifecycleStatus::Validated => (ChangeKind::Validation, "Document validated"),
            _ => (ChangeKind::Update, "Document archived"),
        };
        let evaluator = evaluator.or_else(|| self.approver.clone());
        self.record_assessment(change, Some(description.to_string()), evaluator, at)?;
        self.status = to;
        Ok(())
    }
}

/// Organizational subdivision grouping related hazards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default)]
    pub hazards: Vec<Hazard>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            location: None,
            employee_count: None,
            hazards: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_employee_count(mut self, count: u32) -> Self {
        self.employee_count = Some(count);
        self
    }

    pub fn with_hazard(mut self, hazard: Hazard) -> Self {
        self.hazards.push(hazard);
        self
    }
}

/// A single identified workplace risk.
///
/// Criticality and band are recomputed whenever severity or probability
/// change, and are absent whenever either input is unset or out of range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HazardRecord")]
pub struct Hazard {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger_situation: Option<String>,
    severity: Option<u8>,
    probability: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposed_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposed_population: Option<String>,
    pub mitigations: Vec<Mitigation>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    assessment: Option<Assessment>,
}

impl Hazard {
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        severity: u8,
        probability: u8,
    ) -> Self {
        let mut hazard = Self::unscored(category, description);
        hazard.set_scores(Some(severity), Some(probability));
        hazard
    }

    /// A hazard whose severity and probability have not been rated yet.
    pub fn unscored(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: None,
            description: description.into(),
            danger_situation: None,
            severity: None,
            probability: None,
            exposure_frequency: None,
            exposed_count: None,
            exposed_population: None,
            mitigations: Vec::new(),
            assessment: None,
        }
    }

    pub fn severity(&self) -> Option<u8> {
        self.severity
    }

    pub fn probability(&self) -> Option<u8> {
        self.probability
    }

    pub fn assessment(&self) -> Option<Assessment> {
        self.assessment
    }

    pub fn criticality(&self) -> Option<u8> {
        self.assessment.map(|a| a.criticality)
    }

    pub fn band(&self) -> Option<Band> {
        self.assessment.map(|a| a.band)
    }

    pub fn set_severity(&mut self, severity: u8) {
        self.set_scores(Some(severity), self.probability);
    }

    pub fn set_probability(&mut self, probability: u8) {
        self.set_scores(self.severity, Some(probability));
    }

    pub fn set_scores(&mut self, severity: Option<u8>, probability: Option<u8>) {
        self.severity = severity;
        self.probability = probability;
        self.assessment = ScoreClassifier::default()
            .classify_partial(severity, probability)
            .ok();
    }

    /// Why the hazard carries no assessment, if it carries none.
    pub fn assessment_error(&self) -> Option<ScoreError> {
        ScoreClassifier::default()
            .classify_partial(self.severity, self.probability)
            .err()
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_danger_situation(mut self, situation: impl Into<String>) -> Self {
        self.danger_situation = Some(situation.into());
        self
    }

    pub fn with_exposure_frequency(mut self, frequency: impl Into<String>) -> Self {
        self.exposure_frequency = Some(frequency.into());
        self
    }

    pub fn with_exposed(mut self, count: u32, population: Option<String>) -> Self {
        self.exposed_count = Some(count);
        self.exposed_population = population;
        self
    }

    pub fn with_mitigation(mut self, mitigation: Mitigation) -> Self {
        self.mitigations.push(mitigation);
        self
    }
}

#[derive(Deserialize)]
struct HazardRecord {
    category: String,
    subcategory: Option<String>,
    description: String,
    danger_situation: Option<String>,
    severity: Option<u8>,
    probability: Option<u8>,
    exposure_frequency: Option<String>,
    exposed_count: Option<u32>,
    exposed_population: Option<String>,
    #[serde(default)]
    mitigations: Vec<Mitigation>,
}

impl From<HazardRecord> for Hazard {
    fn from(record: HazardRecord) -> Self {
        let mut hazard = Hazard {
            category: record.category,
            subcategory: record.subcategory,
            description: record.description,
            danger_situation: record.danger_situation,
            severity: None,
            probability: None,
            exposure_frequency: record.exposure_frequency,
            exposed_count: record.exposed_count,
            exposed_population: record.exposed_population,
            mitigations: record.mitigations,
            assessment: None,
        };
        hazard.set_scores(record.severity, record.probability);
        hazard
    }
}

/// Action reducing a hazard's risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mitigation {
    /// Free text, conventionally elimination, substitution, collective
    /// protection, organizational or personal protection.
    pub kind: String,
    /// Position in the prevention hierarchy, 1 (most effective) to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy_level: Option<u8>,
    pub description: String,
    #[serde(default)]
    pub status: MitigationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implemented_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficacy: Option<String>,
}

impl Mitigation {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            hierarchy_level: None,
            description: description.into(),
            status: MitigationStatus::Planned,
            implemented_on: None,
            due_on: None,
            responsible: None,
            estimated_cost: None,
            efficacy: None,
        }
    }

    pub fn with_status(mut self, status: MitigationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn with_hierarchy_level(mut self, level: u8) -> Self {
        self.hierarchy_level = Some(level);
        self
    }

    pub fn with_due_on(mut self, due_on: NaiveDate) -> Self {
        self.due_on = Some(due_on);
        self
    }
}
