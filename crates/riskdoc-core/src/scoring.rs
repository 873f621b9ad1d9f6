use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest accepted value for severity and probability.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted value for severity and probability.
pub const MAX_SCORE: u8 = 4;
/// Highest reachable criticality (`MAX_SCORE * MAX_SCORE`).
pub const MAX_CRITICALITY: u8 = MAX_SCORE * MAX_SCORE;

/// Classification buckets for a hazard's criticality, ordered by ascending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Acceptable,
    Moderate,
    Important,
    Critical,
}

impl Band {
    /// Ascending severity order, the order used for accumulation.
    pub const ASCENDING: [Band; 4] = [
        Band::Acceptable,
        Band::Moderate,
        Band::Important,
        Band::Critical,
    ];

    /// Descending severity order, the order used by the summary table.
    pub const DESCENDING: [Band; 4] = [
        Band::Critical,
        Band::Important,
        Band::Moderate,
        Band::Acceptable,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Band::Acceptable => "Acceptable",
            Band::Moderate => "Moderate",
            Band::Important => "Important",
            Band::Critical => "Critical",
        }
    }

    /// Expected follow-up for hazards in this band.
    pub fn guidance(self) -> &'static str {
        match self {
            Band::Acceptable => "low risk, routine monitoring",
            Band::Moderate => "moderate risk, preventive actions to plan",
            Band::Important => "significant risk, priority preventive actions",
            Band::Critical => "critical risk, immediate action required",
        }
    }

    /// Whether the band counts toward the "critical or important" unit figure.
    pub fn is_elevated(self) -> bool {
        matches!(self, Band::Important | Band::Critical)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived state of a hazard: criticality and the band it falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub criticality: u8,
    pub band: Band,
}

/// Errors emitted while scoring or while validating band tables.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreError {
    #[error("{field} must be within 1..=4 (got {value})")]
    OutOfRange { field: ScoreField, value: u8 },
    #[error("{missing} is unset while {present} is set")]
    Incomplete {
        missing: ScoreField,
        present: ScoreField,
    },
    #[error("severity and probability are both unset")]
    Unscored,
    #[error("band table must not be empty")]
    EmptyTable,
    #[error("band table thresholds must strictly increase (got {previous} then {next})")]
    UnorderedThreshold { previous: u8, next: u8 },
    #[error("band table bands must strictly increase in severity ({previous} then {next})")]
    UnorderedBand { previous: Band, next: Band },
    #[error("band table must cover criticality 16 (last threshold is {last})")]
    Uncovered { last: u8 },
}

/// Which of the two ordinal inputs an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreField {
    Severity,
    Probability,
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreField::Severity => f.write_str("severity"),
            ScoreField::Probability => f.write_str("probability"),
        }
    }
}

/// A single `(max_criticality, band)` row of a band table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub max_criticality: u8,
    pub band: Band,
}

/// Ordered thresholds mapping criticality onto bands.
///
/// A criticality belongs to the first row whose `max_criticality` is greater
/// than or equal to it. The standard table is `<=2`, `<=6`, `<=12`, `<=16`,
/// which makes 7 Important and 13 Critical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandTable {
    thresholds: Vec<Threshold>,
}

impl BandTable {
    /// Construct a table, validating ordering and coverage before returning.
    pub fn new(thresholds: Vec<Threshold>) -> Result<Self, ScoreError> {
        let table = Self { thresholds };
        table.validate()?;
        Ok(table)
    }

    /// The table used for every hazard and quoted by the methodology section.
    pub fn standard() -> Self {
        Self {
            thresholds: vec![
                Threshold {
                    max_criticality: 2,
                    band: Band::Acceptable,
                },
                Threshold {
                    max_criticality: 6,
                    band: Band::Moderate,
                },
                Threshold {
                    max_criticality: 12,
                    band: Band::Important,
                },
                Threshold {
                    max_criticality: MAX_CRITICALITY,
                    band: Band::Critical,
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        let last = self.thresholds.last().ok_or(ScoreError::EmptyTable)?;
        for pair in self.thresholds.windows(2) {
            if pair[1].max_criticality <= pair[0].max_criticality {
                return Err(ScoreError::UnorderedThreshold {
                    previous: pair[0].max_criticality,
                    next: pair[1].max_criticality,
                });
            }
            if pair[1].band <= pair[0].band {
                return Err(ScoreError::UnorderedBand {
                    previous: pair[0].band,
                    next: pair[1].band,
                });
            }
        }
        if last.max_criticality < MAX_CRITICALITY {
            return Err(ScoreError::Uncovered {
                last: last.max_criticality,
            });
        }
        Ok(())
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Map a criticality onto its band, `None` when it is above every threshold.
    pub fn band_for(&self, criticality: u8) -> Option<Band> {
        self.thresholds
            .iter()
            .find(|row| criticality <= row.max_criticality)
            .map(|row| row.band)
    }

    /// Closed criticality interval `(low, high)` covered by each row, in table order.
    pub fn ranges(&self) -> Vec<(u8, u8, Band)> {
        let mut low = 1;
        let mut out = Vec::with_capacity(self.thresholds.len());
        for row in &self.thresholds {
            out.push((low, row.max_criticality.min(MAX_CRITICALITY), row.band));
            low = row.max_criticality.saturating_add(1);
        }
        out
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for BandTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            thresholds: Vec<Threshold>,
        }
        let raw = Raw::deserialize(deserializer)?;
        BandTable::new(raw.thresholds).map_err(serde::de::Error::custom)
    }
}

/// Pure classifier turning `(severity, probability)` into an [`Assessment`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreClassifier {
    table: BandTable,
}

impl ScoreClassifier {
    pub fn new(table: BandTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BandTable {
        &self.table
    }

    pub fn classify(&self, severity: u8, probability: u8) -> Result<Assessment, ScoreError> {
        check_range(ScoreField::Severity, severity)?;
        check_range(ScoreField::Probability, probability)?;
        let criticality = severity * probability;
        let band = self
            .table
            .band_for(criticality)
            .ok_or(ScoreError::Uncovered { last: criticality })?;
        Ok(Assessment { criticality, band })
    }

    /// Classify inputs that may be partially unset.
    pub fn classify_partial(
        &self,
        severity: Option<u8>,
        probability: Option<u8>,
    ) -> Result<Assessment, ScoreError> {
        match (severity, probability) {
            (Some(s), Some(p)) => self.classify(s, p),
            (None, Some(_)) => Err(ScoreError::Incomplete {
                missing: ScoreField::Severity,
                present: ScoreField::Probability,
            }),
            (Some(_), None) => Err(ScoreError::Incomplete {
                missing: ScoreField::Probability,
                present: ScoreField::Severity,
            }),
            (None, None) => Err(ScoreError::Unscored),
        }
    }
}

/// Classify with the standard band table.
pub fn classify(severity: u8, probability: u8) -> Result<Assessment, ScoreError> {
    ScoreClassifier::default().classify(severity, probability)
}

fn check_range(field: ScoreField, value: u8) -> Result<(), ScoreError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(())
    } else {
        Err(ScoreError::OutOfRange { field, value })
    }
}
