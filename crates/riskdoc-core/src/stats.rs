//! Document- and unit-level statistics derived from hazard classifications.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, instrument};

use crate::model::{Document, MitigationStatus, Unit};
use crate::scoring::Band;

/// Aggregate counters for a whole document.
///
/// Totals law: the band counts plus `unclassified_hazards` equal
/// `total_hazards`. The band counts alone reach the total only when every
/// hazard is assessed, which `Document::validate` requires before rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub unit_count: usize,
    pub total_hazards: usize,
    /// Always holds all four bands, zero-filled.
    pub hazards_by_band: BTreeMap<Band, usize>,
    /// Hazards whose severity or probability is unset or out of range.
    pub unclassified_hazards: usize,
    pub mitigation_count: usize,
    /// Always holds all three statuses, zero-filled.
    pub mitigations_by_status: BTreeMap<MitigationStatus, usize>,
    pub hazards_by_category: CategoryCounts,
    pub units: Vec<UnitStats>,
}

impl DocumentStats {
    pub fn band_count(&self, band: Band) -> usize {
        self.hazards_by_band.get(&band).copied().unwrap_or(0)
    }

    pub fn status_count(&self, status: MitigationStatus) -> usize {
        self.mitigations_by_status
            .get(&status)
            .copied()
            .unwrap_or(0)
    }

    /// Share of hazards in `band`, in percent; 0.0 when there are no hazards.
    pub fn band_percentage(&self, band: Band) -> f64 {
        if self.total_hazards == 0 {
            return 0.0;
        }
        self.band_count(band) as f64 / self.total_hazards as f64 * 100.0
    }
}

/// Per-unit counters shown in the summary section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStats {
    pub name: String,
    pub hazard_count: usize,
    pub critical_or_important_count: usize,
}

/// Hazard counts keyed by category, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryCounts {
    entries: Vec<(String, usize)>,
}

impl CategoryCounts {
    pub fn increment(&mut self, category: &str) {
        match self.entries.iter_mut().find(|(name, _)| name == category) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((category.to_string(), 1)),
        }
    }

    pub fn get(&self, category: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in &self.entries {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Walk the document in stored order and accumulate its statistics.
#[instrument(name = "aggregate_stats", skip(document), fields(units = document.units.len()))]
pub fn aggregate(document: &Document) -> DocumentStats {
    let mut hazards_by_band: BTreeMap<Band, usize> =
        Band::ASCENDING.iter().map(|band| (*band, 0)).collect();
    let mut mitigations_by_status: BTreeMap<MitigationStatus, usize> = MitigationStatus::ALL
        .iter()
        .map(|status| (*status, 0))
        .collect();
    let mut hazards_by_category = CategoryCounts::default();
    let mut total_hazards = 0;
    let mut unclassified_hazards = 0;
    let mut mitigation_count = 0;

    for unit in &document.units {
        for hazard in &unit.hazards {
            total_hazards += 1;
            match hazard.band() {
                Some(band) => *hazards_by_band.entry(band).or_insert(0) += 1,
                None => unclassified_hazards += 1,
            }
            hazards_by_category.increment(&hazard.category);
            for mitigation in &hazard.mitigations {
                mitigation_count += 1;
                *mitigations_by_status.entry(mitigation.status).or_insert(0) += 1;
            }
        }
    }

    let units: Vec<_> = document.units.iter().map(unit_stats).collect();
    debug!(total_hazards, mitigation_count, "aggregation completed");

    DocumentStats {
        unit_count: document.units.len(),
        total_hazards,
        hazards_by_band,
        unclassified_hazards,
        mitigation_count,
        mitigations_by_status,
        hazards_by_category,
        units,
    }
}

pub fn unit_stats(unit: &Unit) -> UnitStats {
    UnitStats {
        name: unit.name.clone(),
        hazard_count: unit.hazards.len(),
        critical_or_important_count: unit
            .hazards
            .iter()
            .filter(|hazard| hazard.band().is_some_and(Band::is_elevated))
            .count(),
    }
}
