use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::model::MitigationStatus;
use crate::scoring::Band;
use crate::stats::{CategoryCounts, DocumentStats, UnitStats};

/// Format styles supported by the statistics summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFormat {
    Human,
    Json,
}

/// Produce a statistics summary without generating a document.
pub fn render_stats(stats: &DocumentStats, format: StatsFormat) -> anyhow::Result<String> {
    match format {
        StatsFormat::Human => render_human(stats),
        StatsFormat::Json => Ok(serde_json::to_string_pretty(&JsonStats::from(stats))?),
    }
}

fn render_human(stats: &DocumentStats) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(
        out,
        "Work units: {} • Hazards: {} • Mitigations: {}",
        stats.unit_count, stats.total_hazards, stats.mitigation_count
    )?;
    writeln!(out)?;

    writeln!(out, "Risk levels:")?;
    for band in Band::DESCENDING {
        writeln!(
            out,
            "  - {band:>10}: {count:>3} ({pct:.1}%)",
            band = band.label(),
            count = stats.band_count(band),
            pct = stats.band_percentage(band),
        )?;
    }
    if stats.unclassified_hazards > 0 {
        writeln!(out, "  - {:>10}: {:>3}", "Unrated", stats.unclassified_hazards)?;
    }

    writeln!(out)?;
    writeln!(out, "Mitigations by status:")?;
    for status in MitigationStatus::ALL {
        writeln!(
            out,
            "  - {status:>11}: {count}",
            status = status.label(),
            count = stats.status_count(status)
        )?;
    }

    writeln!(out)?;
    if stats.hazards_by_category.is_empty() {
        writeln!(out, "No hazards identified.")?;
    } else {
        writeln!(out, "Hazards by category:")?;
        for (category, count) in stats.hazards_by_category.iter() {
            writeln!(out, "  - {category}: {count}")?;
        }
    }

    if !stats.units.is_empty() {
        writeln!(out)?;
        writeln!(out, "Work units:")?;
        for unit in &stats.units {
            writeln!(
                out,
                "  - {name}: {hazards} hazard(s), {elevated} critical/important",
                name = unit.name,
                hazards = unit.hazard_count,
                elevated = unit.critical_or_important_count,
            )?;
        }
    }

    Ok(out)
}

#[derive(Debug, Serialize)]
struct JsonStats<'a> {
    unit_count: usize,
    total_hazards: usize,
    hazards_by_band: &'a BTreeMap<Band, usize>,
    band_percentages: BTreeMap<Band, f64>,
    unclassified_hazards: usize,
    mitigation_count: usize,
    mitigations_by_status: &'a BTreeMap<MitigationStatus, usize>,
    hazards_by_category: &'a CategoryCounts,
    units: &'a [UnitStats],
}

impl<'a> From<&'a DocumentStats> for JsonStats<'a> {
    fn from(stats: &'a DocumentStats) -> Self {
        Self {
            unit_count: stats.unit_count,
            total_hazards: stats.total_hazards,
            hazards_by_band: &stats.hazards_by_band,
            band_percentages: Band::ASCENDING
                .iter()
                .map(|band| (*band, stats.band_percentage(*band)))
                .collect(),
            unclassified_hazards: stats.unclassified_hazards,
            mitigation_count: stats.mitigation_count,
            mitigations_by_status: &stats.mitigations_by_status,
            hazards_by_category: &stats.hazards_by_category,
            units: &stats.units,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, Hazard, Organization, Unit};
    use crate::stats::aggregate;
    use chrono::{TimeZone, Utc};

    fn sample_stats() -> DocumentStats {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let document = Document::new(Organization::new("Acme Corp"), "1.0", created).with_unit(
            Unit::new("Workshop")
                .with_hazard(Hazard::new("Mechanical", "Press", 4, 4))
                .with_hazard(Hazard::new("Noise", "Compressor", 1, 1)),
        );
        aggregate(&document)
    }

    #[test]
    fn human_summary_lists_bands_in_descending_severity() {
        let output = render_stats(&sample_stats(), StatsFormat::Human).unwrap();
        let critical = output.find("Critical").expect("critical line");
        let acceptable = output.find("Acceptable").expect("acceptable line");
        assert!(critical < acceptable);
        assert!(output.contains("50.0%"));
        assert!(output.contains("Workshop: 2 hazard(s), 1 critical/important"));
    }

    #[test]
    fn json_summary_serializes() {
        let output = render_stats(&sample_stats(), StatsFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["total_hazards"], 2);
        assert_eq!(value["hazards_by_band"]["critical"], 1);
        assert_eq!(value["band_percentages"]["acceptable"], 50.0);
        assert_eq!(value["mitigations_by_status"]["in_progress"], 0);
        assert_eq!(value["hazards_by_category"]["Noise"], 1);
    }
}
