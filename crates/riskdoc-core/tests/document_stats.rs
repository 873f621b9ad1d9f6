use std::path::PathBuf;

use insta::assert_json_snapshot;
use riskdoc_core::{aggregate, Band, FileDocumentRepository, MitigationStatus};

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn acme_stats_snapshot() {
    let document = FileDocumentRepository::load_path(&fixture_dir().join("acme.json"))
        .unwrap_or_else(|err| panic!("failed to load fixture: {err:#}"));
    let stats = aggregate(&document);
    assert_json_snapshot!("acme_stats", stats);
}

#[test]
fn acme_stats_satisfy_totals() {
    let document = FileDocumentRepository::load_path(&fixture_dir().join("acme.json")).unwrap();
    let stats = aggregate(&document);

    let banded: usize = Band::ASCENDING.iter().map(|band| stats.band_count(*band)).sum();
    assert_eq!(banded + stats.unclassified_hazards, stats.total_hazards);

    let by_status: usize = MitigationStatus::ALL
        .iter()
        .map(|status| stats.status_count(*status))
        .sum();
    assert_eq!(by_status, stats.mitigation_count);

    let per_unit: usize = stats.units.iter().map(|unit| unit.hazard_count).sum();
    assert_eq!(per_unit, stats.total_hazards);
    assert_eq!(stats.band_percentage(Band::Critical), 25.0);
}
