use tracing::{debug, instrument};

use super::{Cell, CellStyle, Node, ReportModel, ReportOptions, Section, Table, TextStyle};
use crate::model::{Document, Hazard, Unit};
use crate::scoring::{Band, BandTable, MAX_SCORE};
use crate::stats::DocumentStats;

const DATE_FORMAT: &str = "%d/%m/%Y";
const NOT_AVAILABLE: &str = "N/A";

/// Turn a document and its statistics into the report tree.
///
/// Sections come out as cover, general information, summary and detail,
/// separated by page breaks. No I/O happens here.
#[instrument(name = "build_report_model", skip_all, fields(units = document.units.len()))]
pub fn build(document: &Document, stats: &DocumentStats, options: &ReportOptions) -> ReportModel {
    let nodes = vec![
        Node::Section(cover(document, options)),
        Node::PageBreak,
        Node::Section(general_information(options)),
        Node::PageBreak,
        Node::Section(summary(stats)),
        Node::PageBreak,
        Node::Section(detail(document)),
    ];
    debug!(nodes = nodes.len(), "report model built");
    ReportModel {
        title: format!("{} {} - {}", options.title, options.subtitle, document.organization.name),
        nodes,
    }
}

fn cover(document: &Document, options: &ReportOptions) -> Section {
    let org = &document.organization;
    let mut section = Section::untitled();
    section.push(Node::paragraph(&options.title, TextStyle::Title));
    section.push(Node::paragraph(&options.subtitle, TextStyle::Subtitle));
    section.push(Node::paragraph(&org.name, TextStyle::Title));

    if let Some(id) = &org.registration_id {
        section.push(Node::paragraph(format!("Registration number: {id}"), TextStyle::Body));
    }
    if let Some(address) = &org.address {
        section.push(Node::paragraph(format!("Address: {address}"), TextStyle::Body));
    }
    if let Some(activity) = &org.activity {
        section.push(Node::paragraph(format!("Activity: {activity}"), TextStyle::Body));
    }
    if let Some(headcount) = org.headcount {
        section.push(Node::paragraph(format!("Headcount: {headcount}"), TextStyle::Body));
    }

    let info = Table::new(&[60, 80])
        .pair("Version:", &document.version)
        .pair("Created:", document.created_at.format(DATE_FORMAT).to_string())
        .pair("Last updated:", document.updated_at.format(DATE_FORMAT).to_string())
        .pair(
            "Responsible evaluator:",
            document.evaluator.as_deref().unwrap_or("Not specified"),
        )
        .pair("Status:", document.status.as_str().to_uppercase());
    section.push(Node::Table(info));
    section
}

fn general_information(options: &ReportOptions) -> Section {
    let mut context = Section::titled("Regulatory context");
    context.push(Node::paragraph(&options.regulatory_context, TextStyle::Body));

    let mut section = Section::titled("1. GENERAL INFORMATION");
    section.push(Node::Section(context));
    section.push(Node::Section(methodology(&BandTable::standard())));
    section
}

/// Scoring method as the reader needs it to interpret the detail tables.
fn methodology(table: &BandTable) -> Section {
    let mut section = Section::titled("Assessment methodology");
    section.push(Node::paragraph(
        "Risks were rated with the following scoring method:",
        TextStyle::Body,
    ));
    section.push(Node::paragraph(
        "Criticality = Severity × Probability",
        TextStyle::Strong,
    ));
    section.push(Node::paragraph(
        "Severity (S): 1 = Minor, 2 = Moderate, 3 = Serious, 4 = Very serious",
        TextStyle::Body,
    ));
    section.push(Node::paragraph(
        "Probability (P): 1 = Very unlikely, 2 = Unlikely, 3 = Likely, 4 = Very likely",
        TextStyle::Body,
    ));
    section.push(Node::paragraph("Risk levels:", TextStyle::Strong));
    for (low, high, band) in table.ranges() {
        let range = if low == high {
            low.to_string()
        } else {
            format!("{low}-{high}")
        };
        section.push(Node::paragraph(
            format!("- {} ({range}): {}", band.label(), band.guidance()),
            TextStyle::Body,
        ));
    }
    section
}

fn summary(stats: &DocumentStats) -> Section {
    let mut section = Section::titled("2. RISK SUMMARY");

    let mut bands =
        Table::new(&[80, 30, 30]).styled_row(CellStyle::Header, ["Risk level", "Count", "%"]);
    for band in Band::DESCENDING {
        bands = bands.styled_row(
            CellStyle::Band(band),
            [
                format!("{} risks", band.label()),
                stats.band_count(band).to_string(),
                format!("{:.1}%", stats.band_percentage(band)),
            ],
        );
    }
    let total_share = if stats.total_hazards > 0 { "100%" } else { "0%" };
    bands = bands.styled_row(
        CellStyle::Total,
        [
            "Total".to_string(),
            stats.total_hazards.to_string(),
            total_share.to_string(),
        ],
    );
    section.push(Node::Table(bands));

    if !stats.units.is_empty() {
        section.push(Node::paragraph("Breakdown by work unit:", TextStyle::Body));
        let mut units = Table::new(&[80, 40, 50]).styled_row(
            CellStyle::Header,
            ["Work unit", "Hazards", "Critical/important"],
        );
        for unit in &stats.units {
            units = units.styled_row(
                CellStyle::Body,
                [
                    unit.name.clone(),
                    unit.hazard_count.to_string(),
                    unit.critical_or_important_count.to_string(),
                ],
            );
        }
        section.push(Node::Table(units));
    }
    section
}

fn detail(document: &Document) -> Section {
    let mut section = Section::titled("3. DETAILED RISK ASSESSMENT");
    for unit in &document.units {
        section.push(Node::Section(unit_block(unit)));
        section.push(Node::Rule);
    }
    section
}

fn unit_block(unit: &Unit) -> Section {
    let mut section = Section::titled(format!("Work unit: {}", unit.name));
    if let Some(description) = &unit.description {
        section.push(Node::paragraph(
            format!("Description: {description}"),
            TextStyle::Body,
        ));
    }
    if let Some(location) = &unit.location {
        section.push(Node::paragraph(format!("Location: {location}"), TextStyle::Body));
    }
    if let Some(count) = unit.employee_count {
        section.push(Node::paragraph(format!("Employees: {count}"), TextStyle::Body));
    }

    if unit.hazards.is_empty() {
        section.push(Node::paragraph(
            "No hazard identified for this work unit.",
            TextStyle::Note,
        ));
        return section;
    }
    for (idx, hazard) in unit.hazards.iter().enumerate() {
        hazard_block(&mut section, idx + 1, hazard);
    }
    section
}

fn hazard_block(section: &mut Section, sequence: usize, hazard: &Hazard) {
    let (style, rating) = match hazard.assessment() {
        Some(assessment) => (
            CellStyle::Band(assessment.band),
            format!(
                "Criticality {} — {}",
                assessment.criticality, assessment.band
            ),
        ),
        None => (CellStyle::Body, "Criticality not assessed".to_string()),
    };
    let banner = Table::new(&[30, 70, 70]).styled_row(
        style,
        [
            format!("Hazard #{sequence}"),
            hazard.category.clone(),
            rating,
        ],
    );
    section.push(Node::Table(banner));

    let score = |value: Option<u8>| {
        value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{v}/{MAX_SCORE}"))
    };
    let situation = hazard.danger_situation.as_deref().unwrap_or(NOT_AVAILABLE);
    let frequency = hazard.exposure_frequency.as_deref().unwrap_or(NOT_AVAILABLE);
    let exposed = hazard.exposed_count.unwrap_or(0);
    let exposed = match &hazard.exposed_population {
        Some(population) => format!("{exposed} — {population}"),
        None => exposed.to_string(),
    };
    let details = Table::new(&[50, 120])
        .pair("Description:", &hazard.description)
        .pair("Danger situation:", situation)
        .pair("Severity:", score(hazard.severity()))
        .pair("Probability:", score(hazard.probability()))
        .pair("Exposure frequency:", frequency)
        .pair("Exposed persons:", exposed);
    section.push(Node::Table(details));

    if !hazard.mitigations.is_empty() {
        section.push(Node::paragraph("Prevention measures:", TextStyle::Strong));
        let mut measures = Table::new(&[40, 70, 30, 30]).styled_row(
            CellStyle::Header,
            ["Type", "Description", "Status", "Responsible"],
        );
        for mitigation in &hazard.mitigations {
            measures = measures.row(vec![
                Cell::new(&mitigation.kind, CellStyle::Body),
                Cell::new(&mitigation.description, CellStyle::Body),
                Cell::new(mitigation.status.label(), CellStyle::Body),
                Cell::new(
                    mitigation.responsible.as_deref().unwrap_or(NOT_AVAILABLE),
                    CellStyle::Body,
                ),
            ]);
        }
        section.push(Node::Table(measures));
    }
}
