use std::path::PathBuf;

use chrono::{NaiveDate, TimeZone, Utc};
use lopdf::content::Content;
use riskdoc_core::document::{CellStyle, Node, Table};
use riskdoc_core::{
    aggregate, build, Band, Document, FileDocumentRepository, Hazard, OutputFormat, Organization,
    ReportCompiler, ReportError, ReportModel, ReportOptions, Unit, ValidationError,
};

fn generated_on() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn acme(units: Vec<Unit>) -> Document {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut document = Document::new(Organization::new("Acme Corp"), "v1.0", created);
    document.units = units;
    document
}

fn model_of(document: &Document) -> ReportModel {
    build(document, &aggregate(document), &ReportOptions::default())
}

/// Tables found anywhere in the tree, in document order.
fn tables(model: &ReportModel) -> Vec<&Table> {
    fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a Table>) {
        for node in nodes {
            match node {
                Node::Section(section) => walk(&section.children, out),
                Node::Table(table) => out.push(table),
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    walk(&model.nodes, &mut out);
    out
}

/// Text runs shown on every page of a PDF, one per line.
fn pdf_text(bytes: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let mut runs = Vec::new();
    for page_id in doc.get_pages().into_values() {
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        for op in content.operations.iter().filter(|op| op.operator == "Tj") {
            let raw = op.operands[0].as_str().unwrap();
            runs.push(raw.iter().map(|byte| char::from(*byte)).collect::<String>());
        }
    }
    runs.join("\n")
}

fn row_texts(table: &Table, idx: usize) -> Vec<&str> {
    table.rows[idx].iter().map(|cell| cell.text.as_str()).collect()
}

#[test]
fn single_important_hazard_without_mitigations() {
    let document = acme(vec![
        Unit::new("Workshop").with_hazard(Hazard::new("Noise", "Stamping press", 3, 3))
    ]);
    let model = model_of(&document);
    let text = model.text_lines();

    assert!(text.contains(&"Criticality 9 — Important"));
    assert!(!text.contains(&"Prevention measures:"));

    let summary = tables(&model)
        .into_iter()
        .find(|table| table.rows.first().is_some_and(|row| row[0].text == "Risk level"))
        .expect("summary table present");
    assert_eq!(row_texts(summary, 2), vec!["Important risks", "1", "100.0%"]);
    assert_eq!(row_texts(summary, 5), vec!["Total", "1", "100%"]);

    let banner = tables(&model)
        .into_iter()
        .find(|table| table.rows[0][0].text == "Hazard #1")
        .expect("hazard banner present");
    assert!(banner.rows[0]
        .iter()
        .all(|cell| cell.style == CellStyle::Band(Band::Important)));
}

#[test]
fn two_bands_split_the_summary_evenly() {
    let document = acme(vec![Unit::new("Workshop")
        .with_hazard(Hazard::new("Mechanical", "Conveyor", 4, 4))
        .with_hazard(Hazard::new("Lighting", "Dim corridor", 1, 1))]);
    let model = model_of(&document);
    let summary = tables(&model)
        .into_iter()
        .find(|table| table.rows.first().is_some_and(|row| row[0].text == "Risk level"))
        .unwrap();

    assert_eq!(row_texts(summary, 1), vec!["Critical risks", "1", "50.0%"]);
    assert_eq!(row_texts(summary, 2), vec!["Important risks", "0", "0.0%"]);
    assert_eq!(row_texts(summary, 3), vec!["Moderate risks", "0", "0.0%"]);
    assert_eq!(row_texts(summary, 4), vec!["Acceptable risks", "1", "50.0%"]);
    assert_eq!(row_texts(summary, 5), vec!["Total", "2", "100%"]);
}

#[test]
fn empty_document_still_has_all_sections() {
    let model = model_of(&acme(Vec::new()));
    assert_eq!(
        model.section_titles(),
        vec![
            "1. GENERAL INFORMATION",
            "2. RISK SUMMARY",
            "3. DETAILED RISK ASSESSMENT"
        ]
    );
    assert!(model.text_lines().contains(&"0%"));
    assert!(!model.text_lines().contains(&"Breakdown by work unit:"));
}

#[test]
fn missing_location_is_omitted_in_every_encoding() {
    let document = acme(vec![Unit::new("Office")
        .with_description("Open space")
        .with_hazard(Hazard::new("Screen work", "Long hours", 1, 2))]);
    let model = model_of(&document);
    assert!(!model.text_lines().iter().any(|line| line.starts_with("Location:")));

    let compiler = ReportCompiler::new();
    for format in [OutputFormat::Paginated, OutputFormat::Flowing] {
        let report = compiler.compile(&document, format, generated_on()).unwrap();
        let body = match format {
            OutputFormat::Paginated => pdf_text(&report.bytes),
            OutputFormat::Flowing => String::from_utf8(report.bytes).unwrap(),
        };
        assert!(!body.contains("Location:"), "{format} output mentions a location");
        assert!(
            body.contains("Description: Open space"),
            "{format} output lost the description"
        );
    }
}

#[test]
fn both_encodings_render_the_same_model() {
    let document = FileDocumentRepository::load_path(
        &PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/acme.json"),
    )
    .unwrap();
    let compiler = ReportCompiler::new();
    let first = compiler.build_model(&document).unwrap();
    let second = compiler.build_model(&document).unwrap();
    assert_eq!(first, second);

    let pdf = compiler
        .compile(&document, OutputFormat::Paginated, generated_on())
        .unwrap();
    let flow = compiler
        .compile(&document, OutputFormat::Flowing, generated_on())
        .unwrap();
    assert_eq!(pdf.filename, "DUERP_Acme_Corp_v1.0_20240315.pdf");
    assert_eq!(flow.filename, "DUERP_Acme_Corp_v1.0_20240315.xml");
    assert!(pdf.bytes.starts_with(b"%PDF-1.4"));
    let pdf_body = pdf_text(&pdf.bytes);
    assert!(pdf_body.contains("3. DETAILED RISK ASSESSMENT"));

    let xml = String::from_utf8(flow.bytes).unwrap();
    for line in first.text_lines() {
        if line.is_empty() || line.contains(['&', '<', '\'', '"']) {
            continue;
        }
        assert!(xml.contains(line), "flowing output is missing `{line}`");
    }
}

#[test]
fn compiling_twice_gives_identical_bytes() {
    let document = acme(vec![
        Unit::new("Workshop").with_hazard(Hazard::new("Noise", "Press", 2, 3))
    ]);
    let compiler = ReportCompiler::new();
    for format in [OutputFormat::Paginated, OutputFormat::Flowing] {
        let first = compiler.compile(&document, format, generated_on()).unwrap();
        let second = compiler.compile(&document, format, generated_on()).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn invalid_documents_are_rejected_before_rendering() {
    let mut document = acme(vec![Unit::new("Workshop")]);
    document.organization.name = "  ".into();
    let err = ReportCompiler::new()
        .compile(&document, OutputFormat::Flowing, generated_on())
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Validation(ValidationError::MissingOrganizationName)
    ));

    let mut document = acme(vec![Unit::new("Workshop")]);
    let mut hazard = Hazard::new("Noise", "Press", 2, 2);
    hazard.set_severity(7);
    document.units[0].hazards.push(hazard);
    let err = ReportCompiler::new()
        .compile(&document, OutputFormat::Paginated, generated_on())
        .unwrap_err();
    assert!(matches!(
        err,
        ReportError::Validation(ValidationError::UnassessedHazard { .. })
    ));
}
