use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../riskdoc-core/tests/fixtures")
}

fn fixture() -> PathBuf {
    fixtures_dir().join("acme.json")
}

fn riskdoc() -> Command {
    let mut cmd = Command::cargo_bin("riskdoc").unwrap();
    cmd.env_remove("RISKDOC_REPORT__ARTIFACT_KIND")
        .env_remove("RISKDOC_OUTPUT_DIR")
        .env_remove("RISKDOC_DOCUMENTS_DIR")
        .env("RUST_LOG", "error");
    cmd
}

#[test]
fn classify_prints_criticality_and_band() {
    riskdoc()
        .args(["classify", "--severity", "3", "--probability", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Criticality: 9"))
        .stdout(predicate::str::contains("Important"));
}

#[test]
fn classify_rejects_out_of_range_scores() {
    riskdoc()
        .args(["classify", "-s", "5", "-p", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("severity"));
}

#[test]
fn stats_prints_human_summary() {
    riskdoc()
        .arg("stats")
        .arg(fixture())
        .assert()
        .success()
        .stdout(predicate::str::contains("Hazards: 4"))
        .stdout(predicate::str::contains("Critical"));
}

#[test]
fn stats_emits_json() {
    let output = riskdoc()
        .args(["stats", "--json"])
        .arg(fixture())
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_hazards"], 4);
}

#[test]
fn list_shows_document_ids() {
    riskdoc()
        .arg("list")
        .arg("--docs-dir")
        .arg(fixtures_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme"));
}

#[test]
fn stats_resolves_document_ids_in_docs_dir() {
    riskdoc()
        .args(["stats", "acme", "--docs-dir"])
        .arg(fixtures_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Hazards: 4"));
}

#[test]
fn unknown_document_id_names_the_directory() {
    let docs = tempfile::tempdir().unwrap();
    riskdoc()
        .args(["stats", "ghost", "--docs-dir"])
        .arg(docs.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("document `ghost` not found"));
}

#[test]
fn render_writes_report_with_suggested_filename() {
    let out = tempfile::tempdir().unwrap();
    riskdoc()
        .arg("render")
        .arg(fixture())
        .args(["--format", "pdf", "--date", "2024-03-15", "--out-dir"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("DUERP_Acme_Corp_v1.0_20240315.pdf"));
    let bytes = std::fs::read(out.path().join("DUERP_Acme_Corp_v1.0_20240315.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[test]
fn render_uses_artifact_kind_from_config_file() {
    let out = tempfile::tempdir().unwrap();
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write(
        file.path(),
        format!(
            "output_dir = {:?}\n[report]\nartifact_kind = \"RISK\"\n",
            out.path().display().to_string()
        ),
    )
    .unwrap();

    riskdoc()
        .arg("--config")
        .arg(file.path())
        .arg("render")
        .arg(fixture())
        .args(["--format", "flowing", "--date", "2024-03-15"])
        .assert()
        .success()
        .stdout(predicate::str::contains("RISK_Acme_Corp_v1.0_20240315.xml"));
    assert!(out.path().join("RISK_Acme_Corp_v1.0_20240315.xml").is_file());
}

#[test]
fn render_rejects_unknown_format() {
    let out = tempfile::tempdir().unwrap();
    riskdoc()
        .arg("render")
        .arg(fixture())
        .args(["--format", "odt", "--out-dir"])
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format `odt`"));
}

#[test]
fn render_refuses_invalid_documents() {
    let out = tempfile::tempdir().unwrap();
    let doc = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write(
        doc.path(),
        r#"{"organization": {"name": " "}, "version": "v1",
            "created_at": "2024-03-01T09:00:00Z", "updated_at": "2024-03-01T09:00:00Z"}"#,
    )
    .unwrap();
    riskdoc()
        .arg("render")
        .arg(doc.path())
        .arg("--out-dir")
        .arg(out.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("organization name must not be blank"));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}
