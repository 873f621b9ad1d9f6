mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use riskdoc_core::{
    aggregate, classify, render_stats, Band, Document, DocumentRepository, FileDocumentRepository,
    OutputFormat, ReportCompiler, StatsFormat,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "riskdoc",
    author,
    version,
    about = "Occupational risk assessment report compiler"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); `RISKDOC_*` variables override it
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Directory holding documents referenced by id; defaults to the configured documents_dir
    #[arg(long, value_name = "DIR", global = true)]
    docs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a document into a report
    Render {
        /// Document file (.json, .yaml or .yml) or a document id
        input: String,
        /// Output encoding: paginated (pdf) or flowing (docx)
        #[arg(long, short, default_value = "paginated")]
        format: String,
        /// Directory receiving the report; defaults to the configured output_dir
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
        /// Generation date used in the filename; defaults to today
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Print risk statistics for a document
    Stats {
        /// Document file or a document id
        input: String,
        /// Emit statistics as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Classify a severity/probability pair
    Classify {
        #[arg(long, short)]
        severity: u8,
        #[arg(long, short)]
        probability: u8,
    },
    /// List the document ids found in the documents directory
    List,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let docs_dir = cli.docs_dir.unwrap_or_else(|| settings.documents_dir.clone());
    let repo = FileDocumentRepository::new(docs_dir);
    match cli.command {
        Commands::Render {
            input,
            format,
            out_dir,
            date,
        } => {
            let out_dir = out_dir.unwrap_or_else(|| settings.output_dir.clone());
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let document = load_document(&repo, &input)?;
            render(&settings, &document, &format, &out_dir, date)?
        }
        Commands::Stats { input, json } => stats(&load_document(&repo, &input)?, json)?,
        Commands::Classify {
            severity,
            probability,
        } => classify_pair(severity, probability)?,
        Commands::List => list(&repo)?,
    }
    Ok(())
}

/// Read `input` as a file path when one exists, otherwise as a document id.
fn load_document(repo: &dyn DocumentRepository, input: &str) -> Result<Document> {
    let path = Path::new(input);
    if path.is_file() {
        return FileDocumentRepository::load_path(path);
    }
    repo.load_document(input)
}

fn render(
    settings: &Settings,
    document: &Document,
    format: &str,
    out_dir: &Path,
    date: NaiveDate,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let compiler = ReportCompiler::with_options(settings.report.clone());
    let report = compiler
        .compile(document, format, date)
        .with_context(|| format!("failed to compile {}", document.organization.name))?;

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;
    let path = out_dir.join(&report.filename);
    fs::write(&path, &report.bytes)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), format = %report.format, "report written");
    println!("{}", path.display());
    Ok(())
}

fn stats(document: &Document, json: bool) -> Result<()> {
    let format = if json {
        StatsFormat::Json
    } else {
        StatsFormat::Human
    };
    let output = render_stats(&aggregate(document), format)?;
    println!("{}", output.trim_end());
    Ok(())
}

fn list(repo: &dyn DocumentRepository) -> Result<()> {
    for id in repo.list_documents()? {
        println!("{id}");
    }
    Ok(())
}

fn classify_pair(severity: u8, probability: u8) -> Result<()> {
    let assessment = classify(severity, probability)?;
    println!(
        "Criticality: {} ({})",
        assessment.criticality,
        paint(assessment.band)
    );
    println!("{}", assessment.band.guidance());
    Ok(())
}

fn paint(band: Band) -> ColoredString {
    let label = band.label();
    match band {
        Band::Critical => label.red().bold(),
        Band::Important => label.truecolor(255, 165, 0).bold(),
        Band::Moderate => label.yellow(),
        Band::Acceptable => label.green(),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
