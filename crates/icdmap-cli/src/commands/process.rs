//! Process command - map the codes of a single file to page coordinates.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use icdmap_core::extraction::{summarize, DocumentProcessor};
use icdmap_core::models::config::IcdmapConfig;
use icdmap_core::models::document::ExtractionResult;
use icdmap_core::pdf::{MemoryDocument, PdfExtractor, PdfProcessor, PdfType};

use super::{load_validated_config, to_json, PatternArgs};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, or pages JSON written by `icdmap words`)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    pattern: PatternArgs,

    /// Print a per-document summary to stderr
    #[arg(long)]
    summary: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per code occurrence
    Csv,
    /// Plain text listing
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_validated_config(config_path, &args.pattern)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let processor = DocumentProcessor::from_config(&config)?;
    let results = match extension.as_str() {
        "pdf" => process_pdf(&args, &config, &processor, &pb)?,
        "json" => {
            pb.set_message("Loading pages...");
            let doc = MemoryDocument::from_file(&args.input)?;
            pb.set_message("Extracting codes...");
            processor.process(&doc)
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    };

    pb.finish_and_clear();

    let output = format_results(&results, args.format, config.output.pretty)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.summary {
        let summary = summarize(&results);
        eprintln!(
            "{} {} pages, {} occurrences of {} distinct codes",
            style("ℹ").blue(),
            summary.page_count,
            summary.occurrence_count,
            summary.distinct_codes.len()
        );
        if !summary.failed_pages.is_empty() {
            eprintln!(
                "{} Failed pages: {:?}",
                style("⚠").yellow(),
                summary.failed_pages
            );
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn process_pdf(
    args: &ProcessArgs,
    config: &IcdmapConfig,
    processor: &DocumentProcessor,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<ExtractionResult>> {
    pb.set_message("Loading PDF...");

    let data = fs::read(&args.input)?;
    let mut extractor = PdfExtractor::with_config(&config.pdf);
    extractor.load(&data)?;
    debug!("PDF has {} pages", extractor.page_count());

    pb.set_message("Analyzing PDF...");
    match extractor.analyze() {
        PdfType::Image => {
            warn!("PDF has no text layer; run OCR on it first to find codes")
        }
        PdfType::Empty => warn!("PDF appears to be empty"),
        pdf_type => debug!("PDF type: {:?}", pdf_type),
    }

    pb.set_message("Extracting codes...");
    Ok(processor.process(&extractor))
}

pub fn format_results(
    results: &[ExtractionResult],
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(results, pretty),
        OutputFormat::Csv => format_csv(results),
        OutputFormat::Text => Ok(format_text(results)),
    }
}

fn format_csv(results: &[ExtractionResult]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["page_number", "code", "x0", "x1", "top", "bottom", "error"])?;

    for result in results {
        let page = result.page_number.to_string();
        if let Some(error) = &result.error {
            wtr.write_record([page.as_str(), "", "", "", "", "", error.as_str()])?;
            continue;
        }
        for occurrence in &result.codes {
            let bbox = &occurrence.bbox;
            wtr.write_record([
                page.clone(),
                occurrence.code.clone(),
                bbox.x0.to_string(),
                bbox.x1.to_string(),
                bbox.top.to_string(),
                bbox.bottom.to_string(),
                String::new(),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(results: &[ExtractionResult]) -> String {
    let mut output = String::new();

    for result in results {
        output.push_str(&format!("Page {}:\n", result.page_number));
        if let Some(error) = &result.error {
            output.push_str(&format!("  error: {}\n", error));
        } else if result.codes.is_empty() {
            output.push_str("  (no codes)\n");
        }
        for occurrence in &result.codes {
            let bbox = &occurrence.bbox;
            output.push_str(&format!(
                "  {:<10} x0={:.2} x1={:.2} top={:.2} bottom={:.2}\n",
                occurrence.code, bbox.x0, bbox.x1, bbox.top, bbox.bottom
            ));
        }
    }

    output
}
