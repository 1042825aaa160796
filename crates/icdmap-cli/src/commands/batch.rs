//! Batch processing command for multiple PDF files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use icdmap_core::extraction::{summarize, DocumentProcessor};
use icdmap_core::models::document::{DocumentSummary, ExtractionResult};

use super::process::{format_results, OutputFormat};
use super::{load_validated_config, PatternArgs};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input glob pattern, e.g. "charts/*.pdf"
    #[arg(required = true)]
    input: String,

    /// Output directory (default: configured output_dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(flatten)]
    pattern: PatternArgs,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    summary: Option<DocumentSummary>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_validated_config(config_path, &args.pattern)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output.output_dir.clone());
    fs::create_dir_all(&output_dir)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let stems = output_stems(&files);
    let processor = Arc::new(DocumentProcessor::from_config(&config)?);
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let processor = Arc::clone(&processor);
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let file_start = Instant::now();
            let task_path = path.clone();
            let outcome =
                tokio::task::spawn_blocking(move || processor.process_file(&task_path)).await?;
            let elapsed = file_start.elapsed().as_millis() as u64;
            anyhow::Ok((path, outcome, elapsed))
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (handle, stem) in handles.into_iter().zip(&stems) {
        let (path, outcome, processing_time_ms) = handle.await??;
        overall_pb.inc(1);

        match outcome {
            Ok(pages) => {
                let output_path = write_output(&output_dir, stem, &pages, args.format, config.output.pretty)?;
                debug!("Wrote output to {}", output_path.display());
                results.push(FileResult {
                    path,
                    summary: Some(summarize(&pages)),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        summary: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }
    }

    overall_pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// One output file stem per input, in input order.
///
/// Inputs from different directories can share a stem; later ones get a
/// `-2`, `-3`, ... suffix so no output overwrites another.
fn output_stems(files: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();

    files
        .iter()
        .map(|path| {
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
            let mut candidate = stem.to_string();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}-{}", stem, n);
                n += 1;
            }
            if candidate != stem {
                warn!("{} shares its name with another input, writing it as {}", path.display(), candidate);
            }
            candidate
        })
        .collect()
}

fn write_output(
    output_dir: &Path,
    stem: &str,
    pages: &[ExtractionResult],
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<PathBuf> {
    let extension = match format {
        OutputFormat::Json => "json",
        OutputFormat::Csv => "csv",
        OutputFormat::Text => "txt",
    };

    let output_path = output_dir.join(format!("{}.{}", stem, extension));
    fs::write(&output_path, format_results(pages, format, pretty)?)?;
    Ok(output_path)
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "pages",
        "failed_pages",
        "occurrences",
        "distinct_codes",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let record = match &result.summary {
            Some(summary) => [
                filename,
                "success".to_string(),
                summary.page_count.to_string(),
                summary
                    .failed_pages
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
                summary.occurrence_count.to_string(),
                summary.distinct_codes.join(" "),
                result.processing_time_ms.to_string(),
                String::new(),
            ],
            None => [
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                result.processing_time_ms.to_string(),
                result.error.clone().unwrap_or_default(),
            ],
        };
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let results = vec![
            FileResult {
                path: PathBuf::from("charts/a.pdf"),
                summary: Some(DocumentSummary {
                    page_count: 3,
                    failed_pages: vec![2],
                    occurrence_count: 4,
                    distinct_codes: vec!["E11.29".to_string(), "I10".to_string()],
                }),
                error: None,
                processing_time_ms: 12,
            },
            FileResult {
                path: PathBuf::from("charts/b.pdf"),
                summary: None,
                error: Some("PDF is encrypted".to_string()),
                processing_time_ms: 1,
            },
        ];

        write_summary(&path, &results).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "a.pdf,success,3,2,4,E11.29 I10,12,");
        assert_eq!(lines[2], "b.pdf,error,,,,,1,PDF is encrypted");
    }

    #[test]
    fn test_write_output_uses_stem() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![ExtractionResult::failed(1, "bad page")];
        let path = write_output(dir.path(), "chart", &pages, OutputFormat::Json, false).unwrap();
        assert_eq!(path, dir.path().join("chart.json"));
        assert!(fs::read_to_string(path).unwrap().contains("bad page"));
    }

    #[test]
    fn test_output_stems_disambiguate_clashes() {
        let files = vec![
            PathBuf::from("north/chart.pdf"),
            PathBuf::from("south/chart.pdf"),
            PathBuf::from("south/labs.PDF"),
            PathBuf::from("west/chart.pdf"),
        ];
        assert_eq!(output_stems(&files), vec!["chart", "chart-2", "labs", "chart-3"]);
    }
}
