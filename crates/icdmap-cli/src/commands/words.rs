//! Words command - dump page text and positioned words.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::info;

use icdmap_core::models::document::Page;
use icdmap_core::pdf::{PdfExtractor, PdfProcessor};

use super::{load_config, to_json};

/// Arguments for the words command.
#[derive(Args)]
pub struct WordsArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: WordsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let data = fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut extractor = PdfExtractor::with_config(&config.pdf);
    extractor.load(&data)?;

    let pages = extract_pages(&extractor)?;
    info!(
        "Extracted {} words from {} pages",
        pages.iter().map(|p| p.words.len()).sum::<usize>(),
        pages.len()
    );

    let output = to_json(&pages, config.output.pretty)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!("{} Pages written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn extract_pages<P: PdfProcessor>(source: &P) -> anyhow::Result<Vec<Page>> {
    source
        .page_numbers()
        .into_iter()
        .map(|page_number| {
            let text = source
                .extract_page_text(page_number)
                .with_context(|| format!("page {page_number}: text extraction failed"))?;
            let words = source
                .extract_page_words(page_number)
                .with_context(|| format!("page {page_number}: word extraction failed"))?;
            anyhow::Ok(Page {
                page_number,
                text,
                words,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icdmap_core::models::document::{BoundingBox, Word};
    use icdmap_core::pdf::MemoryDocument;

    #[test]
    fn test_extract_pages_copies_source() {
        let pages = vec![Page {
            page_number: 4,
            text: "ICD-10-CM: I10".to_string(),
            words: vec![Word::new("I10", BoundingBox::new(1.0, 2.0, 3.0, 4.0))],
        }];
        let doc = MemoryDocument::new(pages.clone());
        assert_eq!(extract_pages(&doc).unwrap(), pages);
    }
}
