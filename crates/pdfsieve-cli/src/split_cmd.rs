use std::path::Path;

use pdfsieve::SplitOptions;

use crate::cli::OutputFormat;
use crate::shared::{open_pdf, print_json, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: &OutputFormat,
    out_dir: &Path,
    prefix: &str,
) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let page_numbers = resolve_pages(pages, pdf.page_count())?;

    if !out_dir.is_dir() {
        eprintln!("Error: output directory not found: {}", out_dir.display());
        return Err(1);
    }

    let report = pdf.split_pages(&page_numbers, out_dir, &SplitOptions::with_prefix(prefix));

    match format {
        OutputFormat::Text => {
            for (n, path) in report.succeeded() {
                println!("page {n}\t{}", path.display());
            }
        }
        OutputFormat::Json => {
            let written: Vec<serde_json::Value> = report
                .succeeded()
                .map(|(n, path)| serde_json::json!({ "page": n, "path": path.display().to_string() }))
                .collect();
            let failed: Vec<serde_json::Value> = report
                .failed()
                .map(|(n, err)| serde_json::json!({ "page": n, "error": err.to_string() }))
                .collect();
            print_json(&serde_json::json!({ "written": written, "failed": failed }));
        }
    }

    let mut failures = 0;
    for (n, err) in report.failed() {
        eprintln!("Error: page {n}: {err}");
        failures += 1;
    }
    if failures > 0 {
        return Err(1);
    }
    Ok(())
}
