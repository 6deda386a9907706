use std::path::Path;

use crate::cli::OutputFormat;
use crate::shared::{ProgressReporter, escape_bytes, fail, open_pdf, print_json, report_warnings, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: &OutputFormat,
    show_text: bool,
) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let page_numbers = resolve_pages(pages, pdf.page_count())?;
    let progress = ProgressReporter::new(page_numbers.len());

    for (i, &n) in page_numbers.iter().enumerate() {
        progress.report(i + 1);

        let result = if show_text {
            pdf.page_show_text(n)
        } else {
            pdf.page_strings(n)
        }
        .map_err(fail(format!("reading page {n}")))?;
        report_warnings(&result.warnings);

        let strings: Vec<String> = result.value.iter().map(|s| escape_bytes(s)).collect();
        match format {
            OutputFormat::Text => {
                println!("--- Page {n} ---");
                for s in &strings {
                    println!("{s}");
                }
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "page": n,
                    "strings": strings,
                    "truncated": !result.is_clean(),
                }));
            }
        }
    }

    progress.finish();
    Ok(())
}
