use std::path::Path;

use pdfsieve::ClassifyOptions;

use crate::cli::OutputFormat;
use crate::shared::{open_pdf, print_json, resolve_pages};

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: &OutputFormat,
    threshold: usize,
) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let page_numbers = resolve_pages(pages, pdf.page_count())?;
    let options = ClassifyOptions::with_threshold(threshold);

    let all = pdf.classify_pages(&options);
    let selected: Vec<_> = page_numbers.iter().map(|&n| &all[n - 1]).collect();

    let blank: Vec<usize> = selected
        .iter()
        .filter(|c| c.is_blank())
        .map(|c| c.page_number)
        .collect();

    match format {
        OutputFormat::Text => {
            for c in &selected {
                println!("page {}\t{}\t{}", c.page_number, c.class, c.rationale);
            }
            let list: Vec<String> = blank.iter().map(ToString::to_string).collect();
            println!("blank: {}", if list.is_empty() { "none".to_string() } else { list.join(",") });
        }
        OutputFormat::Json => {
            let pages: Vec<serde_json::Value> = selected
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "page": c.page_number,
                        "class": c.class.as_str(),
                        "blank": c.is_blank(),
                        "rationale": c.rationale.to_string(),
                    })
                })
                .collect();
            print_json(&serde_json::json!({
                "threshold": threshold,
                "pages": pages,
                "blank": blank,
            }));
        }
    }
    Ok(())
}
