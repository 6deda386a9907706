use std::path::Path;

use crate::cli::OutputFormat;
use crate::shared::{open_pdf, print_json};

pub fn run(file: &Path, format: &OutputFormat) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let info = pdf.info();
    let repairs = &pdf.repair_log().log;
    let warnings: Vec<String> = pdf.warnings().iter().map(ToString::to_string).collect();

    match format {
        OutputFormat::Text => {
            println!("File: {}", file.display());
            println!("Version: {}", pdf.version());
            println!("Pages: {}", pdf.page_count());
            for (key, value) in &info {
                println!("{key}: {value}");
            }
            if !repairs.is_empty() {
                println!("Repairs:");
                for entry in repairs {
                    println!("  {entry}");
                }
            }
            if !warnings.is_empty() {
                println!("Warnings:");
                for warning in &warnings {
                    println!("  {warning}");
                }
            }
        }
        OutputFormat::Json => {
            print_json(&serde_json::json!({
                "file": file.display().to_string(),
                "version": pdf.version(),
                "pages": pdf.page_count(),
                "info": info,
                "repairs": repairs,
                "warnings": warnings,
            }));
        }
    }
    Ok(())
}
