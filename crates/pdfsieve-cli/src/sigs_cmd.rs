use std::path::Path;

use pdfsieve::SignatureOptions;

use crate::cli::OutputFormat;
use crate::shared::{fail, open_pdf, print_json, report_warnings};

pub fn run(file: &Path, format: &OutputFormat, strict: bool) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let options = SignatureOptions { strict };

    let result = pdf
        .signatures(&options)
        .map_err(fail("signature check failed"))?;
    report_warnings(&result.warnings);

    match format {
        OutputFormat::Text => {
            if result.value.is_empty() {
                println!("No signatures");
            }
            for sig in &result.value {
                println!("Signature: {}", sig.field_name);
                for (key, value) in sig.to_map() {
                    println!("  {key}: {value}");
                }
                if let Some(ref digest) = sig.digest_algorithm {
                    println!("  Digest: {digest}");
                }
                println!("  SignedBytes: {}", sig.signed_length());
            }
        }
        OutputFormat::Json => {
            let sigs = serde_json::to_value(&result.value).map_err(|e| {
                eprintln!("Error: {e}");
                1
            })?;
            print_json(&serde_json::json!({
                "verified": strict,
                "signatures": sigs,
            }));
        }
    }
    Ok(())
}
