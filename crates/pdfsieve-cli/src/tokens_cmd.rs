use std::path::Path;

use pdfsieve::Token;

use crate::cli::OutputFormat;
use crate::shared::{ProgressReporter, escape_bytes, fail, open_pdf, print_json, report_warnings, resolve_pages};

/// Tag and printable value of a token.
fn describe(token: &Token) -> (&'static str, String) {
    match token {
        Token::Integer(n) => ("integer", n.to_string()),
        Token::Real(r) => ("real", r.to_string()),
        Token::Name(n) => ("name", format!("/{}", escape_bytes(n))),
        Token::LiteralString(s) => ("string", format!("({})", escape_bytes(s))),
        Token::HexString(s) => ("hexstring", format!("<{}>", hex(s))),
        Token::ArrayStart => ("array_start", "[".to_string()),
        Token::ArrayEnd => ("array_end", "]".to_string()),
        Token::DictStart => ("dict_start", "<<".to_string()),
        Token::DictEnd => ("dict_end", ">>".to_string()),
        Token::Operator(op) => ("operator", escape_bytes(op)),
        Token::Comment(c) => ("comment", format!("%{}", escape_bytes(c))),
        Token::EndOfStream => ("eos", String::new()),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

pub fn run(
    file: &Path,
    pages: Option<&str>,
    format: &OutputFormat,
    comments: bool,
) -> Result<(), i32> {
    let pdf = open_pdf(file)?;
    let page_numbers = resolve_pages(pages, pdf.page_count())?;
    let progress = ProgressReporter::new(page_numbers.len());

    for (i, &n) in page_numbers.iter().enumerate() {
        progress.report(i + 1);

        let result = pdf
            .page_tokens(n, comments)
            .map_err(fail(format!("reading page {n}")))?;
        report_warnings(&result.warnings);

        match format {
            OutputFormat::Text => {
                println!("--- Page {n} ---");
                for token in &result.value {
                    let (kind, value) = describe(token);
                    println!("{kind}\t{value}");
                }
            }
            OutputFormat::Json => {
                let tokens: Vec<serde_json::Value> = result
                    .value
                    .iter()
                    .map(|t| {
                        let (kind, value) = describe(t);
                        serde_json::json!({ "kind": kind, "value": value })
                    })
                    .collect();
                print_json(&serde_json::json!({
                    "page": n,
                    "tokens": tokens,
                    "truncated": !result.is_clean(),
                }));
            }
        }
    }

    progress.finish();
    Ok(())
}
