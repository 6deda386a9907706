use std::io::{self, IsTerminal, Write};
use std::path::Path;

use pdfsieve::{ExtractWarning, Pdf};

use crate::page_range::parse_page_range;

/// Open a PDF file with user-friendly error messages.
///
/// Returns `Err(1)` with a message printed to stderr if the file is not found
/// or cannot be parsed as a valid PDF.
pub fn open_pdf(file: &Path) -> Result<Pdf, i32> {
    if !file.exists() {
        eprintln!("Error: file not found: {}", file.display());
        return Err(1);
    }

    let pdf = Pdf::open_file(file).map_err(|e| {
        eprintln!("Error: failed to open PDF: {e}");
        1
    })?;
    tracing::debug!(path = %file.display(), pages = pdf.page_count(), version = pdf.version(), "opened");
    Ok(pdf)
}

/// Resolve an optional page range string into 1-based page numbers.
///
/// If `pages` is `None`, returns all pages (1..=page_count).
pub fn resolve_pages(pages: Option<&str>, page_count: usize) -> Result<Vec<usize>, i32> {
    match pages {
        Some(range) => parse_page_range(range, page_count).map_err(|e| {
            eprintln!("Error: {e}");
            1
        }),
        None => Ok((1..=page_count).collect()),
    }
}

/// Report an error for `context` and map it to exit code 1.
pub fn fail(context: impl std::fmt::Display) -> impl FnOnce(pdfsieve::PdfError) -> i32 {
    move |e| {
        eprintln!("Error: {context}: {e}");
        1
    }
}

/// Print non-fatal warnings to stderr.
pub fn report_warnings(warnings: &[ExtractWarning]) {
    for w in warnings {
        eprintln!("Warning: {w}");
    }
}

/// Render bytes as text, escaping anything that is not printable ASCII.
pub fn escape_bytes(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

/// Print a JSON value on one line.
pub fn print_json(value: &serde_json::Value) {
    println!("{value}");
}

/// A progress reporter that prints "Processing page N/M..." to stderr,
/// but only when stderr is connected to a TTY (terminal).
pub struct ProgressReporter {
    total: usize,
    is_tty: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter for `total` pages.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            is_tty: io::stderr().is_terminal(),
        }
    }

    /// Report progress for page `current` (1-indexed).
    pub fn report(&self, current: usize) {
        if self.is_tty {
            eprint!("\rProcessing page {}/{}...", current, self.total);
            let _ = io::stderr().flush();
        }
    }

    /// Clear the progress line (if TTY).
    pub fn finish(&self) {
        if self.is_tty {
            eprint!("\r{}\r", " ".repeat(40));
            let _ = io::stderr().flush();
        }
    }
}
