//! Batch page-extraction outcome types.

use std::path::PathBuf;

use crate::error::PdfError;

/// Options for splitting a document into single-page files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// File name prefix; page `n` is written to `{prefix}-{n}.pdf`.
    pub file_prefix: String,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            file_prefix: "page".to_string(),
        }
    }
}

impl SplitOptions {
    /// Options with a custom file prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            file_prefix: prefix.into(),
        }
    }

    /// Final file name for a 1-based page number.
    pub fn file_name(&self, page_number: usize) -> String {
        format!("{}-{}.pdf", self.file_prefix, page_number)
    }
}

/// Result of extracting one page in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    /// The requested 1-based page number.
    pub page_number: usize,
    /// Path of the written file, or the error that stopped this page.
    pub result: Result<PathBuf, PdfError>,
}

impl PageOutcome {
    /// Returns `true` if this page was written.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-page outcomes of a batch split, in request order.
///
/// A failed page never aborts the batch; its error is recorded here and
/// the remaining pages are still processed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitReport {
    /// One outcome per requested page.
    pub outcomes: Vec<PageOutcome>,
}

impl SplitReport {
    /// Pages written successfully, with their output paths.
    pub fn succeeded(&self) -> impl Iterator<Item = (usize, &PathBuf)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|p| (o.page_number, p)))
    }

    /// Pages that failed, with their errors.
    pub fn failed(&self) -> impl Iterator<Item = (usize, &PdfError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.page_number, e)))
    }

    /// Returns `true` if every requested page was written.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(PageOutcome::is_ok)
    }
}
