//! Top-level PDF document type.

use std::collections::BTreeMap;
use std::path::Path;

use pdfsieve_core::{
    ClassifyOptions, ExtractResult, ExtractWarning, PageClassification, PdfError, RepairOptions,
    RepairResult, SplitOptions, SplitReport,
};
use pdfsieve_parse::{Document, Lexer, PageRef, Token, collect_strings, show_text_strings};

use crate::{inspect, split};

/// A PDF document opened for inspection, splitting, and signature reading.
///
/// Keeps the source bytes alongside the parsed [`Document`] because
/// signature byte ranges refer to the original file.
///
/// # Example
///
/// ```ignore
/// let pdf = Pdf::open(&bytes)?;
/// let blank = pdf.blank_pages(&ClassifyOptions::default());
/// ```
#[derive(Debug, Clone)]
pub struct Pdf {
    doc: Document,
    source: Vec<u8>,
    pages: Vec<PageRef>,
}

impl Pdf {
    /// Open a PDF document from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::IoError`] if the file cannot be read, otherwise
    /// the same errors as [`Pdf::open`].
    #[cfg(feature = "std")]
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::open(&bytes)
    }

    /// Open a PDF document from bytes, repairing what can be repaired.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::MalformedDocument`] if the bytes are not a PDF
    /// or cannot be recovered, and [`PdfError::UnsupportedFeature`] for
    /// encrypted documents.
    pub fn open(bytes: &[u8]) -> Result<Self, PdfError> {
        Self::open_with_repair(bytes, &RepairOptions::default())
    }

    /// Open with explicit [`RepairOptions`].
    ///
    /// Use [`RepairOptions::strict`] to reject files that need any repair.
    /// The repairs applied are available from [`Pdf::repair_log`].
    pub fn open_with_repair(bytes: &[u8], options: &RepairOptions) -> Result<Self, PdfError> {
        let doc = Document::load_mem_with(bytes, options)?;
        let pages = doc.pages()?;
        if doc.repair_log().has_repairs() {
            tracing::info!(repairs = doc.repair_log().log.len(), "document opened with repairs");
        }
        Ok(Self {
            doc,
            source: bytes.to_vec(),
            pages,
        })
    }

    /// Return the number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// PDF version from the header, e.g. `"1.7"`.
    pub fn version(&self) -> &str {
        self.doc.version()
    }

    /// Repairs applied while opening.
    pub fn repair_log(&self) -> &RepairResult {
        self.doc.repair_log()
    }

    /// Problems found while opening: objects that had to be dropped or
    /// patched, and a rebuilt cross-reference table.
    pub fn warnings(&self) -> &[ExtractWarning] {
        self.doc.warnings()
    }

    /// Text entries of the `/Info` dictionary (`Title`, `Author`,
    /// `Producer`, ...). Non-string entries are omitted.
    pub fn info(&self) -> BTreeMap<String, String> {
        let Some(info) = self.doc.info() else {
            return BTreeMap::new();
        };
        info.iter()
            .filter_map(|(key, _)| {
                let value = self.doc.text_string(info, key)?;
                Some((String::from_utf8_lossy(key).into_owned(), value))
            })
            .collect()
    }

    /// The parsed document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The bytes the document was opened from.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    fn page(&self, page_number: usize) -> Result<&PageRef, PdfError> {
        page_number
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or(PdfError::PageNotFound {
                page: page_number,
                page_count: self.pages.len(),
            })
    }

    /// Decoded content of a 1-based page.
    pub fn page_content(&self, page_number: usize) -> Result<Vec<u8>, PdfError> {
        Ok(self.doc.page_content(self.page(page_number)?)?)
    }

    /// Classify every page as blank or not.
    ///
    /// Never fails: a page whose content cannot be decoded is classified
    /// from its stored stream size.
    pub fn classify_pages(&self, options: &ClassifyOptions) -> Vec<PageClassification> {
        self.pages
            .iter()
            .map(|page| inspect::classify_page(&self.doc, page, options))
            .collect()
    }

    /// 1-based numbers of the blank pages.
    pub fn blank_pages(&self, options: &ClassifyOptions) -> Vec<usize> {
        self.classify_pages(options)
            .into_iter()
            .filter(PageClassification::is_blank)
            .map(|c| c.page_number)
            .collect()
    }

    /// Lexical tokens of a page's content. Lexing stops at the first error,
    /// which is reported as a warning.
    pub fn page_tokens(
        &self,
        page_number: usize,
        keep_comments: bool,
    ) -> Result<ExtractResult<Vec<Token>>, PdfError> {
        let content = self.page_content(page_number)?;
        let result = Lexer::new(&content).keep_comments(keep_comments).collect_lossy();
        Ok(with_page(result, page_number))
    }

    /// Every string token of a page's content, in order.
    pub fn page_strings(&self, page_number: usize) -> Result<ExtractResult<Vec<Vec<u8>>>, PdfError> {
        let content = self.page_content(page_number)?;
        Ok(with_page(collect_strings(&content), page_number))
    }

    /// Only the strings shown by text operators (`Tj`, `'`, `"`, `TJ`).
    pub fn page_show_text(&self, page_number: usize) -> Result<ExtractResult<Vec<Vec<u8>>>, PdfError> {
        let content = self.page_content(page_number)?;
        Ok(with_page(show_text_strings(&content), page_number))
    }

    /// Extract a 1-based page into a new one-page document.
    pub fn extract_page(&self, page_number: usize) -> Result<Document, PdfError> {
        split::extract_page(&self.doc, page_number)
    }

    /// Extract a 1-based page and serialize it.
    pub fn extract_page_bytes(&self, page_number: usize) -> Result<Vec<u8>, PdfError> {
        let mut buf = Vec::new();
        split::extract_page_to(&self.doc, page_number, &mut buf)?;
        Ok(buf)
    }

    /// Write each requested page to its own file in `out_dir`.
    ///
    /// See [`split::split_pages`].
    pub fn split_pages(
        &self,
        page_numbers: &[usize],
        out_dir: &Path,
        options: &SplitOptions,
    ) -> SplitReport {
        split::split_pages(&self.doc, page_numbers, out_dir, options)
    }

    /// Read the document's signature fields.
    ///
    /// Returns an empty list if the document has no signed fields.
    #[cfg(feature = "signatures")]
    pub fn signatures(
        &self,
        options: &pdfsieve_core::SignatureOptions,
    ) -> Result<ExtractResult<Vec<pdfsieve_core::SignatureRecord>>, PdfError> {
        crate::signatures::extract_signatures(&self.doc, &self.source, options)
    }
}

fn with_page<T>(mut result: ExtractResult<T>, page_number: usize) -> ExtractResult<T> {
    for warning in &mut result.warnings {
        warning.page.get_or_insert(page_number);
    }
    result
}
