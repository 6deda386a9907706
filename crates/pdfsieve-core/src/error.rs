//! Error and warning types for pdfsieve.
//!
//! Provides [`PdfError`] for fatal errors that stop an operation,
//! [`ExtractWarning`] for non-fatal issues that allow best-effort continuation,
//! and [`ExtractResult`] for pairing a value with collected warnings.

use std::fmt;

/// Fatal error types for PDF processing.
///
/// Each variant corresponds to one failure class of the toolkit. Only
/// [`PdfError::MalformedDocument`] and [`PdfError::UnsupportedFeature`] are
/// fatal for a whole document; the others are scoped to one page, one token
/// stream, or one signature record.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Structural parse failure: bad header, unreadable cross-reference
    /// table that could not be rebuilt, truncated trailer.
    MalformedDocument(String),
    /// A feature this toolkit does not handle (encryption, unknown filter).
    UnsupportedFeature(String),
    /// A 1-based page number outside `[1, page_count]`.
    PageNotFound {
        /// The requested 1-based page number.
        page: usize,
        /// Number of pages in the document.
        page_count: usize,
    },
    /// Truncated or unbalanced lexical construct in a content stream.
    TokenizeError {
        /// Byte offset in the decoded stream where lexing failed.
        offset: usize,
        /// Description of the failure.
        message: String,
    },
    /// A signature field whose PKCS#7 blob could not be decoded.
    SignatureMalformed {
        /// Fully-qualified AcroForm field name.
        field: String,
        /// Description of the failure.
        message: String,
    },
    /// Strict verification: the recomputed digest does not match.
    SignatureInvalid {
        /// Fully-qualified AcroForm field name.
        field: String,
        /// Description of the failure.
        message: String,
    },
    /// I/O error reading or writing PDF data.
    IoError(String),
    /// Any other error not covered by specific variants.
    Other(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::MalformedDocument(msg) => write!(f, "malformed document: {msg}"),
            PdfError::UnsupportedFeature(msg) => write!(f, "unsupported feature: {msg}"),
            PdfError::PageNotFound { page, page_count } => {
                write!(f, "page {page} not found (document has {page_count} pages)")
            }
            PdfError::TokenizeError { offset, message } => {
                write!(f, "tokenize error at offset {offset}: {message}")
            }
            PdfError::SignatureMalformed { field, message } => {
                write!(f, "malformed signature in field '{field}': {message}")
            }
            PdfError::SignatureInvalid { field, message } => {
                write!(f, "invalid signature in field '{field}': {message}")
            }
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

/// Machine-readable warning code for categorizing non-fatal issues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// A token stream was cut short at a lexical error.
    TruncatedTokens,
    /// A PDF object is malformed or has unexpected structure.
    MalformedObject,
    /// The cross-reference table was rebuilt by scanning the file.
    XrefRebuilt,
    /// A signature record was skipped because its blob was unusable.
    SignatureSkipped,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl ExtractWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::TruncatedTokens => "TRUNCATED_TOKENS",
            ExtractWarningCode::MalformedObject => "MALFORMED_OBJECT",
            ExtractWarningCode::XrefRebuilt => "XREF_REBUILT",
            ExtractWarningCode::SignatureSkipped => "SIGNATURE_SKIPPED",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered while processing a document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// Machine-readable warning code.
    pub code: ExtractWarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// 1-based page number where the warning occurred, if applicable.
    pub page: Option<usize>,
    /// Byte offset in the stream or file, if applicable.
    pub offset: Option<usize>,
    /// Element context (e.g., "field Signature1").
    pub element: Option<String>,
}

impl ExtractWarning {
    /// Create a warning with just a description.
    ///
    /// Uses [`ExtractWarningCode::Other`] as the default code.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
            offset: None,
            element: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            offset: None,
            element: None,
        }
    }

    /// Attach a 1-based page number.
    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach a byte offset.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attach element context.
    pub fn for_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {page})")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset {offset}]")?;
        }
        if let Some(ref element) = self.element {
            write!(f, " [{element}]")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected warnings.
///
/// Used when an operation can partially succeed with non-fatal issues.
#[derive(Debug, Clone)]
pub struct ExtractResult<T> {
    /// The extracted value.
    pub value: T,
    /// Warnings collected during extraction.
    pub warnings: Vec<ExtractWarning>,
}

impl<T> ExtractResult<T> {
    /// Create a result with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Create a result with warnings.
    pub fn with_warnings(value: T, warnings: Vec<ExtractWarning>) -> Self {
        Self { value, warnings }
    }

    /// Returns true if there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value while preserving warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractResult<U> {
        ExtractResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}
