//! pdfsieve: classify blank pages, split documents into single pages,
//! tokenize content streams, and read signature metadata.
//!
//! This is the public API facade crate. It re-exports types from
//! pdfsieve-core and uses pdfsieve-parse for reading and writing PDF files.
//!
//! # Architecture
//!
//! - **pdfsieve-core**: Backend-independent data types
//! - **pdfsieve-parse**: lopdf-backed loading, cross-reference recovery, and content tokenizer
//! - **pdfsieve** (this crate): Page inspection, extraction, and signatures on top
//!
//! # Example
//!
//! ```ignore
//! use pdfsieve::{ClassifyOptions, Pdf};
//!
//! let pdf = Pdf::open_file("scan.pdf")?;
//! for c in pdf.classify_pages(&ClassifyOptions::default()) {
//!     println!("page {}: {} ({})", c.page_number, c.class, c.rationale);
//! }
//! ```

pub mod inspect;
mod pdf;
#[cfg(feature = "signatures")]
pub mod signatures;
pub mod split;

pub use pdf::Pdf;
pub use pdfsieve_core::{
    ClassifyOptions, DEFAULT_BLANK_THRESHOLD, ExtractResult, ExtractWarning, ExtractWarningCode,
    PageClass, PageClassification, PageOutcome, PdfError, Rationale, RepairOptions, RepairResult,
    SignatureOptions, SignatureRecord, SplitOptions, SplitReport,
};
pub use pdfsieve_parse::{Document, Lexer, Token, TokenKind};

pub use pdfsieve_core;
pub use pdfsieve_parse;
