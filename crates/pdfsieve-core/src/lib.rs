//! pdfsieve-core: Backend-independent data types.
//!
//! This crate provides the shared types used across pdfsieve: the error
//! taxonomy and warnings, load-time repair options, page classification
//! results, signature records, and batch split outcomes. It holds no
//! parsing logic.

pub mod classify;
pub mod error;
pub mod repair;
pub mod signature;
pub mod split;

pub use classify::{
    ClassifyOptions, DEFAULT_BLANK_THRESHOLD, PageClass, PageClassification, Rationale,
};
pub use error::{ExtractResult, ExtractWarning, ExtractWarningCode, PdfError};
pub use repair::{RepairOptions, RepairResult};
pub use signature::{SignatureOptions, SignatureRecord};
pub use split::{PageOutcome, SplitOptions, SplitReport};
