//! Error types for the parsing layer.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! and its conversion into the core [`PdfError`].

use pdfsieve_core::PdfError;
use thiserror::Error;

/// Error type for object-model and tokenizer operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Structural parse failure (header, xref, trailer, object syntax).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// A feature the parser does not handle.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Lexical error inside a token stream.
    #[error("tokenize error at offset {offset}: {message}")]
    Tokenize {
        /// Byte offset where lexing failed.
        offset: usize,
        /// Description of the failure.
        message: String,
    },

    /// An error reported by lopdf while reading or writing objects.
    #[error("PDF object error: {0}")]
    Lopdf(#[from] lopdf::Error),

    /// Error reading or writing PDF data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl BackendError {
    pub(crate) fn tokenize(offset: usize, message: impl Into<String>) -> Self {
        BackendError::Tokenize {
            offset,
            message: message.into(),
        }
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => PdfError::MalformedDocument(msg),
            BackendError::Unsupported(msg) => PdfError::UnsupportedFeature(msg),
            BackendError::Tokenize { offset, message } => {
                PdfError::TokenizeError { offset, message }
            }
            BackendError::Lopdf(e) => PdfError::MalformedDocument(e.to_string()),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Core(e) => e,
        }
    }
}
