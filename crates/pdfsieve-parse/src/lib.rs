//! pdfsieve-parse: PDF loading on top of lopdf, plus a content stream
//! tokenizer.
//!
//! lopdf holds the objects, walks the file and writes documents back out.
//! This crate adds what lopdf lacks for damaged input: a check of the
//! cross-reference data against the file and a linear rebuild when it
//! fails ([`xref`]), a page-tree walk that tolerates cycles and dangling
//! references ([`Document`]), the filters lopdf cannot decode
//! ([`filters`]), and a byte-level [`Lexer`] with the operator
//! [`tokenize`]r built on it.

pub mod document;
pub mod error;
pub mod filters;
pub mod lexer;
pub mod tokenizer;
pub mod xref;

pub use document::{Document, INHERITABLE_KEYS, NULL, PageRef, ResourceKind, Resources};
pub use error::BackendError;
pub use lexer::{Lexer, Token, TokenKind, collect_strings, tokenize_lossy};
pub use lopdf;
pub use pdfsieve_core;
pub use tokenizer::{Operand, Operator, operators_lossy, show_text_strings, tokenize};
