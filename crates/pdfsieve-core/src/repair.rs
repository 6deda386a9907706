//! Load-time repair types for best-effort opening of damaged PDFs.
//!
//! Provides [`RepairOptions`] for configuring which repairs the loader may
//! attempt and [`RepairResult`] for reporting what was applied.

use std::fmt;

/// Options controlling which repairs the loader may apply.
///
/// Each field enables a specific repair strategy. All default to `true`.
#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Rebuild the cross-reference table by scanning for `obj`/`endobj`
    /// markers when the stored table is unreadable or inconsistent.
    pub rebuild_xref: bool,
    /// Recover stream data by scanning for `endstream` when `/Length` is
    /// missing or wrong.
    pub fix_stream_lengths: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            rebuild_xref: true,
            fix_stream_lengths: true,
        }
    }
}

impl RepairOptions {
    /// Options that disable every repair: the document must be well formed.
    pub fn strict() -> Self {
        Self {
            rebuild_xref: false,
            fix_stream_lengths: false,
        }
    }
}

impl fmt::Display for RepairOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RepairOptions(rebuild_xref={}, fix_stream_lengths={})",
            self.rebuild_xref, self.fix_stream_lengths
        )
    }
}

/// Log of repairs applied while loading a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairResult {
    /// Log of repairs applied, one entry per fix.
    pub log: Vec<String>,
}

impl RepairResult {
    /// Create a new empty repair result.
    pub fn new() -> Self {
        Self { log: Vec::new() }
    }

    /// Record one applied repair.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// Returns `true` if any repairs were applied.
    pub fn has_repairs(&self) -> bool {
        !self.log.is_empty()
    }
}
