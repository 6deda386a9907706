//! Page classification types for the blank-page inspector.
//!
//! The classifier itself lives in the `pdfsieve` crate; this module holds
//! the backend-independent result and option types.

use std::fmt;

/// Default blank-length threshold in bytes of decoded content.
pub const DEFAULT_BLANK_THRESHOLD: usize = 20;

/// Outcome of classifying one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PageClass {
    /// The page declares at least one font resource.
    HasFont,
    /// The page declares at least one XObject (image or form) resource.
    HasImage,
    /// No font/XObject resources and the content stream is at most the
    /// blank threshold in length.
    Blank,
    /// No font/XObject resources but the content stream is longer than the
    /// blank threshold.
    NonBlankContent,
}

impl PageClass {
    /// Returns `true` only for [`PageClass::Blank`].
    pub fn is_blank(self) -> bool {
        matches!(self, PageClass::Blank)
    }

    /// Returns the lowercase tag used in CLI and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            PageClass::HasFont => "has_font",
            PageClass::HasImage => "has_image",
            PageClass::Blank => "blank",
            PageClass::NonBlankContent => "non_blank_content",
        }
    }
}

impl fmt::Display for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a page received its [`PageClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "reason", rename_all = "snake_case")
)]
pub enum Rationale {
    /// `count` entries in the page's `/Font` resources.
    FontPresent {
        /// Number of font entries.
        count: usize,
    },
    /// `count` entries in the page's `/XObject` resources.
    ImagePresent {
        /// Number of XObject entries.
        count: usize,
    },
    /// Decoded content length compared against the threshold.
    ContentLength {
        /// Decoded content stream length in bytes.
        bytes: usize,
        /// Threshold in effect.
        threshold: usize,
    },
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rationale::FontPresent { count } => write!(f, "font-present ({count} fonts)"),
            Rationale::ImagePresent { count } => write!(f, "image-present ({count} xobjects)"),
            Rationale::ContentLength { bytes, threshold } => {
                let cmp = if bytes <= threshold { "<=" } else { ">" };
                write!(f, "byte-length {bytes} {cmp} {threshold}")
            }
        }
    }
}

/// Classification of a single page with its rationale.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageClassification {
    /// 1-based page number.
    pub page_number: usize,
    /// The assigned class.
    pub class: PageClass,
    /// The evidence behind `class`.
    pub rationale: Rationale,
}

impl PageClassification {
    /// Returns `true` if the page was classified [`PageClass::Blank`].
    pub fn is_blank(&self) -> bool {
        self.class.is_blank()
    }
}

/// Options for the blank-page classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Pages whose decoded content is at most this many bytes (and which
    /// have no font/XObject resources) are blank. Raw byte length, no
    /// whitespace stripping.
    pub blank_threshold: usize,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            blank_threshold: DEFAULT_BLANK_THRESHOLD,
        }
    }
}

impl ClassifyOptions {
    /// Options with a custom threshold.
    pub fn with_threshold(blank_threshold: usize) -> Self {
        Self { blank_threshold }
    }
}
