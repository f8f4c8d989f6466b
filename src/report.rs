//! The evaluation report returned by the model.
//!
//! The report is an opaque string following a best-effort delimiter
//! convention: question blocks and one summary block, each separated by a
//! line containing only `---`. This crate never parses marks or scores out
//! of it — malformed structure from the model is rendered as-is. The only
//! local operation is splitting on the separator for display and export.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The literal token that delimits report blocks, on a line of its own.
pub const SECTION_SEPARATOR: &str = "---";

/// Matches a line consisting solely of the separator token, with optional
/// surrounding horizontal whitespace.
static RE_SEPARATOR_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*---[ \t]*$").unwrap());

/// The model's free-text evaluation, as returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    text: String,
}

impl EvaluationReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The raw report text, unmodified.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Split the report into display sections.
    ///
    /// Splits on lines consisting solely of [`SECTION_SEPARATOR`], trims each
    /// resulting segment, and drops empty or whitespace-only segments (so
    /// leading/trailing separators produce no blank blocks). Original order
    /// and each segment's internal whitespace are preserved — segments are
    /// rendered as preformatted text, never interpreted as markup.
    pub fn sections(&self) -> Vec<&str> {
        RE_SEPARATOR_LINE
            .split(&self.text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl From<String> for EvaluationReport {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
