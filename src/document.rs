//! Document roles and extracted PDF content.
//!
//! An evaluation consumes up to three documents in fixed roles: the question
//! paper and the student's answer sheet (both required) and an optional model
//! answer key. Each document is reduced by the ingestion pipeline to a
//! [`PdfContent`]: one concatenated text blob plus exactly one JPEG raster
//! per page. The rasters exist because the extracted text layer is routinely
//! incomplete for handwriting, diagrams, and equations — the vision model
//! grades from the images and uses the text for searching and matching.

use edgequake_llm::ImageData;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The fixed role a document plays in an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentRole {
    /// The exam question paper (required).
    QuestionPaper,
    /// The student's answer sheet (required).
    AnswerSheet,
    /// The instructor's model answer key (optional).
    ModelAnswerKey,
}

impl DocumentRole {
    /// Human-readable role name, as shown in errors and the CLI.
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentRole::QuestionPaper => "Question Paper",
            DocumentRole::AnswerSheet => "Answer Sheet",
            DocumentRole::ModelAnswerKey => "Model Answer Key",
        }
    }

    /// Whether an evaluation can start without this document.
    pub fn is_required(&self) -> bool {
        !matches!(self, DocumentRole::ModelAnswerKey)
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One uploaded PDF file, tagged with its role.
///
/// Created by [`crate::pipeline::input::resolve_document`], which validates
/// existence, readability, and the `%PDF` magic bytes before the pipeline
/// touches the file.
#[derive(Debug, Clone)]
pub struct Document {
    pub role: DocumentRole,
    pub path: PathBuf,
    /// File name shown in user-facing errors ("Failed to read the PDF
    /// file: '{name}' …").
    pub display_name: String,
}

impl Document {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The extracted representation of one document.
///
/// Invariant: `pages.len()` equals the PDF's page count — a page with no
/// extractable text layer still yields exactly one image, so the model can
/// read handwritten or scanned pages the text extractor cannot.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// All page texts, joined with a blank line between pages and trimmed of
    /// leading/trailing whitespace. May be empty for fully scanned documents.
    pub text: String,
    /// One JPEG raster per page, in page order, as base64 payloads tagged
    /// `image/jpeg`.
    pub pages: Vec<ImageData>,
}

impl PdfContent {
    /// Number of pages in the source document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page contributed any text-layer content.
    pub fn has_empty_text(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_names() {
        assert_eq!(DocumentRole::QuestionPaper.to_string(), "Question Paper");
        assert_eq!(DocumentRole::AnswerSheet.to_string(), "Answer Sheet");
        assert_eq!(
            DocumentRole::ModelAnswerKey.to_string(),
            "Model Answer Key"
        );
    }

    #[test]
    fn only_model_key_is_optional() {
        assert!(DocumentRole::QuestionPaper.is_required());
        assert!(DocumentRole::AnswerSheet.is_required());
        assert!(!DocumentRole::ModelAnswerKey.is_required());
    }

    #[test]
    fn empty_text_detection() {
        let content = PdfContent {
            text: "  \n ".into(),
            pages: vec![],
        };
        assert!(content.has_empty_text());
    }
}
