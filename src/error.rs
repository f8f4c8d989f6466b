//! Error types for the gradesheet library.
//!
//! Every failure here is fatal to the action that raised it: a document that
//! cannot be ingested aborts the whole evaluation (no partial grading), and a
//! capture that cannot be encoded aborts the export. There is no page-level
//! soft-failure channel — an evaluation either produces a complete report or
//! a single [`EvalError`].
//!
//! The variants mirror the user-visible taxonomy: missing input, ingestion
//! failure (always naming the offending file), configuration failure (bad
//! credential, distinct from everything else so the user knows it is
//! actionable), generic model failure, and the two export failure classes.

use crate::document::DocumentRole;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the gradesheet library.
#[derive(Debug, Error)]
pub enum EvalError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A required document role has no file attached.
    #[error("Please upload the Question Paper and Answer Sheet.")]
    MissingInput,

    /// Input file was not found at the given path.
    #[error("{role} not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { role: DocumentRole, path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading {role} '{path}'")]
    PermissionDenied { role: DocumentRole, path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("{role} is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf {
        role: DocumentRole,
        path: PathBuf,
        magic: [u8; 4],
    },

    // ── Ingestion errors ──────────────────────────────────────────────────
    /// The PDF could not be parsed or a page could not be processed.
    /// Aborts the evaluation; no partial content is ever produced.
    #[error("Failed to read the PDF file: '{name}'. It might be corrupted or protected.")]
    IngestionFailed { name: String, detail: String },

    /// Both required documents were ingested but one produced no text layer.
    #[error("Question paper and answer sheet text cannot be empty.")]
    EmptyDocumentText,

    // ── Model errors ──────────────────────────────────────────────────────
    /// No vision provider could be resolved (missing API key etc.).
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The external service rejected the credential. Actionable, and kept
    /// distinct from the generic failure below.
    #[error("The configured API key is not valid. Please check your setup.")]
    InvalidApiKey { detail: String },

    /// Any other model-call failure: overload, oversized payload, network.
    #[error("Failed to get a response from the AI. The model may be overloaded or the input is too large.")]
    EvaluationFailed { detail: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Export requested but no evaluation report exists.
    #[error("Could not find the report to download.")]
    ReportMissing,

    /// The report capture or its image encoding failed.
    #[error("Failed to generate PDF. The report content might be too large to capture as an image.")]
    CaptureTooLarge { detail: String },

    /// Any other export failure (document assembly, file write).
    #[error("Failed to generate PDF. An unexpected error occurred.")]
    ExportFailed { detail: String },

    /// Could not write the exported file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvalError {
    /// Whether this error indicates an actionable credential problem rather
    /// than a transient service failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EvalError::InvalidApiKey { .. } | EvalError::ProviderNotConfigured { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_message_is_exact() {
        assert_eq!(
            EvalError::MissingInput.to_string(),
            "Please upload the Question Paper and Answer Sheet."
        );
    }

    #[test]
    fn ingestion_failure_names_the_file() {
        let e = EvalError::IngestionFailed {
            name: "midterm.pdf".into(),
            detail: "bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("midterm.pdf"), "got: {msg}");
        assert!(msg.contains("corrupted or protected"));
    }

    #[test]
    fn credential_error_is_distinct_from_generic() {
        let auth = EvalError::InvalidApiKey {
            detail: "401".into(),
        };
        let generic = EvalError::EvaluationFailed {
            detail: "503".into(),
        };
        assert_ne!(auth.to_string(), generic.to_string());
        assert!(auth.is_configuration_error());
        assert!(!generic.is_configuration_error());
    }

    #[test]
    fn report_missing_message_is_exact() {
        assert_eq!(
            EvalError::ReportMissing.to_string(),
            "Could not find the report to download."
        );
    }

    #[test]
    fn capture_too_large_mentions_capture() {
        let e = EvalError::CaptureTooLarge {
            detail: "bitmap allocation failed".into(),
        };
        assert!(e.to_string().contains("too large to capture"));
    }
}
