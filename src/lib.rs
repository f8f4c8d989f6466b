//! # gradesheet
//!
//! Grade scanned exam answer sheets against a question paper using a
//! hosted vision model.
//!
//! ## Why this crate?
//!
//! Handwritten answer booklets defeat text-only tooling: the extractable
//! text layer is incomplete or absent, diagrams and equations are invisible,
//! and mark allocations live in the question paper's typography. This crate
//! rasterises every page of the question paper, the answer sheet, and an
//! optional model answer key, and sends the images together with the
//! extracted text and a detailed grading policy to a vision model in one
//! request. The model returns a per-question report with marks, feedback,
//! and a final summary, which the crate can render into a paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! question paper + answer sheet [+ model answer key]
//!  │
//!  ├─ 1. Input     validate paths and %PDF magic bytes
//!  ├─ 2. Extract   text layer + one JPEG raster per page via pdfium
//!  ├─ 3. Prompt    grading policy + document texts, images attached
//!  ├─ 4. Grade     one atomic vision-model call (gemini / openai / …)
//!  ├─ 5. Report    delimiter-separated question blocks + summary
//!  └─ 6. Export    capture the report and paginate it into an A4 PDF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gradesheet::{evaluate, EvaluationConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = EvaluationConfig::default();
//!     let output = evaluate(
//!         Path::new("question-paper.pdf"),
//!         Path::new("answer-sheet.pdf"),
//!         None,
//!         &config,
//!     )
//!     .await?;
//!     for section in output.report.sections() {
//!         println!("{section}\n");
//!     }
//!     eprintln!(
//!         "tokens: {} in / {} out",
//!         output.stats.input_tokens, output.stats.output_tokens
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gradesheet` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! gradesheet = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    EvaluationConfig, EvaluationConfigBuilder, ExportOptions, ReportTheme, DEFAULT_MODEL,
    REPORT_FILE_NAME,
};
pub use document::{Document, DocumentRole, PdfContent};
pub use error::EvalError;
pub use evaluate::{evaluate, evaluate_sync, EvaluationOutput, EvaluationStats};
pub use export::{export_report, export_report_blocking};
pub use report::{EvaluationReport, SECTION_SEPARATOR};
pub use session::{Session, SessionState};
