//! Evaluation entry points: ingest the documents, call the model, return
//! the report.
//!
//! An evaluation is deliberately all-or-nothing. All three documents are
//! ingested up front, validated, and sent in one grading request; any
//! failure along the way aborts with a single [`EvalError`] and no partial
//! report. Grading half an answer sheet and presenting the result as a score
//! would be worse than failing loudly.

use crate::config::{EvaluationConfig, DEFAULT_MODEL};
use crate::document::{Document, DocumentRole, PdfContent};
use crate::error::EvalError;
use crate::pipeline::{extract, input, llm};
use crate::prompt;
use crate::report::EvaluationReport;
use edgequake_llm::{ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Timing and size accounting for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStats {
    /// Pages in the question paper.
    pub question_paper_pages: usize,
    /// Pages in the answer sheet.
    pub answer_sheet_pages: usize,
    /// Pages in the model answer key, 0 when none was supplied.
    pub model_answer_pages: usize,
    /// Prompt tokens reported by the provider.
    pub input_tokens: u64,
    /// Completion tokens reported by the provider.
    pub output_tokens: u64,
    /// Wall time spent extracting text and rasterising pages.
    pub extract_duration_ms: u64,
    /// Wall time spent in the grading request.
    pub llm_duration_ms: u64,
    /// End-to-end wall time.
    pub total_duration_ms: u64,
}

/// Result of a successful evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationOutput {
    /// The full delimiter-separated report text.
    pub report: EvaluationReport,
    /// Run accounting.
    pub stats: EvaluationStats,
}

/// Grade an answer sheet against a question paper.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `question_paper` — Path to the question paper PDF (required)
/// * `answer_sheet` — Path to the student's answer sheet PDF (required)
/// * `model_answer` — Path to the model answer key PDF (optional)
/// * `config` — Evaluation configuration
///
/// # Errors
/// Every failure is fatal: missing/invalid input files, an unreadable PDF,
/// a document pair with no extractable text, a provider that cannot be
/// resolved, or a failed grading call.
pub async fn evaluate(
    question_paper: &Path,
    answer_sheet: &Path,
    model_answer: Option<&Path>,
    config: &EvaluationConfig,
) -> Result<EvaluationOutput, EvalError> {
    let total_start = Instant::now();
    info!(
        "Starting evaluation: questions={}, answers={}, key={}",
        question_paper.display(),
        answer_sheet.display(),
        model_answer.map(|p| p.display().to_string()).as_deref().unwrap_or("<none>")
    );

    // ── Step 1: Resolve inputs ───────────────────────────────────────────
    let qp_doc = input::resolve_document(DocumentRole::QuestionPaper, question_paper)?;
    let as_doc = input::resolve_document(DocumentRole::AnswerSheet, answer_sheet)?;
    let key_doc = model_answer
        .map(|p| input::resolve_document(DocumentRole::ModelAnswerKey, p))
        .transpose()?;

    // ── Step 2: Resolve provider ─────────────────────────────────────────
    // Before ingestion: a missing credential should fail in milliseconds,
    // not after rasterising a 40-page booklet.
    let provider = resolve_provider(config)?;

    // ── Step 3: Extract text and page rasters ────────────────────────────
    let extract_start = Instant::now();
    let qp_content = extract::extract_content(&qp_doc, config).await?;
    let as_content = extract::extract_content(&as_doc, config).await?;
    let key_content = match &key_doc {
        Some(doc) => Some(extract::extract_content(doc, config).await?),
        None => None,
    };
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} + {} + {} pages in {}ms",
        qp_content.page_count(),
        as_content.page_count(),
        key_content.as_ref().map_or(0, |c| c.page_count()),
        extract_duration_ms
    );

    // ── Step 4: Validate before spending a network call ──────────────────
    ensure_document_text(&qp_content, &as_content)?;

    // ── Step 5: Build the grading prompt ─────────────────────────────────
    let prompt_text = prompt::build_prompt(
        &qp_content.text,
        &as_content.text,
        key_content.as_ref().map(|c| c.text.as_str()),
    );
    debug!("Prompt length: {} chars", prompt_text.len());

    // Images in document order: question paper, answers, then the key, each
    // in page order, so the model can cross-reference text and image.
    let mut images: Vec<ImageData> =
        Vec::with_capacity(qp_content.pages.len() + as_content.pages.len());
    images.extend(qp_content.pages.iter().cloned());
    images.extend(as_content.pages.iter().cloned());
    if let Some(ref key) = key_content {
        images.extend(key.pages.iter().cloned());
    }

    // ── Step 6: One atomic grading call ──────────────────────────────────
    let response = llm::grade(&provider, prompt_text, images, config).await?;

    let stats = EvaluationStats {
        question_paper_pages: qp_content.page_count(),
        answer_sheet_pages: as_content.page_count(),
        model_answer_pages: key_content.as_ref().map_or(0, |c| c.page_count()),
        input_tokens: response.input_tokens as u64,
        output_tokens: response.output_tokens as u64,
        extract_duration_ms,
        llm_duration_ms: response.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Evaluation complete: {} report chars, {}ms total",
        response.text.len(),
        stats.total_duration_ms
    );

    Ok(EvaluationOutput {
        report: EvaluationReport::new(response.text),
        stats,
    })
}

/// Grade pre-resolved documents. Used by [`crate::session::Session`], which
/// validates and holds its document slots before the run starts.
pub async fn evaluate_documents(
    question_paper: &Document,
    answer_sheet: &Document,
    model_answer: Option<&Document>,
    config: &EvaluationConfig,
) -> Result<EvaluationOutput, EvalError> {
    evaluate(
        question_paper.path(),
        answer_sheet.path(),
        model_answer.map(|d| d.path()),
        config,
    )
    .await
}

/// Synchronous wrapper around [`evaluate`].
///
/// Creates a temporary tokio runtime internally.
pub fn evaluate_sync(
    question_paper: &Path,
    answer_sheet: &Path,
    model_answer: Option<&Path>,
    config: &EvaluationConfig,
) -> Result<EvaluationOutput, EvalError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| EvalError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(evaluate(question_paper, answer_sheet, model_answer, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Both required documents must carry extractable text before a model call
/// is spent. Fully scanned documents yield rasters but an empty text layer,
/// and the grading policy needs the text side for question matching.
fn ensure_document_text(
    question_paper: &PdfContent,
    answer_sheet: &PdfContent,
) -> Result<(), EvalError> {
    if question_paper.has_empty_text() || answer_sheet.has_empty_text() {
        return Err(EvalError::EmptyDocumentText);
    }
    Ok(())
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, EvalError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        EvalError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the vision provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; used as-is. This is the test route:
///    a fake provider here means no credential and no network.
///
/// 2. **Named provider + model** (`config.provider_name`) — the factory reads
///    the matching API key (`GEMINI_API_KEY`, `OPENAI_API_KEY`, …) from the
///    environment.
///
/// 3. **Gemini preference** — the grading prompt was developed against
///    Gemini, so a present `GEMINI_API_KEY` selects it even when other
///    provider keys are also set.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider.
fn resolve_provider(config: &EvaluationConfig) -> Result<Arc<dyn LLMProvider>, EvalError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, model);
    }

    // 3) Prefer Gemini when its key is present
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            return create_vision_provider("gemini", model);
        }
    }

    // 4) Auto-detect from environment
    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| EvalError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::ImageData;

    fn content(text: &str, pages: usize) -> PdfContent {
        PdfContent {
            text: text.to_string(),
            pages: (0..pages)
                .map(|_| ImageData::new("aGk=", "image/jpeg"))
                .collect(),
        }
    }

    #[test]
    fn scanned_document_without_text_is_rejected_before_the_model_call() {
        let typed = content("Q1. Define ownership. [10]", 1);
        // A fully scanned sheet: no text layer, but still one raster per
        // page.
        let scanned = content("", 3);
        assert!(scanned.has_empty_text());
        assert_eq!(scanned.page_count(), 3);

        let err = ensure_document_text(&typed, &scanned).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Question paper and answer sheet text cannot be empty."
        );
        // Order doesn't matter: a textless question paper fails the same way.
        assert!(ensure_document_text(&scanned, &typed).is_err());
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let blank = content("  \n\t ", 1);
        let typed = content("Q1", 1);
        assert!(matches!(
            ensure_document_text(&typed, &blank),
            Err(EvalError::EmptyDocumentText)
        ));
    }

    #[test]
    fn text_bearing_documents_pass_the_guard() {
        let qp = content("Q1. Define ownership. [10]", 2);
        let answers = content("Ownership is…", 4);
        assert!(ensure_document_text(&qp, &answers).is_ok());
    }

    #[test]
    fn pre_built_provider_wins() {
        // Resolution must never touch the environment when a provider is
        // injected, so a config with one resolves even with no keys set.
        let config = EvaluationConfig::default();
        assert!(config.provider.is_none());
        // Without any provider and (likely) no keys, resolution either finds
        // an env-configured provider or reports the configuration error.
        match resolve_provider(&config) {
            Ok(_) => {}
            Err(e) => assert!(e.is_configuration_error(), "got: {e}"),
        }
    }

    #[test]
    fn stats_serialise_to_json() {
        let stats = EvaluationStats {
            question_paper_pages: 3,
            answer_sheet_pages: 12,
            model_answer_pages: 0,
            input_tokens: 52_000,
            output_tokens: 4_100,
            extract_duration_ms: 900,
            llm_duration_ms: 21_000,
            total_duration_ms: 22_000,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"answer_sheet_pages\":12"));
    }
}
