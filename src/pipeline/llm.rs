//! Model interaction: build the grading message and call the provider.
//!
//! This module turns the assembled prompt and page images into a single
//! chat request and returns the raw report text. It is intentionally thin —
//! all prompt engineering lives in [`crate::prompt`] so the grading policy
//! can be changed without touching the transport or error translation here.
//!
//! An evaluation is one atomic request: either the full report comes back or
//! the run fails. There is no per-page fan-out and no retry loop — a grading
//! run is interactive, and a failed call should surface immediately so the
//! caller can fix the key or shrink the input rather than wait through
//! back-off cycles.

use crate::config::EvaluationConfig;
use crate::error::EvalError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Outcome of a single grading call, with token accounting.
#[derive(Debug, Clone)]
pub struct GradingResponse {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// Send the grading prompt and all page images to the model in one request.
///
/// ## Message Layout
///
/// A single user message carries the full prompt text (policy + extracted
/// document text) with the images attached in document order: question paper
/// pages, then answer sheet pages, then model answer key pages. Page order
/// inside each document is preserved so the model can cross-reference
/// "question 3 on page 2" between text and image.
pub async fn grade(
    provider: &Arc<dyn LLMProvider>,
    prompt: String,
    images: Vec<ImageData>,
    config: &EvaluationConfig,
) -> Result<GradingResponse, EvalError> {
    let start = Instant::now();

    let messages = vec![ChatMessage::user_with_images(prompt, images)];
    let options = build_options(config);

    let call = provider.chat(&messages, Some(&options));
    match await_with_timeout(call, config.api_timeout_secs).await? {
        Ok(response) => {
            let duration = start.elapsed();
            debug!(
                "Grading call: {} input tokens, {} output tokens, {:?}",
                response.prompt_tokens, response.completion_tokens, duration
            );
            Ok(GradingResponse {
                text: response.content,
                input_tokens: response.prompt_tokens,
                output_tokens: response.completion_tokens,
                duration_ms: duration.as_millis() as u64,
            })
        }
        Err(e) => {
            let detail = format!("{}", e);
            warn!("Grading call failed — {}", detail);
            Err(translate_provider_error(detail))
        }
    }
}

/// Bound the grading call by the configured deadline.
///
/// The providers carry their own transport timeouts, but a single request
/// hauling every page of three documents can outlive those defaults; this
/// is the caller's hard ceiling.
async fn await_with_timeout<T>(fut: impl Future<Output = T>, secs: u64) -> Result<T, EvalError> {
    tokio::time::timeout(Duration::from_secs(secs), fut)
        .await
        .map_err(|_| EvalError::EvaluationFailed {
            detail: format!("no response from the model within {secs}s"),
        })
}

/// Build `CompletionOptions` from the evaluation config.
fn build_options(config: &EvaluationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Map a provider error onto the user-facing failure taxonomy.
///
/// Authentication failures get their own message because the fix (check the
/// key) is different from the fix for overload or oversized input. Provider
/// SDKs don't expose a stable error enum across backends, so this matches on
/// the rendered message.
fn translate_provider_error(detail: String) -> EvalError {
    let lower = detail.to_lowercase();
    let auth = lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("unauthorized")
        || lower.contains("unauthenticated")
        || lower.contains("permission denied")
        || lower.contains("401")
        || lower.contains("403");
    if auth {
        EvalError::InvalidApiKey { detail }
    } else {
        EvalError::EvaluationFailed { detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluationConfig;

    #[test]
    fn build_options_defaults() {
        let config = EvaluationConfig::default();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(8192));
    }

    #[tokio::test]
    async fn grading_is_bounded_by_the_configured_deadline() {
        let err = await_with_timeout(std::future::pending::<()>(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::EvaluationFailed { .. }));
        assert!(err
            .to_string()
            .contains("Failed to get a response from the AI"));
    }

    #[tokio::test]
    async fn completed_call_passes_through_the_deadline() {
        let value = await_with_timeout(async { 7usize }, 300).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[test]
    fn auth_errors_map_to_invalid_key() {
        for msg in [
            "API key not valid. Please pass a valid API key.",
            "HTTP 401 Unauthorized",
            "403 permission denied for project",
        ] {
            let err = translate_provider_error(msg.to_string());
            assert!(
                matches!(err, EvalError::InvalidApiKey { .. }),
                "expected InvalidApiKey for {:?}",
                msg
            );
        }
    }

    #[test]
    fn other_errors_map_to_evaluation_failed() {
        let err = translate_provider_error("model is overloaded, try again later".to_string());
        assert!(matches!(err, EvalError::EvaluationFailed { .. }));
        let rendered = format!("{}", err);
        assert!(rendered.contains("Failed to get a response from the AI"));
    }
}
