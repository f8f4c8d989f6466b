//! Configuration types for answer-sheet evaluation.
//!
//! All behaviour is controlled through [`EvaluationConfig`], built via its
//! [`EvaluationConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across calls and to diff two runs to understand
//! why their reports differ.
//!
//! The vision credential is never read as ambient global state by the
//! evaluation path: either the caller injects a pre-built provider (the
//! testable route), names a provider whose key the factory reads once, or the
//! environment fallback in [`crate::evaluate`] resolves one at call time.

use crate::error::EvalError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default vision model. The grading prompt was tuned against Gemini's
/// flash tier; any vision-capable model the provider factory knows works.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Fixed name of the exported report file.
pub const REPORT_FILE_NAME: &str = "evaluation-report.pdf";

/// Configuration for one evaluation run.
///
/// Built via [`EvaluationConfig::builder()`] or [`EvaluationConfig::default()`].
///
/// # Example
/// ```rust
/// use gradesheet::EvaluationConfig;
///
/// let config = EvaluationConfig::builder()
///     .render_scale(1.5)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct EvaluationConfig {
    /// Upscale factor applied when rasterising each PDF page. Default: 1.5.
    ///
    /// 1.5× balances image fidelity for diagrams and handwriting against
    /// request payload size. Raise it for cramped handwriting; lower it for
    /// very long answer booklets where upload size matters more.
    pub render_scale: f32,

    /// JPEG quality (1–100) for page rasters. Default: 90.
    ///
    /// Page images ride inside the JSON request body as base64, so quality
    /// trades directly against payload size. 90 keeps pen strokes legible
    /// while staying well under typical API upload limits.
    pub jpeg_quality: u8,

    /// Maximum rendered image dimension (width or height) in pixels.
    /// Default: 2000. A safety cap independent of scale: an A0-sized page at
    /// 1.5× could otherwise exhaust memory.
    pub max_rendered_pixels: u32,

    /// Vision model identifier. If `None`, [`DEFAULT_MODEL`] is used.
    pub model: Option<String>,

    /// Provider name (e.g. "gemini", "openai", "anthropic"). If `None` along
    /// with `provider`, the environment is consulted at call time.
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    /// This is the injection point for tests: supply a fake transport here
    /// and no credential or network is ever touched.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Grading should be deterministic and faithful to what is on the page;
    /// higher values introduce creativity that hurts scoring consistency.
    pub temperature: f32,

    /// Maximum tokens the model may generate for the whole report.
    /// Default: 8192. A full exam report with per-question feedback runs far
    /// longer than a single transcribed page; setting this too low truncates
    /// the summary block mid-sentence.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: 300. The evaluation is a single
    /// atomic request carrying every page image of up to three documents, so
    /// it needs far more headroom than a per-page call would.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents, applied to all three.
    pub password: Option<String>,

    /// Report export options.
    pub export: ExportOptions,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            jpeg_quality: 90,
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            api_timeout_secs: 300,
            password: None,
            export: ExportOptions::default(),
        }
    }
}

impl fmt::Debug for EvaluationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationConfig")
            .field("render_scale", &self.render_scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("export", &self.export)
            .finish()
    }
}

impl EvaluationConfig {
    /// Create a new builder for `EvaluationConfig`.
    pub fn builder() -> EvaluationConfigBuilder {
        EvaluationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EvaluationConfig`].
#[derive(Debug)]
pub struct EvaluationConfigBuilder {
    config: EvaluationConfig,
}

impl EvaluationConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn export(mut self, options: ExportOptions) -> Self {
        self.config.export = options;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EvaluationConfig, EvalError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(EvalError::InvalidConfig(format!(
                "render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(EvalError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_tokens == 0 {
            return Err(EvalError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Export options ───────────────────────────────────────────────────────

/// Background theme for the exported report, matching what was on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReportTheme {
    /// Slate-100 background with dark text. (default)
    #[default]
    Light,
    /// Slate-900 background with light text.
    Dark,
}

/// Options for the report-to-PDF export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Capture upscale factor. Default: 1.5.
    pub scale: f32,

    /// JPEG quality for the captured report image. Default: 85.
    ///
    /// The capture of a long report is one very tall image; 85 bounds the
    /// output file size without visibly degrading rendered text.
    pub jpeg_quality: u8,

    /// Background theme honoured by the capture.
    pub theme: ReportTheme,

    /// Output path. Default: [`REPORT_FILE_NAME`] in the working directory.
    pub output_path: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 1.5,
            jpeg_quality: 85,
            theme: ReportTheme::default(),
            output_path: PathBuf::from(REPORT_FILE_NAME),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let c = EvaluationConfig::default();
        assert_eq!(c.render_scale, 1.5);
        assert_eq!(c.jpeg_quality, 90);
        assert_eq!(c.export.scale, 1.5);
        assert_eq!(c.export.jpeg_quality, 85);
        assert_eq!(c.export.output_path, PathBuf::from("evaluation-report.pdf"));
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = EvaluationConfig::builder()
            .render_scale(10.0)
            .jpeg_quality(250)
            .temperature(-1.0)
            .build()
            .unwrap();
        assert_eq!(c.render_scale, 4.0);
        assert_eq!(c.jpeg_quality, 100);
        assert_eq!(c.temperature, 0.0);
    }

    #[test]
    fn zero_max_tokens_is_rejected() {
        let err = EvaluationConfig::builder().max_tokens(0).build().unwrap_err();
        assert!(matches!(err, EvalError::InvalidConfig(_)));
    }
}
