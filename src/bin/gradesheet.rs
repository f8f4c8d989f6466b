//! CLI binary for gradesheet.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EvaluationConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use gradesheet::{
    evaluate, export_report, EvaluationConfig, EvaluationOutput, ExportOptions, ReportTheme,
    REPORT_FILE_NAME, SECTION_SEPARATOR,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Grade an answer sheet (report to stdout)
  gradesheet questions.pdf answers.pdf

  # Grade against a model answer key
  gradesheet questions.pdf answers.pdf -k model-key.pdf

  # Export the report as a paginated PDF
  gradesheet questions.pdf answers.pdf --pdf -o report.pdf

  # Dark-themed export
  gradesheet questions.pdf answers.pdf --pdf --dark

  # Use a specific model
  gradesheet --provider openai --model gpt-4.1 questions.pdf answers.pdf

  # Structured JSON output (report + stats)
  gradesheet --json questions.pdf answers.pdf > result.json

SUPPORTED PROVIDERS:
  gemini (default when GEMINI_API_KEY is set), openai, anthropic, ollama,
  and any provider the factory can construct from its API key variable.
  The grading prompt was tuned against gemini-2.5-flash.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY         Google Gemini API key (preferred when present)
  OPENAI_API_KEY         OpenAI API key
  ANTHROPIC_API_KEY      Anthropic API key
  PDFIUM_LIB_PATH        Path to an existing libpdfium shared library

SETUP:
  1. Install pdfium:   place libpdfium next to the binary or set PDFIUM_LIB_PATH
  2. Set API key:      export GEMINI_API_KEY=...
  3. Grade:            gradesheet questions.pdf answers.pdf
"#;

/// Grade exam answer sheets against a question paper using a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "gradesheet",
    version,
    about = "Grade exam answer sheets against a question paper using a vision LLM",
    long_about = "Grade a scanned (often handwritten) answer sheet against a question paper, \
optionally guided by a model answer key. Every page of each PDF is sent to a vision model \
together with the extracted text and a detailed grading policy; the result is a per-question \
report with marks, feedback, and a final summary, printable or exportable as PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Question paper PDF.
    question_paper: PathBuf,

    /// Student answer sheet PDF.
    answer_sheet: PathBuf,

    /// Model answer key PDF (optional).
    #[arg(short = 'k', long = "model-key", env = "GRADESHEET_MODEL_KEY")]
    model_key: Option<PathBuf>,

    /// Also export the report as a paginated PDF.
    #[arg(long)]
    pdf: bool,

    /// Output path for the exported PDF.
    #[arg(short, long, env = "GRADESHEET_OUTPUT", default_value = REPORT_FILE_NAME)]
    output: PathBuf,

    /// Dark report theme for the PDF export.
    #[arg(long)]
    dark: bool,

    /// Vision model ID (e.g. gemini-2.5-flash, gpt-4.1).
    #[arg(long, env = "GRADESHEET_MODEL")]
    model: Option<String>,

    /// Provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "GRADESHEET_PROVIDER")]
    provider: Option<String>,

    /// Page raster upscale factor (0.5–4.0).
    #[arg(long, env = "GRADESHEET_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// JPEG quality for page rasters (1–100).
    #[arg(long, env = "GRADESHEET_JPEG_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "GRADESHEET_PASSWORD")]
    password: Option<String>,

    /// Max tokens the model may generate for the report.
    #[arg(long, env = "GRADESHEET_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "GRADESHEET_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Grading call timeout in seconds.
    #[arg(long, env = "GRADESHEET_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Output structured JSON (report + stats) instead of text.
    #[arg(long, env = "GRADESHEET_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "GRADESHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRADESHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(long, env = "GRADESHEET_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs duplicate the spinner's feedback, so they are
    // suppressed unless verbose mode asks for everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Run evaluation ───────────────────────────────────────────────────
    let spinner = if show_progress {
        Some(stage_spinner("Grading", "extracting pages and calling the model…"))
    } else {
        None
    };

    let result = evaluate(
        &cli.question_paper,
        &cli.answer_sheet,
        cli.model_key.as_deref(),
        &config,
    )
    .await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json {
        eprintln!(
            "{} Graded {} answer-sheet pages against {} question-paper pages",
            green("✔"),
            bold(&output.stats.answer_sheet_pages.to_string()),
            bold(&output.stats.question_paper_pages.to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    // ── Print the report ─────────────────────────────────────────────────
    if cli.json {
        print_json(&output)?;
    } else {
        print_sections(&output)?;
    }

    // ── Optional PDF export ──────────────────────────────────────────────
    if cli.pdf {
        let spinner = if show_progress {
            Some(stage_spinner("Exporting", "capturing the report…"))
        } else {
            None
        };
        let export_result = export_report(&output.report, &config.export).await;
        if let Some(ref bar) = spinner {
            bar.finish_and_clear();
        }
        let path = export_result.context("Export failed")?;
        if !cli.quiet {
            eprintln!("{} Report exported to {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    Ok(())
}

/// Spinner for a long single-stage operation.
fn stage_spinner(prefix: &str, message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix.to_string());
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map CLI args to `EvaluationConfig`.
fn build_config(cli: &Cli) -> Result<EvaluationConfig> {
    let export = ExportOptions {
        theme: if cli.dark {
            ReportTheme::Dark
        } else {
            ReportTheme::Light
        },
        output_path: cli.output.clone(),
        ..ExportOptions::default()
    };

    let mut builder = EvaluationConfig::builder()
        .render_scale(cli.scale)
        .jpeg_quality(cli.jpeg_quality)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .export(export);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Print the report sections to stdout, separated like the report view.
fn print_sections(output: &EvaluationOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let sections = output.report.sections();
    for (i, section) in sections.iter().enumerate() {
        if i > 0 {
            writeln!(handle, "\n{}\n", SECTION_SEPARATOR).context("Failed to write to stdout")?;
        }
        writeln!(handle, "{section}").context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Print the full result as pretty JSON.
fn print_json(output: &EvaluationOutput) -> Result<()> {
    let value = serde_json::json!({
        "report": output.report.as_str(),
        "sections": output.report.sections(),
        "stats": output.stats,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&value).context("Failed to serialise output")?
    );
    Ok(())
}
