//! Pipeline stages for document ingestion and the model call.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap an
//! implementation (e.g. the rendering backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ encode ──▶ llm
//! (path)    (pdfium)    (jpeg/b64) (vision model)
//! ```
//!
//! 1. [`input`]   — validate the role-tagged file path and PDF magic bytes
//! 2. [`extract`] — walk every page: text layer plus one raster per page;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]  — JPEG-encode and base64-wrap each page raster for the
//!    multimodal request body
//! 4. [`llm`]     — the single atomic evaluation call; the only stage with
//!    network I/O

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
