//! # docqa
//!
//! Turn raw company documents into JSON question/answer datasets for a
//! downstream language-model application.
//!
//! ## Pipelines
//!
//! | Pipeline | Source | Strategy | Output keys | Indent |
//! |----------|--------|----------|-------------|--------|
//! | `company-description`    | .docx | generative (Gemini) | `Question` / `Answer`     | 4 |
//! | `product-manual`         | PDF   | generative (Gemini) | `instruction` / `response` | 4 |
//! | `product-specifications` | PDF   | regex + flattening  | `Question` / `Answer`     | 2 |
//!
//! ```text
//! document
//!  │
//!  ├─ 1. Input     check the path and its magic bytes
//!  ├─ 2. Extract   .docx paragraphs / PDF page text (spawn_blocking)
//!  ├─ 3. Synthesise  one Gemini call → JSON array, or product-block regex
//!  ├─ 4. Flatten   product records → Q&A pairs (pattern pipeline only)
//!  └─ 5. Write     pretty JSON, non-ASCII kept literally
//! ```
//!
//! Runs are strictly sequential and make at most one network call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docqa::{prepare_product_specifications, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let outcome = prepare_product_specifications(
//!         "data/raw/product_specifications.pdf",
//!         "data/json/product_specifications.json",
//!         None,
//!         &config,
//!     )
//!     .await?;
//!     eprintln!("{} pairs", outcome.stats().items);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docqa` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Runtime requirements
//!
//! PDF pipelines load the pdfium shared library at runtime, from
//! `PDFIUM_LIB_PATH` or the system library path. Generative pipelines need a
//! Gemini API key in `GOOGLE_API_KEY` (or the variable named in config).

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prepare;
pub mod progress;
pub mod prompts;
pub mod provider;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    find_project_root, PipelineConfig, PipelineConfigBuilder, PipelineJob, PipelineKind,
    ProjectConfig, SourceFormat,
};
pub use error::{DocQaError, GenerationError};
pub use output::{
    DatasetKind, DatasetStats, InstructionResponse, PipelineOutcome, ProductRecord,
    QuestionAnswer,
};
pub use prepare::{
    extract_text, prepare_company_description, prepare_product_manual,
    prepare_product_specifications, run, run_sync,
};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use provider::{GeminiProvider, Generation, GenerationOptions, GenerativeProvider};
