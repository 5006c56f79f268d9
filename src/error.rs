//! Error types for the docqa library.
//!
//! Two error types reflect two distinct failure modes:
//!
//! * [`DocQaError`] — **Fatal** for one pipeline run: the source document
//!   cannot be read, the configuration is unusable, or the dataset cannot be
//!   written. Returned as `Err(DocQaError)` from the `prepare_*` entry points.
//!
//! * [`GenerationError`] — the generative call did not yield a usable JSON
//!   array. The service may have failed (network, auth, quota) or answered
//!   with something that is not a non-empty list. Callers of
//!   [`crate::pipeline::llm::generate_records`] must handle it explicitly;
//!   the `prepare_*` entry points wrap it in [`DocQaError::Generation`].
//!
//! Nothing in this crate retries. Every failure means "log and stop" for the
//! run that hit it, and nothing is written.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docqa library.
#[derive(Debug, Error)]
pub enum DocQaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source document not found: '{path}'\nCheck raw_data_dir in the config file.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The file exists and was read, but is not a Word (.docx) archive.
    #[error("File is not a valid .docx document: '{path}'\nFirst bytes: {magic:?}")]
    NotADocx { path: PathBuf, magic: [u8; 4] },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt or the text layer cannot be read.
    #[error("PDF '{path}' could not be read: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The .docx archive or its `word/document.xml` part is damaged.
    #[error("Word document '{path}' could not be read: {detail}")]
    CorruptDocx { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF text extraction needs the pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory), or\n\
  • install libpdfium somewhere on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    /// Extraction succeeded but produced nothing but whitespace.
    #[error("No text could be extracted from '{path}'; nothing to process")]
    EmptyDocument { path: PathBuf },

    // ── Generation errors ─────────────────────────────────────────────────
    /// The generative call failed or returned an unusable response.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// No provider could be built (missing API key etc.).
    #[error("Generation provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset could not be serialised to JSON.
    #[error("Failed to serialise dataset: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// The YAML configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The YAML configuration file is not valid for this schema.
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A path the selected pipeline needs is absent from the config file.
    #[error("Config key '{key}' is missing.\nAdd it to the config file or pass the path on the command line.")]
    MissingConfigKey { key: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a generative call produced no dataset.
///
/// The first group of variants are service failures; the last three are
/// response-shape failures (the service answered, but not with a non-empty
/// JSON array).
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP request could not be sent or the connection broke.
    #[error("Request to the generation service failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The request exceeded the configured timeout.
    #[error("Generation request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service rejected the credential (HTTP 401/403).
    #[error("Authentication error from '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429 — quota or rate limit exhausted.
    #[error("Rate limit exceeded for '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// Any other non-success HTTP status.
    #[error("Generation API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected envelope.
    #[error("Malformed response from the generation service: {detail}")]
    MalformedResponse { detail: String },

    /// The service answered without any candidate text (blocked, filtered).
    #[error("Generation service returned no text{}", .reason.as_ref().map(|r| format!(" ({r})")).unwrap_or_default())]
    EmptyResponse { reason: Option<String> },

    /// The returned text is not JSON.
    #[error("Could not parse JSON from the generated text: {source}")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
    },

    /// The returned JSON is valid but its top level is not an array.
    #[error("Generated JSON is a {found}, expected a list of Q&A objects")]
    NotAnArray { found: &'static str },

    /// The returned JSON array is empty.
    #[error("Generated JSON list is empty; no Q&A pairs to write")]
    EmptyArray,
}
