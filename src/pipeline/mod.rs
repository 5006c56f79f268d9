//! Pipeline stages for document-to-dataset preparation.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//!                 ┌──▶ llm ───────────────────────────┐
//! input ──▶ docx/pdf                                   ├──▶ write
//! (path)   (text)  └──▶ products ──▶ flatten ─────────┘
//!                     (regex)       (Q&A pairs)
//! ```
//!
//! 1. [`input`]   — validate the source path and its magic bytes
//! 2. [`docx`] / [`pdf`] — pull the text out of the document; both run in
//!    `spawn_blocking` because parsing is synchronous
//! 3. [`llm`]     — generative strategy: one prompt, one JSON array back
//! 4. [`products`] — pattern strategy: segment product blocks
//! 5. [`flatten`] — product records → `{Question, Answer}` pairs
//! 6. [`postprocess`] — deterministic text cleanup on both sides of the
//!    service call
//! 7. [`write`]   — pretty JSON to disk

pub mod docx;
pub mod flatten;
pub mod input;
pub mod llm;
pub mod pdf;
pub mod postprocess;
pub mod products;
pub mod write;
