//! PDF text extraction via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, whose calls are synchronous
//! and CPU-bound. `tokio::task::spawn_blocking` keeps them off the Tokio
//! worker threads.
//!
//! ## Binding
//!
//! pdfium is loaded at runtime. `PDFIUM_LIB_PATH` (or
//! [`PipelineConfig::pdfium_lib_path`]) may point at the shared library or at
//! the directory holding it; otherwise the system library search path is
//! used. A failed bind surfaces as [`DocQaError::PdfiumBindingFailed`].

use crate::config::PipelineConfig;
use crate::error::DocQaError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the pdfium library or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the text of every page, in page order.
pub async fn extract_text(pdf_path: &Path, config: &PipelineConfig) -> Result<String, DocQaError> {
    let path = pdf_path.to_path_buf();
    let password = config.password.clone();
    let lib_path = config
        .pdfium_lib_path
        .clone()
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    tokio::task::spawn_blocking(move || {
        extract_text_blocking(&path, password.as_deref(), lib_path.as_deref())
    })
    .await
    .map_err(|e| DocQaError::Internal(format!("PDF extraction task panicked: {}", e)))?
}

fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, DocQaError> {
    let bindings = match lib_path {
        Some(p) if p.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(p))
        }
        Some(p) => Pdfium::bind_to_library(p),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| {
        let location = lib_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "system library path".to_string());
        DocQaError::PdfiumBindingFailed(format!(
            "{:?} (searched {}; set {} to the pdfium library)",
            e, location, PDFIUM_LIB_PATH_ENV
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of [`extract_text`].
fn extract_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<String, DocQaError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                DocQaError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                DocQaError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            DocQaError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page.text().map_err(|e| DocQaError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        let text = text.all();
        debug!("Page {} → {} chars", idx + 1, text.len());
        texts.push(text);
    }

    Ok(assemble_pages(texts))
}

/// Concatenate per-page text in page order.
///
/// Line endings are normalised to `\n`, each non-blank page is terminated by
/// a newline so the next page starts on a fresh line, and blank pages are
/// dropped.
pub fn assemble_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for page in pages {
        let page = page.as_ref().replace("\r\n", "\n").replace('\r', "\n");
        if page.trim().is_empty() {
            continue;
        }
        out.push_str(&page);
        if !page.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
