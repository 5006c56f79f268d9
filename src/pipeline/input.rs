//! Input validation: make sure the source path is a readable document of the
//! expected format before any parser touches it.
//!
//! Checking the magic bytes up front gives callers a meaningful error
//! (`NotAPdf`, `NotADocx`) rather than a parser failure deep in pdfium or
//! the zip reader.

use crate::config::SourceFormat;
use crate::error::DocQaError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Validate `path` as a readable document of `format`.
///
/// Files shorter than four bytes skip the magic check and are left to the
/// parser, which reports them as corrupt.
pub fn resolve_local(path: &Path, format: SourceFormat) -> Result<PathBuf, DocQaError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(DocQaError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() {
                match format {
                    SourceFormat::Pdf if &magic != PDF_MAGIC => {
                        return Err(DocQaError::NotAPdf { path, magic });
                    }
                    SourceFormat::Docx if &magic != ZIP_MAGIC => {
                        return Err(DocQaError::NotADocx { path, magic });
                    }
                    _ => {}
                }
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocQaError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(DocQaError::FileNotFound { path });
        }
    }

    debug!("Resolved local {:?} document: {}", format, path.display());
    Ok(path)
}

/// Guess the source format of a path from its magic bytes, falling back to
/// the file extension.
pub fn detect_format(path: &Path) -> Option<SourceFormat> {
    let mut magic = [0u8; 4];
    if let Ok(mut f) = std::fs::File::open(path) {
        if f.read_exact(&mut magic).is_ok() {
            if &magic == PDF_MAGIC {
                return Some(SourceFormat::Pdf);
            }
            if &magic == ZIP_MAGIC {
                return Some(SourceFormat::Docx);
            }
        }
    }
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => Some(SourceFormat::Pdf),
        Some("docx") => Some(SourceFormat::Docx),
        _ => None,
    }
}
