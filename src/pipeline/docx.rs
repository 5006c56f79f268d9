//! Word (.docx) text extraction.
//!
//! A .docx file is a zip archive; the body lives in `word/document.xml`.
//! Only the top-level body paragraphs are read (paragraphs inside tables
//! and text boxes are skipped). A paragraph's text is the concatenation of
//! its runs: `w:t` contributes its text, `w:tab` a tab, `w:br`/`w:cr` a
//! newline. Paragraphs whose trimmed text is empty are dropped and the rest
//! are joined with `\n`.

use crate::error::DocQaError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract the text of a .docx document.
///
/// Runs inside `spawn_blocking` since unzipping and XML parsing are
/// synchronous.
pub async fn extract_text(path: &Path) -> Result<String, DocQaError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path))
        .await
        .map_err(|e| DocQaError::Internal(format!("Docx extraction task panicked: {}", e)))?
}

/// Blocking implementation of [`extract_text`].
pub fn extract_text_blocking(path: &Path) -> Result<String, DocQaError> {
    let corrupt = |detail: String| DocQaError::CorruptDocx {
        path: path.to_path_buf(),
        detail,
    };

    let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupt(e.to_string()))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| corrupt(format!("{DOCUMENT_PART}: {e}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| corrupt(format!("{DOCUMENT_PART}: {e}")))?;

    let paragraphs = body_paragraphs(&xml).map_err(|e| corrupt(e.to_string()))?;
    info!("Word document loaded: {} body paragraphs", paragraphs.len());

    let text = join_paragraphs(&paragraphs);
    debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn open_error(path: &Path, e: std::io::Error) -> DocQaError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::NotFound => DocQaError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => DocQaError::PermissionDenied { path },
        _ => DocQaError::CorruptDocx {
            path,
            detail: e.to_string(),
        },
    }
}

/// Join paragraph texts with `\n`, skipping whitespace-only paragraphs.
pub fn join_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> String {
    paragraphs
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the element path below a body paragraph is a run, optionally
/// wrapped in a hyperlink.
fn is_run_path(path: &[Vec<u8>]) -> bool {
    match path {
        [r] => r == b"w:r",
        [h, r] => h == b"w:hyperlink" && r == b"w:r",
        _ => false,
    }
}

/// Parse `word/document.xml` into the texts of its top-level body paragraphs,
/// in document order. Blank paragraphs are kept here.
pub fn body_paragraphs(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    // Stack depth of the open body paragraph, with its text so far.
    let mut current: Option<(usize, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"w:p" && current.is_none() && stack.last().is_some_and(|p| p == b"w:body") {
                    current = Some((stack.len(), String::new()));
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.name();
                match current {
                    Some((depth, ref mut text)) if is_run_path(&stack[depth + 1..]) => {
                        match name.as_ref() {
                            b"w:tab" => text.push('\t'),
                            b"w:br" | b"w:cr" => text.push('\n'),
                            _ => {}
                        }
                    }
                    None if name.as_ref() == b"w:p"
                        && stack.last().is_some_and(|p| p == b"w:body") =>
                    {
                        paragraphs.push(String::new());
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some((depth, ref mut text)) = current {
                    let below = &stack[depth + 1..];
                    if below.last().is_some_and(|n| n == b"w:t")
                        && is_run_path(&below[..below.len() - 1])
                    {
                        text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
                if let Some((depth, _)) = current {
                    if stack.len() == depth {
                        if let Some((_, text)) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}
