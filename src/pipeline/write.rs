//! Pretty JSON output.
//!
//! Datasets are serialised in memory first, then written to a sibling
//! `.json.tmp` file and renamed over the target, so a failed run never leaves
//! a half-written dataset behind. Non-ASCII text is written literally.

use crate::error::DocQaError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialise `value` as JSON indented by `indent` spaces.
pub fn to_pretty_json<T: Serialize + ?Sized>(
    value: &T,
    indent: usize,
) -> Result<Vec<u8>, DocQaError> {
    let indent = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Write `value` to `path`, creating parent directories and overwriting any
/// existing file. Returns the path written.
pub async fn write_json<T: Serialize + ?Sized>(
    value: &T,
    path: &Path,
    indent: usize,
) -> Result<PathBuf, DocQaError> {
    let bytes = to_pretty_json(value, indent)?;
    let write_failed = |e: std::io::Error| DocQaError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path.to_path_buf())
}
