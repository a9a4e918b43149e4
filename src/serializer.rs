// src/serializer.rs
//
// Persists the tracking document. Writes go to a temporary sibling file that
// is renamed into place, so an interrupted or failed write never leaves a
// half-written document for a renderer to trip over.

use crate::error::{PipelineError, Result};
use crate::types::TrackingDocument;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

fn serialization_error(path: &Path, message: impl ToString) -> PipelineError {
    PipelineError::Serialization {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tracking".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the document as pretty-printed JSON, creating parent directories
/// as needed. Atomic: either the complete document lands at `path` or the
/// previous state is untouched.
pub fn write_document(document: &TrackingDocument, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| serialization_error(path, e))?;
        }
    }

    let tmp = temp_sibling(path);
    debug!("Writing tracking document via {}", tmp.display());

    let result = write_and_rename(document, &tmp, path);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(document: &TrackingDocument, tmp: &Path, path: &Path) -> Result<()> {
    let file = File::create(tmp).map_err(|e| serialization_error(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)
        .map_err(|e| serialization_error(path, e))?;
    // BufWriter's drop swallows the final flush error; surface it here so a
    // full disk cannot install a truncated document.
    writer.flush().map_err(|e| serialization_error(path, e))?;
    fs::rename(tmp, path).map_err(|e| serialization_error(path, e))
}

/// Parses a previously written document. Consumers check `version` before
/// interpreting `frames`; so do we.
pub fn read_document(path: &Path) -> Result<TrackingDocument> {
    let contents = fs::read_to_string(path).map_err(|e| serialization_error(path, e))?;

    // Forward-readability: surface the version before a full parse.
    let probe: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| serialization_error(path, e))?;
    let version = probe
        .get("version")
        .and_then(|v| v.as_str())
        .ok_or_else(|| serialization_error(path, "document missing version field"))?;
    if version != crate::types::SCHEMA_VERSION {
        return Err(serialization_error(
            path,
            format!("unsupported schema version {:?}", version),
        ));
    }

    serde_json::from_str(&contents).map_err(|e| serialization_error(path, e))
}
