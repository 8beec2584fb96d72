//! Artifact persistence.

use std::fs;
use std::path::Path;

use ade_model::{Artifact, EngineError, PipelineStage};
use tracing::debug;

/// Writes the artifact as pretty JSON, creating parent directories.
pub fn write_artifact(artifact: &Artifact, path: &Path) -> Result<(), EngineError> {
    let fail = |error: String| {
        EngineError::unknown(
            PipelineStage::Output,
            format!("write artifact {}: {error}", path.display()),
        )
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| fail(error.to_string()))?;
    }
    let mut json = serde_json::to_string_pretty(artifact).map_err(|error| fail(error.to_string()))?;
    json.push('\n');
    fs::write(path, json).map_err(|error| fail(error.to_string()))?;
    debug!(path = %path.display(), tables = artifact.tables.len(), "wrote artifact");
    Ok(())
}

/// Reads an artifact back; unknown fields are rejected.
pub fn read_artifact(path: &Path) -> Result<Artifact, EngineError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        EngineError::input_path(path, format!("read artifact {}: {error}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        EngineError::input_path(path, format!("parse artifact {}: {error}", path.display()))
    })
}
