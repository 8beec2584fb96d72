//! Run request and result types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::settings::SettingsOverrides;

pub const OUTPUT_SUFFIX: &str = ".normalized.xlsx";
pub const EVENTS_FILE: &str = "events.ndjson";
pub const ARTIFACT_FILE: &str = "artifact.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Serializable error summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorInfo {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub config_package_path: PathBuf,
    pub input_file_path: PathBuf,
    /// Restricts processing to these sheets, in the given order.
    pub input_sheet_names: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    /// Event log file; its parent becomes the logs directory.
    pub logs_path: Option<PathBuf>,
    #[serde(default)]
    pub settings: SettingsOverrides,
}

impl RunRequest {
    pub fn new(config_package_path: impl Into<PathBuf>, input_file_path: impl Into<PathBuf>) -> Self {
        Self {
            config_package_path: config_package_path.into(),
            input_file_path: input_file_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_sheets<I, S>(mut self, sheets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_sheet_names = Some(sheets.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_logs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.logs_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SettingsOverrides) -> Self {
        self.settings = settings;
        self
    }

    /// Input file name without its extension.
    pub fn input_stem(&self) -> String {
        self.input_file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string())
    }

    pub fn input_file_name(&self) -> String {
        self.input_file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn resolve_output_path(&self) -> PathBuf {
        if let Some(path) = &self.output_path {
            return path.clone();
        }
        let file_name = format!("{}{OUTPUT_SUFFIX}", self.input_stem());
        match &self.output_dir {
            Some(dir) => dir.join(file_name),
            None => input_dir(&self.input_file_path).join("output").join(file_name),
        }
    }

    pub fn resolve_events_path(&self) -> PathBuf {
        if let Some(path) = &self.logs_path {
            return path.clone();
        }
        self.resolve_logs_dir().join(EVENTS_FILE)
    }

    pub fn resolve_logs_dir(&self) -> PathBuf {
        if let Some(path) = &self.logs_path {
            return input_dir(path).to_path_buf();
        }
        if let Some(dir) = &self.logs_dir {
            return dir.clone();
        }
        input_dir(&self.resolve_output_path()).join("logs")
    }

    pub fn resolve_artifact_path(&self) -> PathBuf {
        self.resolve_logs_dir().join(ARTIFACT_FILE)
    }
}

fn input_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub output_path: Option<PathBuf>,
    pub logs_dir: PathBuf,
    pub artifact_path: Option<PathBuf>,
    pub processed_file: Option<String>,
    pub error: Option<ErrorInfo>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}
