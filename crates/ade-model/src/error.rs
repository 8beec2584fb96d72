use std::path::PathBuf;

use thiserror::Error;

use crate::run::ErrorInfo;
use crate::stage::{HookStage, PipelineStage};

/// Invariant violations in model constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error(
        "invalid table region: header_row={header_row}, first_col={first_col}, \
         last_row={last_row}, last_col={last_col}"
    )]
    InvalidRegion {
        header_row: usize,
        first_col: usize,
        last_row: usize,
        last_col: usize,
    },
}

/// Every failure a run can end with.
///
/// `Config` and `Input` are raised before any table work starts. `Hook` and
/// `Pipeline` abort a run that has already captured partial results.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {message}")]
    Config {
        message: String,
        extension: Option<String>,
    },

    #[error("input error: {message}")]
    Input {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("hook '{hook}' failed during {stage}: {message}")]
    Hook {
        stage: HookStage,
        hook: String,
        message: String,
    },

    #[error("{stage}: extension '{extension}' violated its contract: {message}")]
    Pipeline {
        stage: PipelineStage,
        extension: String,
        message: String,
    },

    #[error("unexpected failure during {stage}: {message}")]
    Unknown {
        stage: PipelineStage,
        message: String,
    },

    #[error("illegal run transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            extension: None,
        }
    }

    pub fn config_for(extension: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            extension: Some(extension.into()),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            path: None,
        }
    }

    pub fn input_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn pipeline(
        stage: PipelineStage,
        extension: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Pipeline {
            stage,
            extension: extension.into(),
            message: message.into(),
        }
    }

    pub fn unknown(stage: PipelineStage, message: impl Into<String>) -> Self {
        Self::Unknown {
            stage,
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config_error",
            Self::Input { .. } => "input_error",
            Self::Hook { .. } => "hook_error",
            Self::Pipeline { .. } => "pipeline_error",
            Self::Unknown { .. } => "unknown_error",
            Self::InvalidTransition { .. } => "internal_error",
        }
    }

    /// Stage the error originated in, when known.
    pub fn stage(&self) -> Option<String> {
        match self {
            Self::Config { .. } => Some(PipelineStage::Registry.to_string()),
            Self::Input { .. } => Some(PipelineStage::Ingest.to_string()),
            Self::Hook { stage, .. } => Some(stage.to_string()),
            Self::Pipeline { stage, .. } | Self::Unknown { stage, .. } => Some(stage.to_string()),
            Self::InvalidTransition { .. } => None,
        }
    }

    /// Identity of the extension at fault, when one is known.
    pub fn extension(&self) -> Option<&str> {
        match self {
            Self::Config { extension, .. } => extension.as_deref(),
            Self::Hook { hook, .. } => Some(hook),
            Self::Pipeline { extension, .. } => Some(extension),
            Self::Input { .. } | Self::Unknown { .. } | Self::InvalidTransition { .. } => None,
        }
    }

    /// True for errors raised before any table work.
    pub fn is_pre_run(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Input { .. })
    }

    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code().to_string(),
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

impl From<ModelError> for EngineError {
    fn from(error: ModelError) -> Self {
        Self::unknown(PipelineStage::Orchestration, error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::config("x").code(), "config_error");
        assert_eq!(EngineError::input("x").code(), "input_error");
        let err = EngineError::pipeline(PipelineStage::Validation, "email.at_sign", "bad row");
        assert_eq!(err.code(), "pipeline_error");
        assert_eq!(err.stage().as_deref(), Some("validation"));
        assert_eq!(err.extension(), Some("email.at_sign"));
    }

    #[test]
    fn hook_error_carries_stage_and_identity() {
        let err = EngineError::Hook {
            stage: HookStage::OnTableMapped,
            hook: "filter".to_string(),
            message: "boom".to_string(),
        };
        let info = err.to_info();
        assert_eq!(info.code, "hook_error");
        assert_eq!(info.stage.as_deref(), Some("on_table_mapped"));
        assert_eq!(
            info.message,
            "hook 'filter' failed during on_table_mapped: boom"
        );
    }

    #[test]
    fn pre_run_classification() {
        assert!(EngineError::config("x").is_pre_run());
        assert!(EngineError::input_path("/tmp/a.csv", "missing").is_pre_run());
        assert!(!EngineError::unknown(PipelineStage::Output, "disk full").is_pre_run());
    }
}
