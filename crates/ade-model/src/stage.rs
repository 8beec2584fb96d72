use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage an error or event is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Registry,
    Ingest,
    RowClassification,
    ColumnMapping,
    Transform,
    Validation,
    Render,
    Output,
    Orchestration,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Ingest => "ingest",
            Self::RowClassification => "row_classification",
            Self::ColumnMapping => "column_mapping",
            Self::Transform => "transform",
            Self::Validation => "validation",
            Self::Render => "render",
            Self::Output => "output",
            Self::Orchestration => "orchestration",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle checkpoints where hooks fire, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    OnWorkbookStart,
    OnSheetStart,
    OnTableDetected,
    OnTableMapped,
    OnTableWritten,
    OnWorkbookBeforeSave,
}

impl HookStage {
    pub const ALL: [Self; 6] = [
        Self::OnWorkbookStart,
        Self::OnSheetStart,
        Self::OnTableDetected,
        Self::OnTableMapped,
        Self::OnTableWritten,
        Self::OnWorkbookBeforeSave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnWorkbookStart => "on_workbook_start",
            Self::OnSheetStart => "on_sheet_start",
            Self::OnTableDetected => "on_table_detected",
            Self::OnTableMapped => "on_table_mapped",
            Self::OnTableWritten => "on_table_written",
            Self::OnWorkbookBeforeSave => "on_workbook_before_save",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
