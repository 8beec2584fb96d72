//! The run report persisted next to the event log.
//!
//! An [`ArtifactBuilder`] accumulates tables, notes and outputs while the run
//! progresses; [`ArtifactBuilder::seal`] consumes it, so an artifact is sealed
//! exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::issue::ValidationIssue;
use crate::mapping::{ColumnMap, Contribution};
use crate::output::TablePlacement;
use crate::run::{ErrorInfo, RunStatus};
use crate::table::ExtractedTable;

pub const ARTIFACT_SCHEMA: &str = "ade.artifact/v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Artifact {
    pub schema: String,
    pub run: RunReport,
    pub config: ConfigReport,
    pub tables: Vec<TableReport>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunReport {
    pub id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outputs: Vec<OutputReport>,
    pub engine_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputReport {
    pub path: String,
    pub tables: Vec<TablePlacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigReport {
    pub schema: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableReport {
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sheet: Option<String>,
    pub table_index: usize,
    pub header: HeaderReport,
    pub mapped_columns: Vec<MappedColumnReport>,
    pub unmapped_columns: Vec<UnmappedColumnReport>,
    pub validation_issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderReport {
    /// 1-based sheet row of the header.
    pub row_index: usize,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappedColumnReport {
    pub field: String,
    pub header: String,
    pub source_column_index: usize,
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnmappedColumnReport {
    pub header: String,
    pub source_column_index: usize,
    pub output_header: Option<String>,
}

impl TableReport {
    pub fn from_mapping(table: &ExtractedTable, column_map: &ColumnMap) -> Self {
        Self {
            source_file: table.source_file.clone(),
            source_sheet: table.source_sheet.clone(),
            table_index: table.table_index,
            header: HeaderReport {
                row_index: table.region.header_row(),
                cells: table.header.iter().map(|cell| cell.to_trimmed_string()).collect(),
            },
            mapped_columns: column_map
                .mapped
                .iter()
                .map(|column| MappedColumnReport {
                    field: column.field.clone(),
                    header: column.header_text.clone(),
                    source_column_index: column.source_column_index,
                    score: column.score,
                    contributions: column.contributions.clone(),
                })
                .collect(),
            unmapped_columns: column_map
                .unmapped
                .iter()
                .map(|column| UnmappedColumnReport {
                    header: column.header_text.clone(),
                    source_column_index: column.source_column_index,
                    output_header: column.output_header.clone(),
                })
                .collect(),
            validation_issues: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl NoteLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Note {
    pub timestamp: DateTime<Utc>,
    pub level: NoteLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Opaque reference to a table pushed into an [`ArtifactBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHandle(usize);

#[derive(Debug)]
pub struct ArtifactBuilder {
    run_id: String,
    engine_version: String,
    started_at: DateTime<Utc>,
    config: ConfigReport,
    tables: Vec<TableReport>,
    notes: Vec<Note>,
    outputs: Vec<OutputReport>,
}

impl ArtifactBuilder {
    pub fn new(
        run_id: impl Into<String>,
        engine_version: impl Into<String>,
        started_at: DateTime<Utc>,
        config: ConfigReport,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            engine_version: engine_version.into(),
            started_at,
            config,
            tables: Vec::new(),
            notes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn push_table(&mut self, report: TableReport) -> TableHandle {
        self.tables.push(report);
        TableHandle(self.tables.len() - 1)
    }

    pub fn append_issues(&mut self, handle: TableHandle, issues: &[ValidationIssue]) {
        if let Some(table) = self.tables.get_mut(handle.0) {
            table.validation_issues.extend_from_slice(issues);
        }
    }

    /// Replaces the mapping section of a table, keeping its issues.
    pub fn update_mapping(&mut self, handle: TableHandle, report: TableReport) {
        if let Some(table) = self.tables.get_mut(handle.0) {
            let issues = std::mem::take(&mut table.validation_issues);
            *table = report;
            table.validation_issues = issues;
        }
    }

    pub fn note(
        &mut self,
        level: NoteLevel,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) {
        self.notes.push(Note {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            details,
        });
    }

    pub fn push_output(&mut self, output: OutputReport) {
        self.outputs.push(output);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn seal(self, status: RunStatus, error: Option<ErrorInfo>) -> Artifact {
        Artifact {
            schema: ARTIFACT_SCHEMA.to_string(),
            run: RunReport {
                id: self.run_id,
                status,
                started_at: self.started_at,
                completed_at: Utc::now(),
                outputs: self.outputs,
                engine_version: self.engine_version,
                error,
            },
            config: self.config,
            tables: self.tables,
            notes: self.notes,
        }
    }
}
