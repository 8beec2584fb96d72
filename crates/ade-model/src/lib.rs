//! Shared data types for the ADE normalization engine.

pub mod artifact;
pub mod cell;
pub mod error;
pub mod field;
pub mod issue;
pub mod mapping;
pub mod output;
pub mod redact;
pub mod region;
pub mod run;
pub mod settings;
pub mod stage;
pub mod table;

pub use artifact::{
    ARTIFACT_SCHEMA, Artifact, ArtifactBuilder, ConfigReport, HeaderReport, MappedColumnReport,
    Note, NoteLevel, OutputReport, RunReport, TableHandle, TableReport, UnmappedColumnReport,
};
pub use cell::{CellValue, format_number, text_row};
pub use error::{EngineError, ModelError, Result};
pub use field::{DataType, FieldDef, parse_date};
pub use issue::{Severity, ValidationIssue};
pub use mapping::{ColumnMap, Contribution, MappedColumn, UnmappedColumn, UnmappedReason};
pub use output::{OutputRow, OutputSheet, OutputWorkbook, TablePlacement};
pub use redact::{REDACTED_VALUE, log_data_enabled, redact_value, set_log_data};
pub use region::{RowKind, TableRegion};
pub use run::{ErrorInfo, RunRequest, RunResult, RunStatus};
pub use settings::{ConflictPolicy, EngineSettings, SettingsOverrides};
pub use stage::{HookStage, PipelineStage};
pub use table::{ExtractedTable, NormalizedTable, SourceSheet, SourceWorkbook};
