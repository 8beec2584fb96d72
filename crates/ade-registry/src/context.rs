//! Per-kind invocation contexts.
//!
//! Fields wrapped in `Option` are optional: the engine only fills them when
//! the callable's [`Params`](crate::Params) declares them.

use ade_model::{
    ArtifactBuilder, CellValue, ColumnMap, ExtractedTable, FieldDef, HookStage, NoteLevel,
    OutputWorkbook, SourceSheet, SourceWorkbook,
};

use crate::state::{RunState, StateScope};

#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    /// 0-based sheet row.
    pub row_index: usize,
    pub row_values: &'a [CellValue],
    pub sheet_name: Option<&'a str>,
    pub state: Option<&'a RunState>,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnContext<'a> {
    /// Field the detector was registered for, if it is field-scoped.
    pub field: Option<&'a FieldDef>,
    /// 1-based sheet column.
    pub column_index: usize,
    pub table_index: usize,
    pub sheet_name: Option<&'a str>,
    /// Set during the header pass.
    pub header: Option<&'a str>,
    /// Set during the values pass.
    pub column_values_sample: Option<&'a [CellValue]>,
    pub state: Option<&'a RunState>,
}

#[derive(Debug)]
pub struct TransformContext<'a> {
    pub field: &'a FieldDef,
    pub values: &'a [CellValue],
    pub state: Option<StateScope<'a>>,
}

#[derive(Debug)]
pub struct ValidatorContext<'a> {
    pub field: &'a FieldDef,
    pub values: &'a [CellValue],
    pub state: Option<StateScope<'a>>,
}

/// Appends notes to the run's artifact on behalf of one hook.
#[derive(Debug)]
pub struct NoteSink<'a> {
    builder: &'a mut ArtifactBuilder,
    source: &'a str,
}

impl<'a> NoteSink<'a> {
    pub fn new(builder: &'a mut ArtifactBuilder, source: &'a str) -> Self {
        Self { builder, source }
    }

    pub fn add(&mut self, level: NoteLevel, message: impl Into<String>) {
        let details = serde_json::json!({ "source": self.source });
        self.builder.note(level, message, Some(details));
    }

    pub fn add_with_details(
        &mut self,
        level: NoteLevel,
        message: impl Into<String>,
        details: serde_json::Value,
    ) {
        let details = serde_json::json!({ "source": self.source, "details": details });
        self.builder.note(level, message, Some(details));
    }
}

#[derive(Debug)]
pub struct HookContext<'a> {
    pub stage: HookStage,
    pub workbook: Option<&'a SourceWorkbook>,
    pub sheet: Option<&'a SourceSheet>,
    pub table: Option<&'a ExtractedTable>,
    pub column_map: Option<&'a ColumnMap>,
    pub output: Option<&'a OutputWorkbook>,
    pub state: Option<StateScope<'a>>,
    pub notes: Option<NoteSink<'a>>,
}
