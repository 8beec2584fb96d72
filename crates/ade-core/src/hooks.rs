//! Lifecycle hook dispatch.

use std::collections::BTreeSet;

use ade_model::{
    ArtifactBuilder, ColumnMap, EngineError, ExtractedTable, HookStage, OutputWorkbook,
    SourceSheet, SourceWorkbook, TableRegion,
};
use ade_registry::{HookContext, NoteSink, Registry, Replacement, RunState};
use tracing::{debug, trace};

/// Values a stage shows its hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookView<'a> {
    pub workbook: Option<&'a SourceWorkbook>,
    pub sheet: Option<&'a SourceSheet>,
    pub table: Option<&'a ExtractedTable>,
    pub column_map: Option<&'a ColumnMap>,
    pub output: Option<&'a OutputWorkbook>,
}

/// Replacements installed while a stage ran. The caller swaps them in for
/// the originals.
#[derive(Debug, Default)]
pub struct Replaced {
    pub workbook: Option<SourceWorkbook>,
    pub sheet: Option<SourceSheet>,
    pub table: Option<ExtractedTable>,
    pub column_map: Option<ColumnMap>,
    pub output: Option<OutputWorkbook>,
}

impl Replaced {
    pub fn is_empty(&self) -> bool {
        self.workbook.is_none()
            && self.sheet.is_none()
            && self.table.is_none()
            && self.column_map.is_none()
            && self.output.is_none()
    }

    fn install(&mut self, replacement: Replacement) {
        match replacement {
            Replacement::Workbook(workbook) => self.workbook = Some(workbook),
            Replacement::Sheet(sheet) => self.sheet = Some(sheet),
            Replacement::Table(table) => self.table = Some(table),
            Replacement::ColumnMap(map) => self.column_map = Some(map),
            Replacement::Output(output) => self.output = Some(output),
        }
    }
}

fn hook_error(stage: HookStage, hook: &str, message: impl Into<String>) -> EngineError {
    EngineError::Hook {
        stage,
        hook: hook.to_string(),
        message: message.into(),
    }
}

/// Runs the hooks registered for a stage.
#[derive(Debug, Clone, Copy)]
pub struct HookDispatcher<'r> {
    registry: &'r Registry,
}

impl<'r> HookDispatcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Fires every hook of `stage` in priority order.
    ///
    /// A replacement is visible to the hooks after the one that returned it.
    /// Failures, replacements the stage does not accept, and column maps that
    /// do not fit the registry or the table become [`EngineError::Hook`].
    pub fn run(
        &self,
        stage: HookStage,
        view: HookView<'_>,
        state: &mut RunState,
        artifact: &mut ArtifactBuilder,
    ) -> Result<Replaced, EngineError> {
        let mut replaced = Replaced::default();
        for entry in self.registry.hooks_for(stage) {
            trace!(%stage, hook = %entry.name, "running hook");
            let outcome = {
                let mut ctx = HookContext {
                    stage,
                    workbook: replaced
                        .workbook
                        .as_ref()
                        .or(view.workbook)
                        .filter(|_| entry.declares("workbook")),
                    sheet: replaced
                        .sheet
                        .as_ref()
                        .or(view.sheet)
                        .filter(|_| entry.declares("sheet")),
                    table: replaced
                        .table
                        .as_ref()
                        .or(view.table)
                        .filter(|_| entry.declares("table")),
                    column_map: replaced
                        .column_map
                        .as_ref()
                        .or(view.column_map)
                        .filter(|_| entry.declares("column_map")),
                    output: replaced
                        .output
                        .as_ref()
                        .or(view.output)
                        .filter(|_| entry.declares("output")),
                    state: entry.declares("state").then(|| state.scope(&entry.name)),
                    notes: entry
                        .declares("notes")
                        .then(|| NoteSink::new(&mut *artifact, &entry.name)),
                };
                entry.callable().run(&mut ctx)
            };
            let Some(replacement) =
                outcome.map_err(|error| hook_error(stage, &entry.name, error.to_string()))?
            else {
                continue;
            };
            if !replacement.accepted_at(stage) {
                return Err(hook_error(
                    stage,
                    &entry.name,
                    format!("{stage} does not accept a {} replacement", replacement.kind()),
                ));
            }
            if let Replacement::ColumnMap(map) = &replacement {
                let region = replaced
                    .table
                    .as_ref()
                    .or(view.table)
                    .map_or(map.region, |table| table.region);
                self.check_column_map(map, region)
                    .map_err(|message| hook_error(stage, &entry.name, message))?;
            }
            debug!(%stage, hook = %entry.name, replacement = replacement.kind(), "hook replaced value");
            replaced.install(replacement);
        }
        Ok(replaced)
    }

    /// Mapped fields must be declared and used once; every listed column must
    /// lie inside the table and appear once.
    fn check_column_map(&self, map: &ColumnMap, region: TableRegion) -> Result<(), String> {
        let mut fields = BTreeSet::new();
        for column in &map.mapped {
            if self.registry.field(&column.field).is_none() {
                return Err(format!("column map names undeclared field '{}'", column.field));
            }
            if !fields.insert(column.field.as_str()) {
                return Err(format!("column map assigns field '{}' twice", column.field));
            }
        }
        let mut columns = BTreeSet::new();
        let indices = map
            .mapped
            .iter()
            .map(|column| column.source_column_index)
            .chain(map.unmapped.iter().map(|column| column.source_column_index));
        for index in indices {
            if !region.columns().contains(&index) {
                return Err(format!("column map refers to column {index} outside table {region}"));
            }
            if !columns.insert(index) {
                return Err(format!("column map lists column {index} twice"));
            }
        }
        Ok(())
    }
}
