//! File-level run orchestration.
//!
//! A run reads one input file, finds its tables, maps and normalizes them,
//! writes the output workbook and persists the artifact and event log. Phases
//! are strictly sequential and a run owns its [`RunState`].

use std::path::PathBuf;
use std::time::Instant;

use ade_ingest::{classify_sheet, extract_tables, read_workbook, select_sheets};
use ade_map::map_table;
use ade_model::{
    ArtifactBuilder, ColumnMap, ConfigReport, EngineError, ExtractedTable, HookStage,
    NormalizedTable, NoteLevel, OutputReport, RunRequest, RunResult, RunStatus, SourceWorkbook,
    TableHandle, TableReport,
};
use ade_registry::{DeclarativePackage, ExtensionPackage, Registry, RunState};
use ade_report::{render, write_artifact, write_workbook};
use ade_transform::normalize_table;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::events::EventLog;
use crate::hooks::{HookDispatcher, HookView};
use crate::phase::{RunMachine, RunPhase};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the declarative config package found at `config_package_path`.
pub fn run(request: &RunRequest) -> RunResult {
    execute(request, || {
        let package = DeclarativePackage::load(&request.config_package_path)?;
        Registry::build(&package)
    })
}

/// Runs a compiled extension package; `config_package_path` is not read.
pub fn run_with_package(request: &RunRequest, package: &dyn ExtensionPackage) -> RunResult {
    execute(request, || Registry::build(package))
}

fn execute<F>(request: &RunRequest, build: F) -> RunResult
where
    F: FnOnce() -> Result<Registry, EngineError>,
{
    let run_id = Uuid::new_v4().to_string();
    let span = info_span!("run", run_id = %run_id, input = %request.input_file_path.display());
    let _guard = span.enter();
    let started = Instant::now();
    info!(config = %request.config_package_path.display(), "run started");

    let mut machine = RunMachine::new();
    let mut events = EventLog::new(run_id.clone());
    let (registry, workbook) = match prepare(request, build) {
        Ok(prepared) => prepared,
        Err(failure) => {
            // Pre-run failures leave no files behind.
            if machine.advance(RunPhase::Failed).is_ok() {
                events.phase(RunPhase::Failed, json!({}), Some(&failure));
            }
            error!(code = failure.code(), error = %failure, "run failed before processing");
            return RunResult {
                status: RunStatus::Failed,
                output_path: None,
                logs_dir: request.resolve_logs_dir(),
                artifact_path: None,
                processed_file: None,
                error: Some(failure.to_info()),
            };
        }
    };

    let package = registry.package();
    let config = ConfigReport {
        schema: package.schema.clone(),
        version: package.version.clone(),
        name: Some(package.name.clone()),
    };
    let artifact = ArtifactBuilder::new(run_id, ENGINE_VERSION, Utc::now(), config);
    let mut run = Run {
        request,
        registry: &registry,
        hooks: HookDispatcher::new(&registry),
        state: RunState::new(),
        artifact,
        machine,
        events,
    };
    let outcome = run.process(workbook);
    let result = run.finish(outcome);
    info!(
        status = result.status.as_str(),
        duration_ms = started.elapsed().as_millis(),
        "run finished"
    );
    result
}

/// Everything that can fail with a config or input error.
fn prepare<F>(request: &RunRequest, build: F) -> Result<(Registry, SourceWorkbook), EngineError>
where
    F: FnOnce() -> Result<Registry, EngineError>,
{
    let registry = build()?;
    let settings = registry
        .settings()
        .clone()
        .with_overrides(&request.settings)?;
    let registry = registry.with_settings(settings);
    let workbook = read_workbook(&request.input_file_path)?;
    let workbook = select_sheets(workbook, request.input_sheet_names.as_deref())?;
    Ok((registry, workbook))
}

struct MappedTable {
    table: ExtractedTable,
    map: ColumnMap,
    handle: TableHandle,
}

struct Run<'r> {
    request: &'r RunRequest,
    registry: &'r Registry,
    hooks: HookDispatcher<'r>,
    state: RunState,
    artifact: ArtifactBuilder,
    machine: RunMachine,
    events: EventLog,
}

impl Run<'_> {
    fn advance(&mut self, phase: RunPhase, data: Value) -> Result<(), EngineError> {
        self.machine.advance(phase)?;
        self.events.phase(phase, data, None);
        Ok(())
    }

    fn process(&mut self, workbook: SourceWorkbook) -> Result<(), EngineError> {
        self.advance(
            RunPhase::Extracting,
            json!({ "sheet_count": workbook.sheets.len() }),
        )?;
        let start = Instant::now();
        let tables = self.extract(workbook)?;
        info!(
            tables = tables.len(),
            duration_ms = start.elapsed().as_millis(),
            "extraction complete"
        );

        self.advance(RunPhase::Mapping, json!({ "table_count": tables.len() }))?;
        let start = Instant::now();
        let mapped = self.map(tables)?;
        info!(
            tables = mapped.len(),
            duration_ms = start.elapsed().as_millis(),
            "mapping complete"
        );

        self.advance(RunPhase::Normalizing, json!({ "table_count": mapped.len() }))?;
        let start = Instant::now();
        let normalized = self.normalize(&mapped)?;
        info!(
            issues = normalized.iter().map(|table| table.issues.len()).sum::<usize>(),
            duration_ms = start.elapsed().as_millis(),
            "normalization complete"
        );

        self.advance(
            RunPhase::WritingOutput,
            json!({ "table_count": normalized.len() }),
        )?;
        let start = Instant::now();
        self.write_output(&mapped, &normalized)?;
        info!(duration_ms = start.elapsed().as_millis(), "output written");
        Ok(())
    }

    fn extract(&mut self, workbook: SourceWorkbook) -> Result<Vec<ExtractedTable>, EngineError> {
        let replaced = self.hooks.run(
            HookStage::OnWorkbookStart,
            HookView {
                workbook: Some(&workbook),
                ..HookView::default()
            },
            &mut self.state,
            &mut self.artifact,
        )?;
        let workbook = replaced.workbook.unwrap_or(workbook);

        let mut tables = Vec::new();
        for source in &workbook.sheets {
            let span = info_span!("sheet", sheet = %source.display_name());
            let _guard = span.enter();
            let replaced = self.hooks.run(
                HookStage::OnSheetStart,
                HookView {
                    workbook: Some(&workbook),
                    sheet: Some(source),
                    ..HookView::default()
                },
                &mut self.state,
                &mut self.artifact,
            )?;
            let sheet = replaced.sheet.as_ref().unwrap_or(source);
            let layout = classify_sheet(sheet, self.registry, &self.state)?;
            if !layout.orphan_rows.is_empty() {
                self.artifact.note(
                    NoteLevel::Warning,
                    format!(
                        "{} data row(s) in {} belong to no table",
                        layout.orphan_rows.len(),
                        sheet.display_name()
                    ),
                    Some(json!({ "rows": layout.orphan_rows })),
                );
            }
            let detected = extract_tables(&workbook.source_file, sheet, source.position, &layout);
            for table in detected {
                let replaced = self.hooks.run(
                    HookStage::OnTableDetected,
                    HookView {
                        workbook: Some(&workbook),
                        sheet: Some(sheet),
                        table: Some(&table),
                        ..HookView::default()
                    },
                    &mut self.state,
                    &mut self.artifact,
                )?;
                tables.push(replaced.table.unwrap_or(table));
            }
        }
        Ok(tables)
    }

    fn map(&mut self, tables: Vec<ExtractedTable>) -> Result<Vec<MappedTable>, EngineError> {
        let mut mapped = Vec::with_capacity(tables.len());
        for table in tables {
            let span = info_span!("table", table = %table.label());
            let _guard = span.enter();
            let map = map_table(&table, self.registry, &self.state)?;
            let replaced = self.hooks.run(
                HookStage::OnTableMapped,
                HookView {
                    table: Some(&table),
                    column_map: Some(&map),
                    ..HookView::default()
                },
                &mut self.state,
                &mut self.artifact,
            )?;
            let table = replaced.table.unwrap_or(table);
            let map = replaced.column_map.unwrap_or(map);
            debug!(
                mapped = map.mapped.len(),
                unmapped = map.unmapped.len(),
                rows = table.rows.len(),
                "table mapped"
            );
            let handle = self.artifact.push_table(TableReport::from_mapping(&table, &map));
            mapped.push(MappedTable { table, map, handle });
        }
        Ok(mapped)
    }

    fn normalize(&mut self, mapped: &[MappedTable]) -> Result<Vec<NormalizedTable>, EngineError> {
        let mut normalized = Vec::with_capacity(mapped.len());
        for entry in mapped {
            let span = info_span!("table", table = %entry.table.label());
            let _guard = span.enter();
            let table = normalize_table(&entry.table, &entry.map, self.registry, &mut self.state)?;
            self.artifact.append_issues(entry.handle, &table.issues);
            self.events.record(
                NoteLevel::Info,
                "table.normalized",
                format!("normalized {}", entry.table.label()),
                json!({
                    "source_file": table.source_file,
                    "source_sheet": table.source_sheet,
                    "table_index": table.table_index,
                    "rows": table.rows.len(),
                    "mapped_columns": entry.map.mapped.len(),
                    "unmapped_columns": entry.map.unmapped.len(),
                    "issues": table.issues.len(),
                }),
            );
            normalized.push(table);
        }
        Ok(normalized)
    }

    fn write_output(
        &mut self,
        mapped: &[MappedTable],
        normalized: &[NormalizedTable],
    ) -> Result<(), EngineError> {
        let mut output = render(normalized);
        for (entry, table) in mapped.iter().zip(normalized) {
            self.hooks.run(
                HookStage::OnTableWritten,
                HookView {
                    table: Some(&entry.table),
                    column_map: Some(&table.column_map),
                    output: Some(&output),
                    ..HookView::default()
                },
                &mut self.state,
                &mut self.artifact,
            )?;
        }
        let replaced = self.hooks.run(
            HookStage::OnWorkbookBeforeSave,
            HookView {
                output: Some(&output),
                ..HookView::default()
            },
            &mut self.state,
            &mut self.artifact,
        )?;
        if let Some(replacement) = replaced.output {
            output = replacement;
        }

        let path = self.request.resolve_output_path();
        write_workbook(&output, &path)?;
        self.artifact.push_output(OutputReport {
            path: path.display().to_string(),
            tables: output.placements,
        });
        Ok(())
    }

    /// Seals and persists the artifact, then moves to the terminal phase and
    /// flushes the event log.
    fn finish(self, outcome: Result<(), EngineError>) -> RunResult {
        let Self {
            request,
            artifact,
            mut machine,
            mut events,
            ..
        } = self;
        let logs_dir = request.resolve_logs_dir();
        let artifact_path = request.resolve_artifact_path();
        let output_path = request.resolve_output_path();

        let mut failure = outcome.err();
        let artifact = match &failure {
            None => artifact.seal(RunStatus::Succeeded, None),
            Some(error) => artifact.seal(RunStatus::Failed, Some(error.to_info())),
        };
        let written = match write_artifact(&artifact, &artifact_path) {
            Ok(()) => true,
            Err(write_error) => {
                warn!(error = %write_error, "artifact was not persisted");
                failure.get_or_insert(write_error);
                false
            }
        };

        if failure.is_none() {
            match machine.advance(RunPhase::Completed) {
                Ok(_) => events.phase(
                    RunPhase::Completed,
                    json!({ "output_path": output_path.display().to_string() }),
                    None,
                ),
                Err(error) => failure = Some(error),
            }
        }
        if let Some(error) = &failure {
            let from = machine.phase();
            if machine.advance(RunPhase::Failed).is_ok() {
                events.phase(RunPhase::Failed, json!({ "from": from.as_str() }), Some(error));
            }
            let stage = error.stage().unwrap_or_default();
            error!(code = error.code(), %stage, %error, "run failed");
        }
        if let Err(log_error) = events.persist(&request.resolve_events_path()) {
            warn!(error = %log_error, "event log was not persisted");
        }

        RunResult {
            status: if failure.is_some() {
                RunStatus::Failed
            } else {
                RunStatus::Succeeded
            },
            output_path: failure.is_none().then_some(output_path),
            logs_dir,
            artifact_path: written.then_some(artifact_path),
            processed_file: Some(request.input_file_name()),
            error: failure.as_ref().map(EngineError::to_info),
        }
    }
}
