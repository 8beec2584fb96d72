//! End-to-end runs over small CSV and XLSX inputs.

use std::fs;
use std::path::Path;

use ade_core::{read_events, run, run_with_package};
use ade_model::{
    EngineError, EngineSettings, HookStage, RunRequest, RunStatus, Severity, SettingsOverrides,
};
use ade_registry::{
    DeclarativePackage, ExtensionError, ExtensionPackage, HookContext, IssueDraft, MANIFEST_FILE,
    Params, Registration, RegistryBuilder, Replacement, ValidatorContext,
};
use ade_report::read_artifact;
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use tempfile::TempDir;

const CONTACTS: &str = r#"
[package]
name = "contacts"
version = "1.0.0"

[[fields]]
name = "email"
transforms = [{ kind = "lowercase" }]
validators = [{ kind = "pattern", pattern = "@", code = "invalid_email" }]

[[fields]]
name = "name"

[[hooks]]
kind = "note"
stage = "on_workbook_start"
message = "contacts import"
"#;

const PEOPLE: &str = "Email,Name,Notes\nUSER@Example.com,Alice,note-1\nbademail,Bob,note-2\n";

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(manifest: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("config");
        fs::create_dir_all(&config).expect("config dir");
        fs::write(config.join(MANIFEST_FILE), manifest).expect("manifest");
        fs::write(dir.path().join("people.csv"), PEOPLE).expect("input");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn request(&self) -> RunRequest {
        RunRequest::new(self.path().join("config"), self.path().join("people.csv"))
    }
}

fn sheet_rows(path: &Path, sheet: &str) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto(path).expect("open output");
    let range = workbook.worksheet_range(sheet).expect("sheet");
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[test]
fn normalizes_contacts_end_to_end() {
    let workspace = Workspace::new(CONTACTS);
    let result = run(&workspace.request());
    assert_eq!(result.status, RunStatus::Succeeded, "{:?}", result.error);
    assert_eq!(result.processed_file.as_deref(), Some("people.csv"));

    let output = result.output_path.expect("output path");
    assert_eq!(
        output,
        workspace.path().join("output").join("people.normalized.xlsx")
    );
    assert_eq!(
        sheet_rows(&output, "people"),
        vec![
            vec!["email", "name", "raw_Notes"],
            vec!["user@example.com", "Alice", "note-1"],
            vec!["bademail", "Bob", "note-2"],
        ]
    );

    let artifact_path = result.artifact_path.expect("artifact path");
    assert_eq!(artifact_path, result.logs_dir.join("artifact.json"));
    let artifact = read_artifact(&artifact_path).expect("artifact");
    assert_eq!(artifact.run.status, RunStatus::Succeeded);
    assert_eq!(artifact.config.name.as_deref(), Some("contacts"));
    assert_eq!(artifact.tables.len(), 1);

    let table = &artifact.tables[0];
    assert_eq!(table.header.row_index, 1);
    let mapped: Vec<(&str, usize)> = table
        .mapped_columns
        .iter()
        .map(|column| (column.field.as_str(), column.source_column_index))
        .collect();
    assert_eq!(mapped, vec![("email", 1), ("name", 2)]);
    assert_eq!(table.unmapped_columns.len(), 1);
    assert_eq!(table.unmapped_columns[0].output_header.as_deref(), Some("raw_Notes"));

    assert_eq!(table.validation_issues.len(), 1);
    let issue = &table.validation_issues[0];
    assert_eq!((issue.row_index, issue.field.as_str()), (1, "email"));
    assert_eq!(issue.code, "invalid_email");

    let outputs = &artifact.run.outputs;
    assert_eq!(outputs.len(), 1);
    let placement = &outputs[0].tables[0];
    assert_eq!(
        (placement.sheet.as_str(), placement.first_row, placement.last_row, placement.last_col),
        ("people", 1, 3, 3)
    );
    assert!(
        artifact
            .notes
            .iter()
            .any(|note| note.message == "contacts import")
    );
}

#[test]
fn event_log_follows_the_run_phases() {
    let workspace = Workspace::new(CONTACTS);
    let result = run(&workspace.request());
    assert!(result.is_success());

    let events = read_events(&result.logs_dir.join("events.ndjson")).expect("events");
    let names: Vec<&str> = events.iter().map(|event| event.event.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "run.extracting",
            "run.mapping",
            "run.normalizing",
            "table.normalized",
            "run.writing_output",
            "run.completed",
        ]
    );
    assert_eq!(events[0].data["sheet_count"], 1);
    assert_eq!(events[1].data["table_count"], 1);
    let run_id = &events[0].engine_run_id;
    assert!(events.iter().all(|event| &event.engine_run_id == run_id));
    let completed = events.last().expect("completed");
    assert!(completed.data["output_path"]
        .as_str()
        .is_some_and(|path| path.ends_with("people.normalized.xlsx")));
}

/// Artifact JSON without the fields that differ between runs.
fn stable_artifact(path: &Path) -> Value {
    let raw = fs::read_to_string(path).expect("artifact");
    let mut value: Value = serde_json::from_str(&raw).expect("json");
    if let Some(run) = value["run"].as_object_mut() {
        run.remove("id");
        run.remove("started_at");
        run.remove("completed_at");
    }
    if let Some(notes) = value["notes"].as_array_mut() {
        for note in notes {
            if let Some(note) = note.as_object_mut() {
                note.remove("timestamp");
            }
        }
    }
    value
}

#[test]
fn repeated_runs_produce_the_same_artifact() {
    let workspace = Workspace::new(CONTACTS);
    let request = workspace.request();
    let first = run(&request);
    let first_path = first.artifact_path.expect("first artifact");
    let first_artifact = stable_artifact(&first_path);
    let first_id = read_artifact(&first_path).expect("first").run.id;

    let second = run(&request);
    let second_path = second.artifact_path.expect("second artifact");
    assert_eq!(stable_artifact(&second_path), first_artifact);
    assert_ne!(read_artifact(&second_path).expect("second").run.id, first_id);
}

#[test]
fn overrides_can_drop_unmapped_columns() {
    let workspace = Workspace::new(CONTACTS);
    let request = workspace
        .request()
        .with_output_path(workspace.path().join("out").join("clean.xlsx"))
        .with_settings(SettingsOverrides {
            append_unmapped: Some(false),
            ..SettingsOverrides::default()
        });
    let result = run(&request);
    assert!(result.is_success());
    assert_eq!(result.logs_dir, workspace.path().join("out").join("logs"));
    let rows = sheet_rows(&workspace.path().join("out").join("clean.xlsx"), "people");
    assert_eq!(rows[0], vec!["email", "name"]);
    assert!(rows.iter().all(|row| row.len() == 2));
}

#[test]
fn missing_input_fails_before_processing() {
    let workspace = Workspace::new(CONTACTS);
    let request = RunRequest::new(
        workspace.path().join("config"),
        workspace.path().join("absent.csv"),
    );
    let result = run(&request);
    assert_eq!(result.status, RunStatus::Failed);
    let error = result.error.expect("error");
    assert_eq!(error.code, "input_error");
    assert!(result.artifact_path.is_none());
    assert!(result.output_path.is_none());
    assert!(!result.logs_dir.exists());
}

#[test]
fn invalid_config_fails_before_processing() {
    let workspace = Workspace::new("[package]\nname = \"empty\"\nversion = \"1\"\n");
    let result = run(&workspace.request());
    let error = result.error.expect("error");
    assert_eq!(error.code, "config_error");
    assert!(result.artifact_path.is_none());
    assert!(!workspace.path().join("output").exists());
}

/// The declarative contacts package plus a hook that always fails.
struct Exploding(DeclarativePackage);

fn explode(_ctx: &mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError> {
    Err(ExtensionError::new("enrichment backend refused the table"))
}

impl ExtensionPackage for Exploding {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn version(&self) -> &str {
        self.0.version()
    }

    fn settings(&self) -> EngineSettings {
        self.0.settings()
    }

    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), EngineError> {
        self.0.register(registry)?;
        registry.register_hook(
            HookStage::OnTableMapped,
            Registration::new("enrich", Params::catch_all_only()),
            explode,
        )
    }
}

#[test]
fn hook_failure_persists_a_failed_artifact() {
    let workspace = Workspace::new(CONTACTS);
    let package = DeclarativePackage::load(&workspace.path().join("config")).expect("package");
    let result = run_with_package(&workspace.request(), &Exploding(package));

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.output_path.is_none());
    let error = result.error.expect("error");
    assert_eq!(error.code, "hook_error");
    assert_eq!(error.stage.as_deref(), Some("on_table_mapped"));
    assert!(error.message.contains("enrich"));
    assert!(!workspace.path().join("output").join("people.normalized.xlsx").exists());

    let artifact = read_artifact(&result.artifact_path.expect("artifact")).expect("read");
    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert_eq!(
        artifact.run.error.as_ref().map(|info| info.code.as_str()),
        Some("hook_error")
    );
    assert!(artifact.tables.is_empty());
    assert!(artifact.run.outputs.is_empty());

    let events = read_events(&result.logs_dir.join("events.ndjson")).expect("events");
    let last = events.last().expect("failed event");
    assert_eq!(last.event, "run.failed");
    assert_eq!(last.data["from"], "mapping");
    assert_eq!(
        last.error.as_ref().map(|info| info.code.as_str()),
        Some("hook_error")
    );
}

/// The declarative contacts package plus a validator flagging a row past the end.
struct Overreaching(DeclarativePackage);

fn past_the_end(ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
    Ok(vec![IssueDraft::new(
        ctx.values.len(),
        "late",
        Severity::Error,
        "flags a row that does not exist",
    )])
}

impl ExtensionPackage for Overreaching {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn version(&self) -> &str {
        self.0.version()
    }

    fn settings(&self) -> EngineSettings {
        self.0.settings()
    }

    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), EngineError> {
        self.0.register(registry)?;
        registry.register_column_validator(
            "email",
            Registration::new("email.late", Params::of(["values"])),
            past_the_end,
        )
    }
}

#[test]
fn pipeline_failure_keeps_the_tables_captured_so_far() {
    let workspace = Workspace::new(CONTACTS);
    let package = DeclarativePackage::load(&workspace.path().join("config")).expect("package");
    let result = run_with_package(&workspace.request(), &Overreaching(package));

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.output_path.is_none());
    let error = result.error.expect("error");
    assert_eq!(error.code, "pipeline_error");
    assert_eq!(error.stage.as_deref(), Some("validation"));
    assert!(!workspace.path().join("output").join("people.normalized.xlsx").exists());

    let artifact = read_artifact(&result.artifact_path.expect("artifact")).expect("read");
    assert_eq!(artifact.run.status, RunStatus::Failed);
    assert_eq!(artifact.tables.len(), 1);
    let table = &artifact.tables[0];
    assert_eq!(table.source_file, "people.csv");
    assert_eq!(table.mapped_columns.len(), 2);
    assert!(table.validation_issues.is_empty());
    assert!(artifact.run.outputs.is_empty());

    let events = read_events(&result.logs_dir.join("events.ndjson")).expect("events");
    let last = events.last().expect("failed event");
    assert_eq!(last.event, "run.failed");
    assert_eq!(last.data["from"], "normalizing");
}

/// Two sheets, each holding one small contacts table.
fn write_two_sheet_book(path: &Path) {
    let mut workbook = Workbook::new();
    for (sheet, email) in [("Alpha", "a@x.io"), ("Beta", "b@x.io")] {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet).expect("name");
        worksheet.write_string(0, 0, "Email").expect("write");
        worksheet.write_string(0, 1, "Name").expect("write");
        worksheet.write_string(1, 0, email).expect("write");
        worksheet.write_string(1, 1, sheet).expect("write");
    }
    workbook.save(path).expect("save");
}

#[test]
fn output_layout_ignores_sheet_selection_order() {
    let workspace = Workspace::new(CONTACTS);
    let input = workspace.path().join("book.xlsx");
    write_two_sheet_book(&input);

    let mut layouts = Vec::new();
    for (attempt, order) in [["Alpha", "Beta"], ["Beta", "Alpha"]].into_iter().enumerate() {
        let output = workspace.path().join(format!("out{attempt}")).join("book.xlsx");
        let request = RunRequest::new(workspace.path().join("config"), &input)
            .with_sheets(order)
            .with_output_path(&output);
        let result = run(&request);
        assert!(result.is_success(), "{:?}", result.error);

        let workbook = open_workbook_auto(&output).expect("open output");
        let sheet_names = workbook.sheet_names();
        let artifact = read_artifact(&result.artifact_path.expect("artifact")).expect("read");
        let placements: Vec<(String, String, usize)> = artifact.run.outputs[0]
            .tables
            .iter()
            .map(|placement| {
                (
                    placement.source_sheet.clone().unwrap_or_default(),
                    placement.sheet.clone(),
                    placement.first_row,
                )
            })
            .collect();
        layouts.push((sheet_names, placements));
    }

    assert_eq!(layouts[0].0, vec!["Alpha", "Beta"]);
    assert_eq!(
        layouts[0].1,
        vec![
            ("Alpha".to_string(), "Alpha".to_string(), 1),
            ("Beta".to_string(), "Beta".to_string(), 1),
        ]
    );
    assert_eq!(layouts[1], layouts[0]);
}
