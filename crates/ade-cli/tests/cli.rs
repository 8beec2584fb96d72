//! Argument parsing, request building and the commands behind the binary.

use std::fs;
use std::path::{Path, PathBuf};

use ade_cli::cli::{CheckConfigArgs, Cli, Command, RunArgs};
use ade_cli::commands::{CallableRow, callable_rows, check_config, run_file};
use ade_cli::summary::tables_table;
use ade_model::{ConflictPolicy, RunStatus};
use ade_registry::MANIFEST_FILE;
use clap::Parser;

const MANIFEST: &str = r#"
[package]
name = "contacts"
version = "2.1.0"

[[fields]]
name = "email"
synonyms = ["e-mail"]
transforms = [{ kind = "lowercase" }]
validators = [{ kind = "pattern", pattern = "@", code = "invalid_email" }]

[[fields]]
name = "name"
required = true

[[hooks]]
kind = "note"
stage = "on_workbook_start"
message = "contacts import"
"#;

fn parse(args: &[&str]) -> Option<Cli> {
    Cli::try_parse_from(std::iter::once("ade").chain(args.iter().copied())).ok()
}

fn run_args(args: &[&str]) -> RunArgs {
    match parse(args).map(|cli| cli.command) {
        Some(Command::Run(args)) => args,
        _ => panic!("expected a run command for {args:?}"),
    }
}

fn workspace() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("config");
    fs::create_dir_all(&config).expect("config dir");
    fs::write(config.join(MANIFEST_FILE), MANIFEST).expect("manifest");
    let input = dir.path().join("people.csv");
    fs::write(&input, "E-Mail,Name\nANN@X.IO,Ann\nnope,Bob\n").expect("input");
    (dir, config, input)
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn run_args_become_a_request() {
    let args = run_args(&[
        "run",
        "--config",
        "pkg",
        "--input",
        "book.xlsx",
        "--sheet",
        "Q1",
        "--sheet",
        "Q2",
        "--output-dir",
        "out",
        "--threshold",
        "0.8",
        "--conflict-policy",
        "best_score",
        "--no-append-unmapped",
    ]);
    let request = args.to_request();
    assert_eq!(request.config_package_path, PathBuf::from("pkg"));
    assert_eq!(request.input_file_path, PathBuf::from("book.xlsx"));
    assert_eq!(
        request.input_sheet_names,
        Some(vec!["Q1".to_string(), "Q2".to_string()])
    );
    assert_eq!(request.output_dir, Some(PathBuf::from("out")));
    assert_eq!(request.output_path, None);
    assert_eq!(request.settings.mapping_threshold, Some(0.8));
    assert_eq!(request.settings.conflict_policy, Some(ConflictPolicy::BestScore));
    assert_eq!(request.settings.append_unmapped, Some(false));
}

#[test]
fn omitted_flags_leave_package_settings_alone() {
    let request = run_args(&["run", "--config", "pkg", "--input", "a.csv"]).to_request();
    assert_eq!(request.input_sheet_names, None);
    assert_eq!(request.settings.mapping_threshold, None);
    assert_eq!(request.settings.conflict_policy, None);
    assert_eq!(request.settings.append_unmapped, None);
}

#[test]
fn conflict_policy_accepts_kebab_aliases() {
    let request = run_args(&[
        "run",
        "--config",
        "pkg",
        "--input",
        "a.csv",
        "--conflict-policy",
        "leave-unmapped",
    ])
    .to_request();
    assert_eq!(
        request.settings.conflict_policy,
        Some(ConflictPolicy::LeaveUnmapped)
    );
}

#[test]
fn conflicting_path_flags_are_rejected() {
    let base = ["run", "--config", "pkg", "--input", "a.csv"];
    let with = |extra: &[&str]| {
        let mut args = base.to_vec();
        args.extend_from_slice(extra);
        parse(&args).is_some()
    };
    assert!(!with(&["--output", "o.xlsx", "--output-dir", "out"]));
    assert!(!with(&["--logs-dir", "logs", "--logs-path", "logs/events.ndjson"]));
    assert!(!with(&["--conflict-policy", "random"]));
    assert!(with(&["--output", "o.xlsx", "--logs-dir", "logs"]));
}

#[test]
fn run_command_requires_config_and_input() {
    assert!(parse(&["run", "--input", "a.csv"]).is_none());
    assert!(parse(&["run", "--config", "pkg"]).is_none());
    assert!(parse(&["check-config", "--config", "pkg"]).is_some());
}

#[test]
fn run_file_normalizes_and_reads_back_the_artifact() {
    let (dir, config, input) = workspace();
    let args = run_args(&["run", "--config", &arg(&config), "--input", &arg(&input)]);
    let outcome = run_file(&args);

    assert_eq!(outcome.result.status, RunStatus::Succeeded, "{:?}", outcome.result.error);
    assert_eq!(
        outcome.result.output_path,
        Some(dir.path().join("output").join("people.normalized.xlsx"))
    );
    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(artifact.tables.len(), 1);
    assert_eq!(artifact.tables[0].validation_issues.len(), 1);

    let rendered = tables_table(&artifact).to_string();
    assert!(rendered.contains("people.csv"));
    assert!(rendered.contains("people!1:3"));
    assert!(rendered.contains("TOTAL"));
}

#[test]
fn run_file_reports_missing_input() {
    let (dir, config, _input) = workspace();
    let missing = dir.path().join("absent.csv");
    let args = run_args(&["run", "--config", &arg(&config), "--input", &arg(&missing)]);
    let outcome = run_file(&args);

    assert_eq!(outcome.result.status, RunStatus::Failed);
    assert!(outcome.artifact.is_none());
    let error = outcome.result.error.expect("error");
    assert_eq!(error.code, "input_error");
}

#[test]
fn check_config_lists_registered_callables() {
    let (_dir, config, _input) = workspace();
    let registry = check_config(&CheckConfigArgs { config }).expect("registry");
    assert_eq!(registry.package().name, "contacts");
    assert_eq!(registry.package().version, "2.1.0");

    let rows = callable_rows(&registry);
    let has = |kind: &str, name: &str, scope: &str| {
        rows.iter()
            .any(|row| row.kind == kind && row.name == name && row.scope == scope)
    };
    assert!(has("column detector", "header_synonyms", "-"));
    assert!(has("transform", "email.lowercase", "email"));
    assert!(has("validator", "email.pattern", "email"));
    assert!(has("validator", "name.required", "name"));
    assert!(has("hook", "note@on_workbook_start", "on_workbook_start"));
    assert!(rows.iter().any(|row| row.kind == "row detector"));

    let kinds: Vec<&str> = rows.iter().map(|row: &CallableRow| row.kind).collect();
    let hook_start = kinds.iter().position(|kind| *kind == "hook").expect("hooks");
    assert!(kinds[hook_start..].iter().all(|kind| *kind == "hook"));
}

#[test]
fn check_config_explains_a_missing_package() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = check_config(&CheckConfigArgs {
        config: dir.path().join("nowhere"),
    });
    match result {
        Ok(_) => panic!("a missing package must not build a registry"),
        Err(error) => {
            let message = format!("{error:#}");
            assert!(message.contains("load config package"), "{message}");
            assert!(message.contains("config package not found"), "{message}");
        }
    }
}
