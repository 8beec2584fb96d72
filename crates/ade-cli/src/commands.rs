use anyhow::{Context, Result};
use tracing::{info_span, warn};

use ade_model::{Artifact, HookStage, RunResult};
use ade_registry::{DeclarativePackage, Registry};
use ade_report::read_artifact;

use crate::cli::{CheckConfigArgs, RunArgs};

/// A finished run and, when one was persisted, its artifact.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: RunResult,
    pub artifact: Option<Artifact>,
}

pub fn run_file(args: &RunArgs) -> RunOutcome {
    let request = args.to_request();
    let result = ade_core::run(&request);
    let artifact = result
        .artifact_path
        .as_deref()
        .and_then(|path| match read_artifact(path) {
            Ok(artifact) => Some(artifact),
            Err(error) => {
                warn!(%error, "could not read back the artifact");
                None
            }
        });
    RunOutcome { result, artifact }
}

pub fn check_config(args: &CheckConfigArgs) -> Result<Registry> {
    let _span = info_span!("check_config", config = %args.config.display()).entered();
    let package = DeclarativePackage::load(&args.config)
        .with_context(|| format!("load config package {}", args.config.display()))?;
    Registry::build(&package).context("build registry")
}

/// One registered callable as listed by `check-config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableRow {
    pub kind: &'static str,
    pub name: String,
    /// Bound field, hook stage, or `-`.
    pub scope: String,
    pub priority: i32,
}

/// Callables in execution order, grouped by kind.
pub fn callable_rows(registry: &Registry) -> Vec<CallableRow> {
    fn field_scope(field: Option<&String>) -> String {
        field.cloned().unwrap_or_else(|| "-".to_string())
    }

    let mut rows = Vec::new();
    rows.extend(registry.row_detectors().iter().map(|entry| CallableRow {
        kind: "row detector",
        name: entry.name.clone(),
        scope: field_scope(entry.field.as_ref()),
        priority: entry.priority,
    }));
    rows.extend(registry.column_detectors().iter().map(|entry| CallableRow {
        kind: "column detector",
        name: entry.name.clone(),
        scope: field_scope(entry.field.as_ref()),
        priority: entry.priority,
    }));
    rows.extend(registry.transforms().iter().map(|entry| CallableRow {
        kind: "transform",
        name: entry.name.clone(),
        scope: field_scope(entry.field.as_ref()),
        priority: entry.priority,
    }));
    rows.extend(registry.validators().iter().map(|entry| CallableRow {
        kind: "validator",
        name: entry.name.clone(),
        scope: field_scope(entry.field.as_ref()),
        priority: entry.priority,
    }));
    for stage in HookStage::ALL {
        rows.extend(registry.hooks_for(stage).iter().map(|entry| CallableRow {
            kind: "hook",
            name: entry.name.clone(),
            scope: stage.to_string(),
            priority: entry.priority,
        }));
    }
    rows
}
