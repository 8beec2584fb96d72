//! Catalog of built-in callables addressable by kind from a manifest.
//!
//! Each `*_kinds` list is what `check-config` prints and what the manifest
//! accepts; unknown kinds and malformed options are config errors.

pub mod columns;
pub mod hooks;
pub mod rows;
pub mod transforms;
pub mod validators;

use ade_model::{CellValue, EngineError, FieldDef, HookStage, NoteLevel, Severity};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::params::Params;
use crate::registry::{Registration, RegistryBuilder};
use columns::{ValuePattern, ValueType};
use hooks::{AddNote, DropBlankRows};
use rows::{DataDensity, HeaderText};
use transforms::{DefaultValue, RegexReplace, TextCase, TextTransform, ToNumber};
use validators::{IssueTemplate, MaxLength, Numeric, OneOf, Pattern, Required};

pub const ROW_DETECTOR_KINDS: [&str; 2] = ["header_text", "data_density"];
pub const COLUMN_DETECTOR_KINDS: [&str; 3] = ["header_synonyms", "value_pattern", "value_type"];
pub const TRANSFORM_KINDS: [&str; 7] = [
    "trim",
    "lowercase",
    "uppercase",
    "collapse_whitespace",
    "to_number",
    "regex_replace",
    "default_value",
];
pub const VALIDATOR_KINDS: [&str; 5] = ["required", "pattern", "one_of", "numeric", "max_length"];
pub const HOOK_KINDS: [&str; 2] = ["drop_blank_rows", "note"];

/// One `{ kind = ..., ... }` entry from the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct CallableSpec {
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl CallableSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            priority: 0,
            options: toml::Table::new(),
        }
    }

    fn registration(&self, name: String, params: Params) -> Registration {
        Registration::new(name, params).with_priority(self.priority)
    }

    fn options<T: DeserializeOwned>(&self, identity: &str) -> Result<T, EngineError> {
        toml::Value::Table(self.options.clone())
            .try_into()
            .map_err(|error| {
                EngineError::config_for(identity, format!("invalid options for '{identity}': {error}"))
            })
    }

    fn no_options(&self, identity: &str) -> Result<(), EngineError> {
        self.options::<NoOptions>(identity).map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoOptions {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WeightOptions {
    #[serde(default = "one")]
    weight: f64,
}

fn one() -> f64 {
    1.0
}

fn half() -> f64 {
    0.5
}

fn compile(pattern: &str, identity: &str) -> Result<Regex, EngineError> {
    Regex::new(pattern).map_err(|error| {
        EngineError::config_for(identity, format!("invalid regex in '{identity}': {error}"))
    })
}

fn finite_weight(weight: f64, identity: &str) -> Result<f64, EngineError> {
    if weight.is_finite() {
        Ok(weight)
    } else {
        Err(EngineError::config_for(
            identity,
            format!("weight of '{identity}' must be finite"),
        ))
    }
}

pub fn register_row_detector(
    builder: &mut RegistryBuilder,
    spec: &CallableSpec,
    vocabulary: &[String],
) -> Result<(), EngineError> {
    let name = spec.name.clone().unwrap_or_else(|| spec.kind.clone());
    match spec.kind.as_str() {
        "header_text" => {
            let options: WeightOptions = spec.options(&name)?;
            let weight = finite_weight(options.weight, &name)?;
            let registration =
                spec.registration(name, Params::of(["row_index", "row_values"]));
            builder.register_row_detector(registration, HeaderText::new(vocabulary, weight))
        }
        "data_density" => {
            let options: WeightOptions = spec.options(&name)?;
            let weight = finite_weight(options.weight, &name)?;
            let registration = spec.registration(name, Params::of(["row_values"]));
            builder.register_row_detector(registration, DataDensity::new(weight))
        }
        other => Err(unknown_kind("row detector", other, &ROW_DETECTOR_KINDS)),
    }
}

/// The row detectors used when a manifest declares none.
pub fn default_row_detectors() -> Vec<CallableSpec> {
    [("header_text", 10), ("data_density", 5)]
        .into_iter()
        .map(|(kind, priority)| CallableSpec {
            priority,
            ..CallableSpec::new(kind)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValuePatternOptions {
    pattern: String,
    #[serde(default = "one")]
    weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ValueTypeOptions {
    #[serde(default = "half")]
    weight: f64,
}

pub fn register_column_detector(
    builder: &mut RegistryBuilder,
    field: &FieldDef,
    spec: &CallableSpec,
    name: String,
) -> Result<(), EngineError> {
    let params = Params::of(["field", "column_values_sample"]);
    match spec.kind.as_str() {
        "value_pattern" => {
            let options: ValuePatternOptions = spec.options(&name)?;
            let pattern = compile(&options.pattern, &name)?;
            let weight = finite_weight(options.weight, &name)?;
            let registration = spec.registration(name, params);
            builder.register_column_detector(
                Some(&field.name),
                registration,
                ValuePattern::new(pattern, weight),
            )
        }
        "value_type" => {
            let options: ValueTypeOptions = spec.options(&name)?;
            let weight = finite_weight(options.weight, &name)?;
            let registration = spec.registration(name, params);
            builder.register_column_detector(Some(&field.name), registration, ValueType::new(weight))
        }
        "header_synonyms" => Err(EngineError::config_for(
            name,
            "header_synonyms is configured once under [header_matching], not per field",
        )),
        other => Err(unknown_kind("column detector", other, &COLUMN_DETECTOR_KINDS)),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegexReplaceOptions {
    pattern: String,
    #[serde(default)]
    replacement: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefaultValueOptions {
    value: toml::Value,
}

fn cell_from_toml(value: &toml::Value, identity: &str) -> Result<CellValue, EngineError> {
    match value {
        toml::Value::String(text) => Ok(CellValue::from(text.as_str())),
        toml::Value::Integer(number) => Ok(CellValue::Number(*number as f64)),
        toml::Value::Float(number) => Ok(CellValue::Number(*number)),
        toml::Value::Boolean(flag) => Ok(CellValue::Bool(*flag)),
        other => Err(EngineError::config_for(
            identity,
            format!("unsupported default value in '{identity}': {other}"),
        )),
    }
}

pub fn register_transform(
    builder: &mut RegistryBuilder,
    field: &FieldDef,
    spec: &CallableSpec,
    name: String,
) -> Result<(), EngineError> {
    let params = Params::of(["field", "values"]);
    let text = |case| -> Result<TextTransform, EngineError> {
        spec.no_options(&name)?;
        Ok(TextTransform(case))
    };
    match spec.kind.as_str() {
        "trim" => {
            let transform = text(TextCase::Trim)?;
            builder.register_column_transform(&field.name, spec.registration(name, params), transform)
        }
        "lowercase" => {
            let transform = text(TextCase::Lower)?;
            builder.register_column_transform(&field.name, spec.registration(name, params), transform)
        }
        "uppercase" => {
            let transform = text(TextCase::Upper)?;
            builder.register_column_transform(&field.name, spec.registration(name, params), transform)
        }
        "collapse_whitespace" => {
            let transform = text(TextCase::CollapseWhitespace)?;
            builder.register_column_transform(&field.name, spec.registration(name, params), transform)
        }
        "to_number" => {
            spec.no_options(&name)?;
            builder.register_column_transform(&field.name, spec.registration(name, params), ToNumber)
        }
        "regex_replace" => {
            let options: RegexReplaceOptions = spec.options(&name)?;
            let pattern = compile(&options.pattern, &name)?;
            builder.register_column_transform(
                &field.name,
                spec.registration(name, params),
                RegexReplace::new(pattern, options.replacement),
            )
        }
        "default_value" => {
            let options: DefaultValueOptions = spec.options(&name)?;
            let value = cell_from_toml(&options.value, &name)?;
            builder.register_column_transform(
                &field.name,
                spec.registration(name, params),
                DefaultValue::new(value),
            )
        }
        other => Err(unknown_kind("transform", other, &TRANSFORM_KINDS)),
    }
}

/// Pulls the shared `code`/`severity`/`message` keys out of validator options.
fn issue_template(
    options: &mut toml::Table,
    default_code: &str,
    identity: &str,
) -> Result<IssueTemplate, EngineError> {
    let mut text = |key: &str| -> Result<Option<String>, EngineError> {
        match options.remove(key) {
            None => Ok(None),
            Some(toml::Value::String(value)) => Ok(Some(value)),
            Some(other) => Err(EngineError::config_for(
                identity,
                format!("'{key}' of '{identity}' must be a string, got {other}"),
            )),
        }
    };
    let code = text("code")?.unwrap_or_else(|| default_code.to_string());
    let severity = match text("severity")? {
        None => Severity::Error,
        Some(raw) => Severity::parse(&raw).ok_or_else(|| {
            EngineError::config_for(
                identity,
                format!("unknown severity '{raw}' in '{identity}' (expected info, warning or error)"),
            )
        })?,
    };
    let message = text("message")?;
    Ok(IssueTemplate::new(code, severity).with_message(message))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternOptions {
    pattern: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OneOfOptions {
    values: Vec<String>,
    #[serde(default)]
    case_sensitive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NumericOptions {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaxLengthOptions {
    max: usize,
}

pub fn register_validator(
    builder: &mut RegistryBuilder,
    field: &FieldDef,
    spec: &CallableSpec,
    name: String,
) -> Result<(), EngineError> {
    let params = Params::of(["field", "values"]);
    let mut spec = spec.clone();
    match spec.kind.as_str() {
        "required" => {
            let template = issue_template(&mut spec.options, "required_missing", &name)?;
            spec.no_options(&name)?;
            builder.register_column_validator(
                &field.name,
                spec.registration(name, params),
                Required::new(template),
            )
        }
        "pattern" => {
            let template = issue_template(&mut spec.options, "pattern_mismatch", &name)?;
            let options: PatternOptions = spec.options(&name)?;
            let pattern = compile(&options.pattern, &name)?;
            builder.register_column_validator(
                &field.name,
                spec.registration(name, params),
                Pattern::new(pattern, template),
            )
        }
        "one_of" => {
            let template = issue_template(&mut spec.options, "not_allowed", &name)?;
            let options: OneOfOptions = spec.options(&name)?;
            builder.register_column_validator(
                &field.name,
                spec.registration(name, params),
                OneOf::new(options.values, options.case_sensitive, template),
            )
        }
        "numeric" => {
            let template = issue_template(&mut spec.options, "out_of_range", &name)?;
            let options: NumericOptions = spec.options(&name)?;
            builder.register_column_validator(
                &field.name,
                spec.registration(name, params),
                Numeric::new(options.min, options.max, template),
            )
        }
        "max_length" => {
            let template = issue_template(&mut spec.options, "too_long", &name)?;
            let options: MaxLengthOptions = spec.options(&name)?;
            builder.register_column_validator(
                &field.name,
                spec.registration(name, params),
                MaxLength::new(options.max, template),
            )
        }
        other => Err(unknown_kind("validator", other, &VALIDATOR_KINDS)),
    }
}

/// A `[[hooks]]` entry: a callable plus the stage it fires at.
#[derive(Debug, Clone, Deserialize)]
pub struct HookSpec {
    pub stage: String,
    #[serde(flatten)]
    pub callable: CallableSpec,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoteOptions {
    message: String,
    #[serde(default)]
    level: Option<String>,
}

pub fn register_hook(builder: &mut RegistryBuilder, spec: &HookSpec) -> Result<(), EngineError> {
    let callable = &spec.callable;
    let name = callable.name.clone().unwrap_or_else(|| {
        format!("{}@{}", callable.kind, spec.stage.trim().to_ascii_lowercase())
    });
    let stage = HookStage::parse(&spec.stage).ok_or_else(|| {
        EngineError::config_for(
            name.clone(),
            format!("unknown hook stage '{}' for '{name}'", spec.stage),
        )
    })?;
    match callable.kind.as_str() {
        "drop_blank_rows" => {
            callable.no_options(&name)?;
            if !matches!(stage, HookStage::OnTableDetected | HookStage::OnTableMapped) {
                return Err(EngineError::config_for(
                    name.clone(),
                    format!("'{name}' only runs at on_table_detected or on_table_mapped, not {stage}"),
                ));
            }
            let registration = callable.registration(name, Params::of(["table", "notes"]));
            builder.register_hook(stage, registration, DropBlankRows)
        }
        "note" => {
            let options: NoteOptions = callable.options(&name)?;
            let level = match options.level.as_deref() {
                None => NoteLevel::Info,
                Some(raw) => NoteLevel::parse(raw).ok_or_else(|| {
                    EngineError::config_for(name.clone(), format!("unknown note level '{raw}'"))
                })?,
            };
            let registration = callable.registration(name, Params::of(["notes"]));
            builder.register_hook(stage, registration, AddNote::new(level, options.message))
        }
        other => Err(unknown_kind("hook", other, &HOOK_KINDS)),
    }
}

fn unknown_kind(kind: &str, value: &str, known: &[&str]) -> EngineError {
    EngineError::config(format!(
        "unknown {kind} kind '{value}' (expected one of: {})",
        known.join(", ")
    ))
}
