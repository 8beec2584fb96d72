//! The on-disk config package: a directory holding `manifest.toml`.
//!
//! ```toml
//! [package]
//! name = "contacts"
//! version = "1.0.0"
//! schema = "ade.config/v1"
//!
//! [engine]
//! mapping_threshold = 0.5
//!
//! [[fields]]
//! name = "email"
//! required = true
//! synonyms = ["e-mail", "mail"]
//! transforms = [{ kind = "trim" }, { kind = "lowercase" }]
//! validators = [{ kind = "pattern", pattern = "@", code = "invalid_email" }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ade_model::{DataType, EngineError, EngineSettings, FieldDef};
use serde::Deserialize;
use tracing::{debug, info};

use crate::builtins::columns::{DEFAULT_FUZZY_FLOOR, HeaderSynonyms};
use crate::builtins::{self, CallableSpec, HookSpec};
use crate::params::Params;
use crate::registry::{CONFIG_SCHEMA, ExtensionPackage, Registration, RegistryBuilder};

pub const MANIFEST_FILE: &str = "manifest.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub package: PackageSection,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub header_matching: HeaderMatching,
    #[serde(default)]
    pub fields: Vec<FieldSection>,
    /// `None` selects the default detector set.
    #[serde(default)]
    pub row_detectors: Option<Vec<CallableSpec>>,
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_schema() -> String {
    CONFIG_SCHEMA.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderMatching {
    pub enabled: bool,
    pub weight: f64,
    pub fuzzy_floor: f64,
    pub priority: i32,
}

impl Default for HeaderMatching {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
            fuzzy_floor: DEFAULT_FUZZY_FLOOR,
            priority: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSection {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub data_type: DataType,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub detectors: Vec<CallableSpec>,
    #[serde(default)]
    pub transforms: Vec<CallableSpec>,
    #[serde(default)]
    pub validators: Vec<CallableSpec>,
}

impl FieldSection {
    fn definition(&self) -> FieldDef {
        let mut field = FieldDef::new(self.name.trim())
            .with_type(self.data_type)
            .with_synonyms(self.synonyms.iter().cloned());
        if let Some(label) = &self.label {
            field = field.with_label(label.clone());
        }
        if self.required {
            field = field.required();
        }
        field
    }
}

impl Manifest {
    pub fn parse(source: &str) -> Result<Self, EngineError> {
        let manifest: Self = toml::from_str(source)
            .map_err(|error| EngineError::config(format!("invalid manifest: {error}")))?;
        if manifest.package.schema != CONFIG_SCHEMA {
            return Err(EngineError::config(format!(
                "unsupported config schema '{}' (expected '{CONFIG_SCHEMA}')",
                manifest.package.schema
            )));
        }
        let floor = manifest.header_matching.fuzzy_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(EngineError::config(format!(
                "header_matching.fuzzy_floor must be within 0..=1, got {floor}"
            )));
        }
        manifest.engine.validate()?;
        Ok(manifest)
    }
}

/// Names callables `<field>.<kind>`, numbering repeats of the same kind.
fn callable_names<'a>(field: &str, specs: &'a [CallableSpec]) -> Vec<(&'a CallableSpec, String)> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    specs
        .iter()
        .map(|spec| {
            let count = seen.entry(spec.kind.as_str()).or_insert(0);
            *count += 1;
            let name = match &spec.name {
                Some(name) => name.clone(),
                None if *count == 1 => format!("{field}.{}", spec.kind),
                None => format!("{field}.{}_{count}", spec.kind),
            };
            (spec, name)
        })
        .collect()
}

/// A config package loaded from disk.
#[derive(Debug, Clone)]
pub struct DeclarativePackage {
    root: PathBuf,
    manifest: Manifest,
}

impl DeclarativePackage {
    /// Loads `manifest.toml` from a package directory, or a manifest file directly.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        if !manifest_path.is_file() {
            return Err(EngineError::input_path(
                path,
                format!("config package not found: {}", manifest_path.display()),
            ));
        }
        let source = fs::read_to_string(&manifest_path).map_err(|error| {
            EngineError::input_path(
                &manifest_path,
                format!("read config package {}: {error}", manifest_path.display()),
            )
        })?;
        let manifest = Manifest::parse(&source)?;
        info!(
            package = %manifest.package.name,
            version = %manifest.package.version,
            fields = manifest.fields.len(),
            "loaded config package"
        );
        Ok(Self {
            root: path.to_path_buf(),
            manifest,
        })
    }

    pub fn from_manifest(root: impl Into<PathBuf>, manifest: Manifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn register_field_callables(
        &self,
        builder: &mut RegistryBuilder,
        section: &FieldSection,
        field: &FieldDef,
    ) -> Result<(), EngineError> {
        for (spec, name) in callable_names(&field.name, &section.detectors) {
            builtins::register_column_detector(builder, field, spec, name)?;
        }
        for (spec, name) in callable_names(&field.name, &section.transforms) {
            builtins::register_transform(builder, field, spec, name)?;
        }
        let explicit_required = section
            .validators
            .iter()
            .any(|spec| spec.kind == "required");
        if field.required && !explicit_required {
            let spec = CallableSpec::new("required");
            builtins::register_validator(builder, field, &spec, format!("{}.required", field.name))?;
        }
        for (spec, name) in callable_names(&field.name, &section.validators) {
            builtins::register_validator(builder, field, spec, name)?;
        }
        Ok(())
    }
}

impl ExtensionPackage for DeclarativePackage {
    fn name(&self) -> &str {
        &self.manifest.package.name
    }

    fn version(&self) -> &str {
        &self.manifest.package.version
    }

    fn schema(&self) -> &str {
        &self.manifest.package.schema
    }

    fn settings(&self) -> EngineSettings {
        self.manifest.engine.clone()
    }

    fn register(&self, builder: &mut RegistryBuilder) -> Result<(), EngineError> {
        let fields: Vec<FieldDef> = self
            .manifest
            .fields
            .iter()
            .map(FieldSection::definition)
            .collect();
        for field in &fields {
            builder.register_field(field.clone())?;
        }

        let matching = &self.manifest.header_matching;
        if matching.enabled {
            let registration = Registration::new("header_synonyms", Params::of(["header"]))
                .with_priority(matching.priority);
            builder.register_column_detector(
                None,
                registration,
                HeaderSynonyms::new(&fields, matching.weight, matching.fuzzy_floor),
            )?;
        }

        let vocabulary: Vec<String> = fields
            .iter()
            .flat_map(|field| field.header_candidates().map(str::to_string))
            .collect();
        let row_detectors = self
            .manifest
            .row_detectors
            .clone()
            .unwrap_or_else(builtins::default_row_detectors);
        for spec in &row_detectors {
            builtins::register_row_detector(builder, spec, &vocabulary)?;
        }

        for (section, field) in self.manifest.fields.iter().zip(&fields) {
            self.register_field_callables(builder, section, field)?;
        }

        for hook in &self.manifest.hooks {
            builtins::register_hook(builder, hook)?;
        }
        debug!(package = %self.manifest.package.name, "registered declarative package");
        Ok(())
    }
}
