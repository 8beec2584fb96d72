//! Extension registry built once per run from a package.
//!
//! A package registers fields and callables through [`RegistryBuilder`].
//! Every registration is validated immediately; cross references (callables
//! pointing at fields) are checked when the builder finishes, so the order of
//! registrations inside a package does not matter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ade_model::{EngineError, EngineSettings, FieldDef, HookStage};
use tracing::debug;

use crate::callable::{ColumnDetector, Hook, RowDetector, Transform, Validator};
use crate::params::{CallableKind, Params};

pub const CONFIG_SCHEMA: &str = "ade.config/v1";

/// A bundle of fields and callables.
pub trait ExtensionPackage {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn schema(&self) -> &str {
        CONFIG_SCHEMA
    }

    fn settings(&self) -> EngineSettings {
        EngineSettings::default()
    }

    /// Single registration entry point.
    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub schema: String,
}

/// Identity, ordering and capabilities of one callable registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub priority: i32,
    pub params: Params,
}

impl Registration {
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            params,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A registered callable.
pub struct Entry<C: ?Sized> {
    pub name: String,
    pub priority: i32,
    pub params: Params,
    /// Field the callable is bound to (transforms, validators, scoped detectors).
    pub field: Option<String>,
    /// Position in registration order within its kind.
    pub order: usize,
    callable: Box<C>,
}

impl<C: ?Sized> Entry<C> {
    pub fn callable(&self) -> &C {
        &self.callable
    }

    pub fn declares(&self, name: &str) -> bool {
        self.params.declares(name)
    }
}

impl<C: ?Sized> fmt::Debug for Entry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("field", &self.field)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Priority descending, then registration order.
fn sort_entries<C: ?Sized>(entries: &mut [Entry<C>]) {
    entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));
}

#[derive(Default)]
pub struct RegistryBuilder {
    fields: Vec<FieldDef>,
    row_detectors: Vec<Entry<dyn RowDetector>>,
    column_detectors: Vec<Entry<dyn ColumnDetector>>,
    transforms: Vec<Entry<dyn Transform>>,
    validators: Vec<Entry<dyn Validator>>,
    hooks: Vec<(HookStage, Entry<dyn Hook>)>,
    names: BTreeMap<CallableKind, BTreeSet<String>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn register_field(&mut self, field: FieldDef) -> Result<(), EngineError> {
        if field.name.trim().is_empty() {
            return Err(EngineError::config("field names must not be blank"));
        }
        if self.fields.iter().any(|existing| existing.name == field.name) {
            return Err(EngineError::config_for(
                field.name.clone(),
                format!("duplicate field '{}'", field.name),
            ));
        }
        debug!(field = %field.name, "registered field");
        self.fields.push(field);
        Ok(())
    }

    pub fn register_row_detector(
        &mut self,
        registration: Registration,
        detector: impl RowDetector + 'static,
    ) -> Result<(), EngineError> {
        let order = self.claim(CallableKind::RowDetector, &registration)?;
        let callable: Box<dyn RowDetector> = Box::new(detector);
        self.row_detectors
            .push(entry(registration, None, order, callable));
        Ok(())
    }

    /// Registers a column detector. `field` scopes it to one field, which is
    /// then handed to it through the context.
    pub fn register_column_detector(
        &mut self,
        field: Option<&str>,
        registration: Registration,
        detector: impl ColumnDetector + 'static,
    ) -> Result<(), EngineError> {
        let order = self.claim(CallableKind::ColumnDetector, &registration)?;
        let callable: Box<dyn ColumnDetector> = Box::new(detector);
        self.column_detectors.push(entry(
            registration,
            field.map(str::to_string),
            order,
            callable,
        ));
        Ok(())
    }

    pub fn register_column_transform(
        &mut self,
        field: &str,
        registration: Registration,
        transform: impl Transform + 'static,
    ) -> Result<(), EngineError> {
        let order = self.claim(CallableKind::Transform, &registration)?;
        let callable: Box<dyn Transform> = Box::new(transform);
        self.transforms
            .push(entry(registration, Some(field.to_string()), order, callable));
        Ok(())
    }

    pub fn register_column_validator(
        &mut self,
        field: &str,
        registration: Registration,
        validator: impl Validator + 'static,
    ) -> Result<(), EngineError> {
        let order = self.claim(CallableKind::Validator, &registration)?;
        let callable: Box<dyn Validator> = Box::new(validator);
        self.validators
            .push(entry(registration, Some(field.to_string()), order, callable));
        Ok(())
    }

    pub fn register_hook(
        &mut self,
        stage: HookStage,
        registration: Registration,
        hook: impl Hook + 'static,
    ) -> Result<(), EngineError> {
        let order = self.claim(CallableKind::Hook, &registration)?;
        let callable: Box<dyn Hook> = Box::new(hook);
        self.hooks
            .push((stage, entry(registration, None, order, callable)));
        Ok(())
    }

    /// Validates the descriptor and reserves the name; returns the registration order.
    fn claim(
        &mut self,
        kind: CallableKind,
        registration: &Registration,
    ) -> Result<usize, EngineError> {
        if registration.name.trim().is_empty() {
            return Err(EngineError::config(format!("{kind} names must not be blank")));
        }
        registration.params.validate(kind, &registration.name)?;
        let names = self.names.entry(kind).or_default();
        if !names.insert(registration.name.clone()) {
            return Err(EngineError::config_for(
                registration.name.clone(),
                format!("duplicate {kind} '{}'", registration.name),
            ));
        }
        debug!(kind = %kind, name = %registration.name, "registered callable");
        Ok(names.len() - 1)
    }

    fn check_field_references(&self) -> Result<(), EngineError> {
        let known: BTreeSet<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();
        let bound = self
            .column_detectors
            .iter()
            .map(|e| (CallableKind::ColumnDetector, &e.name, &e.field))
            .chain(
                self.transforms
                    .iter()
                    .map(|e| (CallableKind::Transform, &e.name, &e.field)),
            )
            .chain(
                self.validators
                    .iter()
                    .map(|e| (CallableKind::Validator, &e.name, &e.field)),
            );
        for (kind, name, field) in bound {
            if let Some(field) = field
                && !known.contains(field.as_str())
            {
                return Err(EngineError::config_for(
                    name.clone(),
                    format!("{kind} '{name}' refers to unknown field '{field}'"),
                ));
            }
        }
        Ok(())
    }

    pub fn finish(
        self,
        package: PackageInfo,
        settings: EngineSettings,
    ) -> Result<Registry, EngineError> {
        if self.fields.is_empty() {
            return Err(EngineError::config(format!(
                "package '{}' registers no fields",
                package.name
            )));
        }
        self.check_field_references()?;
        settings.validate()?;

        let Self {
            fields,
            mut row_detectors,
            mut column_detectors,
            mut transforms,
            mut validators,
            hooks,
            ..
        } = self;
        sort_entries(&mut row_detectors);
        sort_entries(&mut column_detectors);
        sort_entries(&mut transforms);
        sort_entries(&mut validators);
        let mut staged: BTreeMap<HookStage, Vec<Entry<dyn Hook>>> = BTreeMap::new();
        for (stage, hook) in hooks {
            staged.entry(stage).or_default().push(hook);
        }
        for entries in staged.values_mut() {
            sort_entries(entries);
        }

        Ok(Registry {
            package,
            settings,
            fields,
            row_detectors,
            column_detectors,
            transforms,
            validators,
            hooks: staged,
        })
    }
}

fn entry<C: ?Sized>(
    registration: Registration,
    field: Option<String>,
    order: usize,
    callable: Box<C>,
) -> Entry<C> {
    Entry {
        name: registration.name,
        priority: registration.priority,
        params: registration.params,
        field,
        order,
        callable,
    }
}

/// Immutable catalog of one package, shared read-only by a run.
pub struct Registry {
    package: PackageInfo,
    settings: EngineSettings,
    fields: Vec<FieldDef>,
    row_detectors: Vec<Entry<dyn RowDetector>>,
    column_detectors: Vec<Entry<dyn ColumnDetector>>,
    transforms: Vec<Entry<dyn Transform>>,
    validators: Vec<Entry<dyn Validator>>,
    hooks: BTreeMap<HookStage, Vec<Entry<dyn Hook>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("package", &self.package)
            .field("fields", &self.fields.len())
            .field("row_detectors", &self.row_detectors.len())
            .field("column_detectors", &self.column_detectors.len())
            .field("transforms", &self.transforms.len())
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Runs the package's registration and validates the result.
    pub fn build(package: &dyn ExtensionPackage) -> Result<Self, EngineError> {
        let info = PackageInfo {
            name: package.name().to_string(),
            version: package.version().to_string(),
            schema: package.schema().to_string(),
        };
        let mut builder = RegistryBuilder::new();
        package.register(&mut builder)?;
        let registry = builder.finish(info, package.settings())?;
        debug!(
            package = %registry.package.name,
            fields = registry.fields.len(),
            row_detectors = registry.row_detectors.len(),
            column_detectors = registry.column_detectors.len(),
            "registry built"
        );
        Ok(registry)
    }

    pub fn package(&self) -> &PackageInfo {
        &self.package
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Replaces the engine settings, e.g. with per-run overrides applied.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    pub fn row_detectors(&self) -> &[Entry<dyn RowDetector>] {
        &self.row_detectors
    }

    pub fn column_detectors(&self) -> &[Entry<dyn ColumnDetector>] {
        &self.column_detectors
    }

    /// Transforms bound to `field`, in execution order.
    pub fn transforms_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a Entry<dyn Transform>> + 'a {
        self.transforms
            .iter()
            .filter(move |entry| entry.field.as_deref() == Some(field))
    }

    /// Validators bound to `field`, in execution order.
    pub fn validators_for<'a>(
        &'a self,
        field: &'a str,
    ) -> impl Iterator<Item = &'a Entry<dyn Validator>> + 'a {
        self.validators
            .iter()
            .filter(move |entry| entry.field.as_deref() == Some(field))
    }

    pub fn transforms(&self) -> &[Entry<dyn Transform>] {
        &self.transforms
    }

    pub fn validators(&self) -> &[Entry<dyn Validator>] {
        &self.validators
    }

    /// Hooks of one stage, in execution order.
    pub fn hooks_for(&self, stage: HookStage) -> &[Entry<dyn Hook>] {
        self.hooks.get(&stage).map(Vec::as_slice).unwrap_or_default()
    }
}
