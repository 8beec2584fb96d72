//! Capability descriptors for extension callables.
//!
//! Every callable declares the context fields it consumes. The engine only
//! fills optional fields that were declared, and rejects descriptors that
//! could break when new context fields are added.

use std::collections::BTreeSet;
use std::fmt;

use ade_model::EngineError;

/// The kinds of callables a package can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallableKind {
    RowDetector,
    ColumnDetector,
    Transform,
    Validator,
    Hook,
}

impl CallableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RowDetector => "row detector",
            Self::ColumnDetector => "column detector",
            Self::Transform => "transform",
            Self::Validator => "validator",
            Self::Hook => "hook",
        }
    }

    /// Context fields a callable of this kind may declare.
    pub fn context_fields(&self) -> &'static [&'static str] {
        match self {
            Self::RowDetector => &["row_index", "row_values", "sheet_name", "state"],
            Self::ColumnDetector => &[
                "field",
                "column_index",
                "table_index",
                "sheet_name",
                "header",
                "column_values_sample",
                "state",
            ],
            Self::Transform | Self::Validator => &["field", "values", "state"],
            Self::Hook => &[
                "stage",
                "workbook",
                "sheet",
                "table",
                "column_map",
                "output",
                "state",
                "notes",
            ],
        }
    }
}

impl fmt::Display for CallableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared parameters of a callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    named: BTreeSet<String>,
    catch_all: bool,
    positional_only: Vec<String>,
}

impl Params {
    /// Named fields plus the catch-all. This is what well-behaved callables use.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            named: names.into_iter().map(Into::into).collect(),
            catch_all: true,
            positional_only: Vec::new(),
        }
    }

    /// Declares nothing beyond the catch-all.
    pub fn catch_all_only() -> Self {
        Self::of(std::iter::empty::<String>())
    }

    #[must_use]
    pub fn without_catch_all(mut self) -> Self {
        self.catch_all = false;
        self
    }

    #[must_use]
    pub fn with_positional(mut self, name: impl Into<String>) -> Self {
        self.positional_only.push(name.into());
        self
    }

    pub fn declares(&self, name: &str) -> bool {
        self.named.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(String::as_str)
    }

    pub fn has_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn validate(&self, kind: CallableKind, identity: &str) -> Result<(), EngineError> {
        if !self.catch_all {
            return Err(EngineError::config_for(
                identity,
                format!("{kind} '{identity}' must accept a catch-all for additional context fields"),
            ));
        }
        if let Some(name) = self.positional_only.first() {
            return Err(EngineError::config_for(
                identity,
                format!("{kind} '{identity}' declares positional-only parameter '{name}'"),
            ));
        }
        let allowed = kind.context_fields();
        if let Some(unknown) = self
            .named
            .iter()
            .find(|name| !allowed.contains(&name.as_str()))
        {
            return Err(EngineError::config_for(
                identity,
                format!(
                    "{kind} '{identity}' declares '{unknown}', which is not a {kind} context field (expected one of: {})",
                    allowed.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_fields_with_catch_all() {
        let params = Params::of(["header", "state"]);
        assert!(params.validate(CallableKind::ColumnDetector, "d").is_ok());
        assert!(params.declares("header"));
        assert!(!params.declares("column_values_sample"));
    }

    #[test]
    fn rejects_missing_catch_all() {
        let err = Params::of(["row_values"])
            .without_catch_all()
            .validate(CallableKind::RowDetector, "rows")
            .expect_err("catch-all required");
        assert_eq!(err.code(), "config_error");
        assert_eq!(err.extension(), Some("rows"));
    }

    #[test]
    fn rejects_positional_only() {
        let err = Params::of(["values"])
            .with_positional("values")
            .validate(CallableKind::Transform, "t")
            .expect_err("positional-only");
        assert!(err.to_string().contains("positional-only"));
    }

    #[test]
    fn rejects_fields_of_other_kinds() {
        let err = Params::of(["header"])
            .validate(CallableKind::RowDetector, "r")
            .expect_err("header is a column field");
        assert!(err.to_string().contains("'header'"));
    }
}
