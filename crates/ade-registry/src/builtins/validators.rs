//! Built-in validators.

use ade_model::{CellValue, Severity};
use regex::Regex;
use serde_json::json;

use crate::callable::{IssueDraft, Validator};
use crate::context::ValidatorContext;
use crate::error::ExtensionError;

/// Code, severity and message an issue is reported with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTemplate {
    pub code: String,
    pub severity: Severity,
    pub message: Option<String>,
}

impl IssueTemplate {
    pub fn new(code: impl Into<String>, severity: Severity) -> Self {
        Self {
            code: code.into(),
            severity,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    fn issue(&self, row_index: usize, default_message: String) -> IssueDraft {
        let message = self.message.clone().unwrap_or(default_message);
        IssueDraft::new(row_index, self.code.clone(), self.severity, message)
    }
}

fn present(values: &[CellValue]) -> impl Iterator<Item = (usize, &CellValue)> {
    values
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_empty())
}

#[derive(Debug, Clone)]
pub struct Required {
    template: IssueTemplate,
}

impl Required {
    pub fn new(template: IssueTemplate) -> Self {
        Self { template }
    }
}

impl Default for Required {
    fn default() -> Self {
        Self::new(IssueTemplate::new("required_missing", Severity::Error))
    }
}

impl Validator for Required {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        let label = ctx.field.display_label();
        Ok(ctx
            .values
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(row, _)| self.template.issue(row, format!("{label} is required")))
            .collect())
    }
}

/// Flags non-empty values that do not match a regex.
#[derive(Debug, Clone)]
pub struct Pattern {
    pattern: Regex,
    template: IssueTemplate,
}

impl Pattern {
    pub fn new(pattern: Regex, template: IssueTemplate) -> Self {
        Self { pattern, template }
    }
}

impl Validator for Pattern {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        let label = ctx.field.display_label();
        Ok(present(ctx.values)
            .filter(|(_, cell)| !self.pattern.is_match(&cell.to_trimmed_string()))
            .map(|(row, cell)| {
                self.template
                    .issue(row, format!("{label} does not match the expected format"))
                    .with_details(json!({ "value": cell.to_string(), "pattern": self.pattern.as_str() }))
            })
            .collect())
    }
}

/// Flags values outside an allowed set.
#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<String>,
    case_sensitive: bool,
    template: IssueTemplate,
}

impl OneOf {
    pub fn new(allowed: Vec<String>, case_sensitive: bool, template: IssueTemplate) -> Self {
        Self {
            allowed,
            case_sensitive,
            template,
        }
    }

    fn allows(&self, value: &str) -> bool {
        if self.case_sensitive {
            self.allowed.iter().any(|allowed| allowed == value)
        } else {
            self.allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(value))
        }
    }
}

impl Validator for OneOf {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        let label = ctx.field.display_label();
        Ok(present(ctx.values)
            .filter(|(_, cell)| !self.allows(&cell.to_trimmed_string()))
            .map(|(row, cell)| {
                self.template
                    .issue(row, format!("{label} is not one of the allowed values"))
                    .with_details(json!({ "value": cell.to_string(), "allowed": self.allowed }))
            })
            .collect())
    }
}

/// Flags non-numeric values and, optionally, numbers outside `[min, max]`.
#[derive(Debug, Clone)]
pub struct Numeric {
    min: Option<f64>,
    max: Option<f64>,
    template: IssueTemplate,
}

impl Numeric {
    pub fn new(min: Option<f64>, max: Option<f64>, template: IssueTemplate) -> Self {
        Self { min, max, template }
    }
}

impl Validator for Numeric {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        let label = ctx.field.display_label();
        let mut issues = Vec::new();
        for (row, cell) in present(ctx.values) {
            let Some(number) = cell.as_number() else {
                issues.push(
                    IssueDraft::new(
                        row,
                        "not_numeric",
                        self.template.severity,
                        format!("{label} must be a number"),
                    )
                    .with_details(json!({ "value": cell.to_string() })),
                );
                continue;
            };
            let below = self.min.is_some_and(|min| number < min);
            let above = self.max.is_some_and(|max| number > max);
            if below || above {
                issues.push(
                    self.template
                        .issue(row, format!("{label} is out of range"))
                        .with_details(json!({ "value": number, "min": self.min, "max": self.max })),
                );
            }
        }
        Ok(issues)
    }
}

#[derive(Debug, Clone)]
pub struct MaxLength {
    max: usize,
    template: IssueTemplate,
}

impl MaxLength {
    pub fn new(max: usize, template: IssueTemplate) -> Self {
        Self { max, template }
    }
}

impl Validator for MaxLength {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        let label = ctx.field.display_label();
        Ok(present(ctx.values)
            .filter_map(|(row, cell)| {
                let length = cell.to_string().chars().count();
                (length > self.max).then(|| {
                    self.template
                        .issue(row, format!("{label} is longer than {} characters", self.max))
                        .with_details(json!({ "length": length, "max": self.max }))
                })
            })
            .collect())
    }
}
