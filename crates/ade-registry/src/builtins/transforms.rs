//! Built-in transforms. Each only touches text cells unless noted.

use ade_model::CellValue;
use regex::Regex;

use crate::callable::{Transform, TransformOutcome};
use crate::context::TransformContext;
use crate::error::ExtensionError;

/// Applies `f` to every text cell; reports `Unchanged` when nothing moved.
fn map_text(values: &[CellValue], f: impl Fn(&str) -> String) -> TransformOutcome {
    let mut changed = false;
    let replaced: Vec<CellValue> = values
        .iter()
        .map(|cell| match cell {
            CellValue::Text(text) => {
                let next = f(text);
                if next != *text {
                    changed = true;
                }
                CellValue::from(next)
            }
            other => other.clone(),
        })
        .collect();
    if changed {
        TransformOutcome::Replace(replaced)
    } else {
        TransformOutcome::Unchanged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Trim,
    Lower,
    Upper,
    CollapseWhitespace,
}

#[derive(Debug, Clone, Copy)]
pub struct TextTransform(pub TextCase);

impl Transform for TextTransform {
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> {
        Ok(match self.0 {
            TextCase::Trim => map_text(ctx.values, |text| text.trim().to_string()),
            TextCase::Lower => map_text(ctx.values, str::to_lowercase),
            TextCase::Upper => map_text(ctx.values, str::to_uppercase),
            TextCase::CollapseWhitespace => map_text(ctx.values, |text| {
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            }),
        })
    }
}

/// Converts numeric-looking text to numbers; other cells are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToNumber;

impl Transform for ToNumber {
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> {
        let mut changed = false;
        let replaced: Vec<CellValue> = ctx
            .values
            .iter()
            .map(|cell| match cell {
                CellValue::Text(text) => match cell.as_number() {
                    Some(number) if !text.trim().is_empty() => {
                        changed = true;
                        CellValue::Number(number)
                    }
                    _ => cell.clone(),
                },
                other => other.clone(),
            })
            .collect();
        Ok(if changed {
            TransformOutcome::Replace(replaced)
        } else {
            TransformOutcome::Unchanged
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegexReplace {
    pattern: Regex,
    replacement: String,
}

impl RegexReplace {
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }
}

impl Transform for RegexReplace {
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> {
        Ok(map_text(ctx.values, |text| {
            self.pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned()
        }))
    }
}

/// Fills empty cells with a fixed value.
#[derive(Debug, Clone)]
pub struct DefaultValue {
    value: CellValue,
}

impl DefaultValue {
    pub fn new(value: CellValue) -> Self {
        Self { value }
    }
}

impl Transform for DefaultValue {
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> {
        if !ctx.values.iter().any(CellValue::is_empty) || self.value.is_empty() {
            return Ok(TransformOutcome::Unchanged);
        }
        Ok(TransformOutcome::Replace(
            ctx.values
                .iter()
                .map(|cell| {
                    if cell.is_empty() {
                        self.value.clone()
                    } else {
                        cell.clone()
                    }
                })
                .collect(),
        ))
    }
}
