//! Callable contracts implemented by extension code.
//!
//! Each trait has a blanket implementation for plain functions and closures
//! with the matching signature, so packages can register either.

use ade_model::{
    CellValue, ColumnMap, ExtractedTable, HookStage, OutputWorkbook, Severity, SourceSheet,
    SourceWorkbook,
};

use crate::context::{ColumnContext, HookContext, RowContext, TransformContext, ValidatorContext};
use crate::error::ExtensionError;
use crate::score::{ColumnPatch, RowPatch};

pub trait RowDetector: Send + Sync {
    fn detect(&self, ctx: &RowContext<'_>) -> Result<RowPatch, ExtensionError>;
}

impl<F> RowDetector for F
where
    F: Fn(&RowContext<'_>) -> Result<RowPatch, ExtensionError> + Send + Sync,
{
    fn detect(&self, ctx: &RowContext<'_>) -> Result<RowPatch, ExtensionError> {
        self(ctx)
    }
}

pub trait ColumnDetector: Send + Sync {
    fn detect(&self, ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError>;
}

impl<F> ColumnDetector for F
where
    F: Fn(&ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> + Send + Sync,
{
    fn detect(&self, ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
        self(ctx)
    }
}

/// Result of a transform: keep the values or replace all of them.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Unchanged,
    /// Must hold exactly one value per row.
    Replace(Vec<CellValue>),
}

pub trait Transform: Send + Sync {
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError>;
}

impl<F> Transform for F
where
    F: Fn(&mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> + Send + Sync,
{
    fn apply(&self, ctx: &mut TransformContext<'_>) -> Result<TransformOutcome, ExtensionError> {
        self(ctx)
    }
}

/// A validation finding before the engine attaches it to a field and table.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDraft {
    /// 0-based index into the values handed to the validator.
    pub row_index: usize,
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl IssueDraft {
    pub fn new(
        row_index: usize,
        code: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            code: code.into(),
            severity,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError>;
}

impl<F> Validator for F
where
    F: Fn(&mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> + Send + Sync,
{
    fn validate(&self, ctx: &mut ValidatorContext<'_>) -> Result<Vec<IssueDraft>, ExtensionError> {
        self(ctx)
    }
}

/// Object a hook hands back to replace the in-flight one.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    Workbook(SourceWorkbook),
    Sheet(SourceSheet),
    Table(ExtractedTable),
    ColumnMap(ColumnMap),
    Output(OutputWorkbook),
}

impl Replacement {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workbook(_) => "source workbook",
            Self::Sheet(_) => "source sheet",
            Self::Table(_) => "extracted table",
            Self::ColumnMap(_) => "column map",
            Self::Output(_) => "output workbook",
        }
    }

    /// Whether `stage` installs replacements of this kind.
    pub fn accepted_at(&self, stage: HookStage) -> bool {
        matches!(
            (stage, self),
            (HookStage::OnWorkbookStart, Self::Workbook(_))
                | (HookStage::OnSheetStart, Self::Sheet(_))
                | (HookStage::OnTableDetected, Self::Table(_))
                | (HookStage::OnTableMapped, Self::Table(_) | Self::ColumnMap(_))
                | (HookStage::OnWorkbookBeforeSave, Self::Output(_))
        )
    }
}

pub trait Hook: Send + Sync {
    fn run(&self, ctx: &mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError>;
}

impl<F> Hook for F
where
    F: Fn(&mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError> + Send + Sync,
{
    fn run(&self, ctx: &mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError> {
        self(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replacement_acceptance_follows_stage_table() {
        let map = Replacement::ColumnMap(ColumnMap::new(
            ade_model::TableRegion::new(1, 1, 1, 1).expect("region"),
        ));
        assert!(map.accepted_at(HookStage::OnTableMapped));
        assert!(!map.accepted_at(HookStage::OnTableDetected));
        let output = Replacement::Output(OutputWorkbook::default());
        assert!(output.accepted_at(HookStage::OnWorkbookBeforeSave));
        assert!(!output.accepted_at(HookStage::OnTableWritten));
    }
}
