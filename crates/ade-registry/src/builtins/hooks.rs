//! Built-in lifecycle hooks.

use ade_model::NoteLevel;

use crate::callable::{Hook, Replacement};
use crate::context::HookContext;
use crate::error::ExtensionError;

/// Removes all-empty data rows from a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropBlankRows;

impl Hook for DropBlankRows {
    fn run(&self, ctx: &mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError> {
        let Some(table) = ctx.table else {
            return Ok(None);
        };
        let kept: Vec<_> = table
            .rows
            .iter()
            .filter(|row| !row.iter().all(ade_model::CellValue::is_empty))
            .cloned()
            .collect();
        let dropped = table.rows.len() - kept.len();
        if dropped == 0 {
            return Ok(None);
        }
        if let Some(notes) = ctx.notes.as_mut() {
            notes.add(
                NoteLevel::Info,
                format!("dropped {dropped} blank row(s) from {}", table.label()),
            );
        }
        let mut replaced = table.clone();
        replaced.rows = kept;
        Ok(Some(Replacement::Table(replaced)))
    }
}

/// Appends a fixed note to the artifact.
#[derive(Debug, Clone)]
pub struct AddNote {
    level: NoteLevel,
    message: String,
}

impl AddNote {
    pub fn new(level: NoteLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

impl Hook for AddNote {
    fn run(&self, ctx: &mut HookContext<'_>) -> Result<Option<Replacement>, ExtensionError> {
        if let Some(notes) = ctx.notes.as_mut() {
            notes.add(self.level, self.message.clone());
        }
        Ok(None)
    }
}
