//! Per-field transform and validation pipeline.

use ade_model::{
    CellValue, ColumnMap, EngineError, ExtractedTable, FieldDef, NormalizedTable, PipelineStage,
    ValidationIssue,
};
use ade_registry::{Registry, RunState, TransformContext, TransformOutcome, ValidatorContext};
use tracing::{debug, trace};

/// Final values and findings of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub field: String,
    pub values: Vec<CellValue>,
    /// Transforms that changed the values, in execution order.
    pub applied: Vec<String>,
    pub issues: Vec<ValidationIssue>,
}

/// Processing order of fields: mapped fields by source column, then the
/// remaining fields in declaration order.
pub fn field_order<'a>(registry: &'a Registry, map: &ColumnMap) -> Vec<&'a FieldDef> {
    let mut mapped: Vec<(usize, &FieldDef)> = registry
        .fields()
        .iter()
        .filter_map(|field| {
            map.mapped_for(&field.name)
                .map(|column| (column.source_column_index, field))
        })
        .collect();
    mapped.sort_by_key(|(column, _)| *column);
    let mut order: Vec<&FieldDef> = mapped.into_iter().map(|(_, field)| field).collect();
    order.extend(
        registry
            .fields()
            .iter()
            .filter(|field| !map.is_mapped(&field.name)),
    );
    order
}

/// Runs the field pipeline over one table.
///
/// Rows come out in canonical field order; retained unmapped columns keep
/// their source order. Issues are ordered by field processing order, then by
/// the order each validator reported them.
pub fn normalize_table(
    table: &ExtractedTable,
    map: &ColumnMap,
    registry: &Registry,
    state: &mut RunState,
) -> Result<NormalizedTable, EngineError> {
    let row_count = table.rows.len();
    let fields = registry.fields();
    let mut rows = vec![vec![CellValue::Empty; fields.len()]; row_count];
    let mut issues = Vec::new();

    for field in field_order(registry, map) {
        let initial = match map.mapped_for(&field.name) {
            Some(column) => table.column_values(column.source_column_index),
            None => vec![CellValue::Empty; row_count],
        };
        let outcome = run_field(field, initial, registry, state)?;
        if !outcome.applied.is_empty() {
            debug!(
                table = %table.label(),
                field = %field.name,
                transforms = ?outcome.applied,
                "transformed field"
            );
        }
        if let Some(position) = registry.field_position(&field.name) {
            for (row, value) in rows.iter_mut().zip(outcome.values) {
                row[position] = value;
            }
        }
        issues.extend(outcome.issues);
    }

    let appended: Vec<_> = map.appended().collect();
    let unmapped_headers = appended
        .iter()
        .filter_map(|column| column.output_header.clone())
        .collect();
    let columns: Vec<Vec<CellValue>> = appended
        .iter()
        .map(|column| table.column_values(column.source_column_index))
        .collect();
    let unmapped_rows = (0..row_count)
        .map(|row| columns.iter().map(|values| values[row].clone()).collect())
        .collect();

    debug!(
        table = %table.label(),
        rows = row_count,
        issues = issues.len(),
        "normalized table"
    );
    Ok(NormalizedTable {
        source_file: table.source_file.clone(),
        source_sheet: table.source_sheet.clone(),
        sheet_index: table.sheet_index,
        table_index: table.table_index,
        region: table.region,
        header: table.header.clone(),
        column_map: map.clone(),
        fields: fields.iter().map(|field| field.name.clone()).collect(),
        rows,
        unmapped_headers,
        unmapped_rows,
        issues,
    })
}

/// Threads a field's values through its transforms, then validates them.
pub fn run_field(
    field: &FieldDef,
    initial: Vec<CellValue>,
    registry: &Registry,
    state: &mut RunState,
) -> Result<FieldOutcome, EngineError> {
    let row_count = initial.len();
    let mut values = initial;
    let mut applied = Vec::new();

    for entry in registry.transforms_for(&field.name) {
        let outcome = {
            let mut ctx = TransformContext {
                field,
                values: &values,
                state: entry.declares("state").then(|| state.scope(&entry.name)),
            };
            entry.callable().apply(&mut ctx)
        };
        match outcome.map_err(|error| {
            EngineError::pipeline(PipelineStage::Transform, &entry.name, error.to_string())
        })? {
            TransformOutcome::Unchanged => {}
            TransformOutcome::Replace(replaced) => {
                if replaced.len() != row_count {
                    return Err(EngineError::pipeline(
                        PipelineStage::Transform,
                        &entry.name,
                        format!(
                            "returned {} values for {row_count} rows of field '{}'",
                            replaced.len(),
                            field.name
                        ),
                    ));
                }
                trace!(field = %field.name, transform = %entry.name, "applied transform");
                values = replaced;
                applied.push(entry.name.clone());
            }
        }
    }

    let mut issues = Vec::new();
    for entry in registry.validators_for(&field.name) {
        let drafts = {
            let mut ctx = ValidatorContext {
                field,
                values: &values,
                state: entry.declares("state").then(|| state.scope(&entry.name)),
            };
            entry.callable().validate(&mut ctx)
        }
        .map_err(|error| {
            EngineError::pipeline(PipelineStage::Validation, &entry.name, error.to_string())
        })?;
        for draft in drafts {
            if draft.row_index >= row_count {
                return Err(EngineError::pipeline(
                    PipelineStage::Validation,
                    &entry.name,
                    format!(
                        "issue row {} is outside the {row_count} rows of field '{}'",
                        draft.row_index, field.name
                    ),
                ));
            }
            issues.push(ValidationIssue {
                row_index: draft.row_index,
                field: field.name.clone(),
                code: draft.code,
                severity: draft.severity,
                message: draft.message,
                details: draft.details,
            });
        }
    }

    Ok(FieldOutcome {
        field: field.name.clone(),
        values,
        applied,
        issues,
    })
}
