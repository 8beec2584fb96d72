//! Per-column score accumulation across detectors and passes.

use std::collections::BTreeMap;

use ade_model::{CellValue, Contribution, EngineError, ExtractedTable, PipelineStage};
use ade_registry::{ColumnContext, ColumnDetector, ColumnPatch, Entry, Registry, RunState};
use tracing::trace;

use crate::sample::sample_indices;

/// Summed score of one field for one column, with per-detector parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldScore {
    pub total: f64,
    /// Keyed by detector position in the registry.
    parts: BTreeMap<usize, f64>,
}

/// Every field score of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScores {
    /// 1-based sheet column.
    pub column: usize,
    pub header: String,
    /// Only fields that received at least one vote.
    pub fields: BTreeMap<String, FieldScore>,
}

impl ColumnScores {
    /// Highest-scoring field; ties go to the field declared first.
    pub fn best(&self, registry: &Registry) -> Option<(&str, f64)> {
        let mut best: Option<(usize, &str, f64)> = None;
        for (field, score) in &self.fields {
            let position = registry.field_position(field).unwrap_or(usize::MAX);
            let better = match best {
                None => true,
                Some((best_position, _, best_total)) => {
                    score.total > best_total
                        || (score.total == best_total && position < best_position)
                }
            };
            if better {
                best = Some((position, field.as_str(), score.total));
            }
        }
        best.map(|(_, field, total)| (field, total))
    }

    /// Detector contributions to `field`, by priority then detector name.
    pub fn contributions(&self, field: &str, registry: &Registry) -> Vec<Contribution> {
        let Some(score) = self.fields.get(field) else {
            return Vec::new();
        };
        let detectors = registry.column_detectors();
        let mut parts: Vec<(&Entry<dyn ColumnDetector>, f64)> = score
            .parts
            .iter()
            .filter_map(|(index, delta)| detectors.get(*index).map(|entry| (entry, *delta)))
            .collect();
        parts.sort_by(|(a, _), (b, _)| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        parts
            .into_iter()
            .map(|(entry, delta)| Contribution {
                detector: entry.name.clone(),
                delta,
            })
            .collect()
    }
}

/// Scores every column of a table against every column detector.
pub fn score_columns(
    table: &ExtractedTable,
    registry: &Registry,
    state: &RunState,
) -> Result<Vec<ColumnScores>, EngineError> {
    let sample_size = registry.settings().sample_size;
    table
        .region
        .columns()
        .map(|column| {
            let header = table.header_text(column);
            let values = table.column_values(column);
            let sample: Vec<CellValue> = sample_indices(values.len(), sample_size)
                .into_iter()
                .map(|index| values[index].clone())
                .collect();
            let mut scores = ColumnScores {
                column,
                header,
                fields: BTreeMap::new(),
            };
            for (index, entry) in registry.column_detectors().iter().enumerate() {
                for pass in Pass::of(entry) {
                    let input = PassInput {
                        pass,
                        column,
                        header: &scores.header,
                        sample: &sample,
                    };
                    let patch = invoke(entry, &input, table, registry, state)?;
                    accumulate(&mut scores, index, entry, &patch, registry)?;
                }
            }
            trace!(column, fields = scores.fields.len(), "scored column");
            Ok(scores)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Header,
    Values,
    Bare,
}

impl Pass {
    fn of(entry: &Entry<dyn ColumnDetector>) -> Vec<Self> {
        let mut passes = Vec::with_capacity(2);
        if entry.declares("header") {
            passes.push(Self::Header);
        }
        if entry.declares("column_values_sample") {
            passes.push(Self::Values);
        }
        if passes.is_empty() {
            passes.push(Self::Bare);
        }
        passes
    }
}

struct PassInput<'a> {
    pass: Pass,
    column: usize,
    header: &'a str,
    sample: &'a [CellValue],
}

fn invoke(
    entry: &Entry<dyn ColumnDetector>,
    input: &PassInput<'_>,
    table: &ExtractedTable,
    registry: &Registry,
    state: &RunState,
) -> Result<ColumnPatch, EngineError> {
    let field = entry
        .field
        .as_deref()
        .and_then(|name| registry.field(name))
        .filter(|_| entry.declares("field"));
    let ctx = ColumnContext {
        field,
        column_index: input.column,
        table_index: table.table_index,
        sheet_name: table.source_sheet.as_deref().filter(|_| entry.declares("sheet_name")),
        header: (input.pass == Pass::Header).then_some(input.header),
        column_values_sample: (input.pass == Pass::Values).then_some(input.sample),
        state: entry.declares("state").then_some(state),
    };
    entry.callable().detect(&ctx).map_err(|error| {
        EngineError::pipeline(
            PipelineStage::ColumnMapping,
            &entry.name,
            format!("{} column {}: {error}", table.label(), input.column),
        )
    })
}

fn accumulate(
    scores: &mut ColumnScores,
    index: usize,
    entry: &Entry<dyn ColumnDetector>,
    patch: &ColumnPatch,
    registry: &Registry,
) -> Result<(), EngineError> {
    for delta in patch.deltas() {
        if !delta.delta.is_finite() {
            return Err(EngineError::pipeline(
                PipelineStage::ColumnMapping,
                &entry.name,
                format!(
                    "column {}: non-finite score {} for '{}'",
                    scores.column, delta.delta, delta.target
                ),
            ));
        }
        if registry.field(&delta.target).is_none() {
            return Err(EngineError::pipeline(
                PipelineStage::ColumnMapping,
                &entry.name,
                format!("column {}: vote for unknown field '{}'", scores.column, delta.target),
            ));
        }
        let score = scores.fields.entry(delta.target.clone()).or_default();
        score.total += delta.delta;
        *score.parts.entry(index).or_insert(0.0) += delta.delta;
    }
    Ok(())
}
