//! Column mapping: scores every column of a detected table against the
//! registered column detectors and resolves the scores into a [`ColumnMap`].

pub mod naming;
pub mod sample;
pub mod score;

use std::collections::BTreeMap;

use ade_model::{
    ColumnMap, ConflictPolicy, EngineError, ExtractedTable, MappedColumn, UnmappedColumn,
    UnmappedReason,
};
use ade_registry::{Registry, RunState};
use tracing::debug;

pub use naming::{HeaderNamer, sanitize_header};
pub use sample::sample_indices;
pub use score::{ColumnScores, FieldScore, score_columns};

/// Maps the columns of one table onto the registry's fields.
pub fn map_table(
    table: &ExtractedTable,
    registry: &Registry,
    state: &RunState,
) -> Result<ColumnMap, EngineError> {
    let scores = score_columns(table, registry, state)?;
    Ok(resolve(table, &scores, registry))
}

/// Turns column scores into field assignments under the configured
/// threshold and conflict policy.
pub fn resolve(table: &ExtractedTable, scores: &[ColumnScores], registry: &Registry) -> ColumnMap {
    let settings = registry.settings();
    let mut outcomes: Vec<Outcome> = Vec::with_capacity(scores.len());
    let mut contenders: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (position, column) in scores.iter().enumerate() {
        let outcome = match column.best(registry) {
            None => Outcome::Unmapped(UnmappedReason::NoScore),
            Some((_, score)) if score < settings.mapping_threshold => {
                Outcome::Unmapped(UnmappedReason::BelowThreshold)
            }
            Some((field, _)) => {
                contenders.entry(field).or_default().push(position);
                Outcome::Contender
            }
        };
        outcomes.push(outcome);
    }

    for (field, positions) in &contenders {
        let winner = match settings.conflict_policy {
            _ if positions.len() == 1 => Some(positions[0]),
            ConflictPolicy::Leftmost => positions.first().copied(),
            ConflictPolicy::LeaveUnmapped => None,
            ConflictPolicy::BestScore => best_scoring(field, positions, scores),
        };
        let loser = if winner.is_some() {
            UnmappedReason::ConflictLost
        } else {
            UnmappedReason::ConflictUnresolved
        };
        if positions.len() > 1 {
            debug!(
                table = %table.label(),
                field = %field,
                contenders = positions.len(),
                policy = ?settings.conflict_policy,
                winner = ?winner.map(|position| scores[position].column),
                "resolved mapping conflict"
            );
        }
        for &position in positions {
            outcomes[position] = if Some(position) == winner {
                Outcome::Mapped((*field).to_string())
            } else {
                Outcome::Unmapped(loser)
            };
        }
    }

    let mut map = ColumnMap::new(table.region);
    let mut namer = HeaderNamer::new(
        &settings.unmapped_prefix,
        registry.fields().iter().map(|field| field.name.as_str()),
    );
    for (column, outcome) in scores.iter().zip(outcomes) {
        let first_use = namer.observe(&column.header);
        match outcome {
            Outcome::Mapped(field) => {
                let score = column.fields.get(&field).map_or(0.0, |score| score.total);
                debug!(
                    table = %table.label(),
                    column = column.column,
                    field = %field,
                    score,
                    "mapped column"
                );
                map.mapped.push(MappedColumn {
                    contributions: column.contributions(&field, registry),
                    field,
                    source_column_index: column.column,
                    header_text: column.header.clone(),
                    score,
                });
            }
            Outcome::Unmapped(reason) => {
                let output_header = settings
                    .append_unmapped
                    .then(|| namer.name(&column.header, column.column, first_use));
                debug!(
                    table = %table.label(),
                    column = column.column,
                    reason = reason.as_str(),
                    "left column unmapped"
                );
                map.unmapped.push(UnmappedColumn {
                    header_text: column.header.clone(),
                    source_column_index: column.column,
                    output_header,
                    reason,
                    best_candidate: column
                        .best(registry)
                        .map(|(field, score)| (field.to_string(), score)),
                });
            }
            Outcome::Contender => {}
        }
    }
    map
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Contender,
    Mapped(String),
    Unmapped(UnmappedReason),
}

/// Highest score for `field`; equal scores go to the leftmost column.
fn best_scoring(field: &str, positions: &[usize], scores: &[ColumnScores]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &position in positions {
        let score = scores[position]
            .fields
            .get(field)
            .map_or(f64::NEG_INFINITY, |score| score.total);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((position, score));
        }
    }
    best.map(|(position, _)| position)
}
