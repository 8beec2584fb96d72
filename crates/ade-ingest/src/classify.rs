//! Row classification and table boundary detection.
//!
//! Every row is scored by all registered row detectors; the summed votes pick
//! header, data or unknown. Table regions are then derived from the sequence
//! of row kinds.

use std::collections::BTreeMap;

use ade_model::{
    CellValue, EngineError, ModelError, PipelineStage, RowKind, SourceSheet, TableRegion,
    redact_value,
};
use ade_registry::{Registry, RowContext, RunState};
use tracing::{Level, debug, enabled, trace, warn};

/// Row kinds and tables found in one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// One kind per sheet row.
    pub kinds: Vec<RowKind>,
    pub regions: Vec<TableRegion>,
    /// 1-based rows classified as data that belong to no table.
    pub orphan_rows: Vec<usize>,
}

#[derive(Debug, Default, Clone, Copy)]
struct KindScore {
    total: f64,
    /// Highest priority among detectors that voted for the kind.
    priority: Option<i32>,
}

/// Scores one row against every row detector.
pub fn classify_row(
    registry: &Registry,
    row_index: usize,
    row: &[CellValue],
    sheet_name: Option<&str>,
    state: &RunState,
) -> Result<RowKind, EngineError> {
    let mut scores: BTreeMap<RowKind, KindScore> = BTreeMap::new();
    let mut any_vote = false;
    for entry in registry.row_detectors() {
        let ctx = RowContext {
            row_index,
            row_values: row,
            sheet_name: sheet_name.filter(|_| entry.declares("sheet_name")),
            state: entry.declares("state").then_some(state),
        };
        let patch = entry.callable().detect(&ctx).map_err(|error| {
            EngineError::pipeline(
                PipelineStage::RowClassification,
                &entry.name,
                format!("row {}: {error}", row_index + 1),
            )
        })?;
        for delta in patch.deltas() {
            if !delta.delta.is_finite() {
                return Err(EngineError::pipeline(
                    PipelineStage::RowClassification,
                    &entry.name,
                    format!("row {}: non-finite score {}", row_index + 1, delta.delta),
                ));
            }
            if delta.target == RowKind::Unknown {
                return Err(EngineError::pipeline(
                    PipelineStage::RowClassification,
                    &entry.name,
                    "row detectors may only vote for header or data",
                ));
            }
            any_vote = true;
            let score = scores.entry(delta.target).or_default();
            score.total += delta.delta;
            score.priority = Some(score.priority.map_or(entry.priority, |p| p.max(entry.priority)));
        }
    }
    if !any_vote {
        return Ok(RowKind::Unknown);
    }

    // Kinds nobody voted for score zero.
    let mut best: Option<(RowKind, KindScore)> = None;
    for kind in RowKind::VOTABLE {
        let score = scores.get(&kind).copied().unwrap_or_default();
        let better = match best {
            None => true,
            Some((_, current)) => {
                score.total > current.total
                    || (score.total == current.total && score.priority > current.priority)
            }
        };
        if better {
            best = Some((kind, score));
        }
    }
    let kind = match best {
        Some((kind, score)) if score.total > 0.0 => kind,
        _ => RowKind::Unknown,
    };
    if enabled!(Level::TRACE) {
        let values: Vec<String> = row.iter().map(CellValue::to_trimmed_string).collect();
        trace!(
            row = row_index + 1,
            %kind,
            values = redact_value(&values.join("|")),
            "classified row"
        );
    }
    Ok(kind)
}

/// Classifies every row of a sheet and derives its table regions.
pub fn classify_sheet(
    sheet: &SourceSheet,
    registry: &Registry,
    state: &RunState,
) -> Result<SheetLayout, EngineError> {
    let kinds = sheet
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| classify_row(registry, index, row, sheet.name.as_deref(), state))
        .collect::<Result<Vec<_>, _>>()?;
    let (regions, orphan_rows) = derive_regions(sheet, &kinds)?;
    if !orphan_rows.is_empty() {
        warn!(
            sheet = sheet.display_name(),
            orphans = orphan_rows.len(),
            first = orphan_rows[0],
            "data rows outside any table were ignored"
        );
    }
    debug!(
        sheet = sheet.display_name(),
        rows = kinds.len(),
        tables = regions.len(),
        "classified sheet"
    );
    Ok(SheetLayout {
        kinds,
        regions,
        orphan_rows,
    })
}

#[derive(Debug, Clone, Copy)]
struct OpenTable {
    header_row: usize,
    last_row: usize,
    closed: bool,
}

/// Turns row kinds into table regions.
///
/// A header opens a table (closing the previous one). Contiguous data rows
/// extend it; an unknown row closes its data run. Data rows outside an open
/// run are returned as orphans.
pub fn derive_regions(
    sheet: &SourceSheet,
    kinds: &[RowKind],
) -> Result<(Vec<TableRegion>, Vec<usize>), ModelError> {
    let mut regions = Vec::new();
    let mut orphans = Vec::new();
    let mut open: Option<OpenTable> = None;
    for (index, kind) in kinds.iter().enumerate() {
        let row = index + 1;
        match kind {
            RowKind::Header => {
                if let Some(table) = open.take() {
                    regions.push(bound_columns(sheet, table)?);
                }
                open = Some(OpenTable {
                    header_row: row,
                    last_row: row,
                    closed: false,
                });
            }
            RowKind::Data => match open.as_mut() {
                Some(table) if !table.closed => table.last_row = row,
                _ => orphans.push(row),
            },
            RowKind::Unknown => {
                if let Some(table) = open.as_mut() {
                    table.closed = true;
                }
            }
        }
    }
    if let Some(table) = open {
        regions.push(bound_columns(sheet, table)?);
    }
    Ok((regions, orphans))
}

/// Column bounds are the outermost non-empty cells of the table's rows.
fn bound_columns(sheet: &SourceSheet, table: OpenTable) -> Result<TableRegion, ModelError> {
    let mut first: Option<usize> = None;
    let mut last: Option<usize> = None;
    for row in table.header_row..=table.last_row {
        let Some(cells) = sheet.rows.get(row - 1) else {
            continue;
        };
        if let Some(col) = cells.iter().position(|cell| !cell.is_empty()) {
            first = Some(first.map_or(col + 1, |f| f.min(col + 1)));
        }
        if let Some(col) = cells.iter().rposition(|cell| !cell.is_empty()) {
            last = Some(last.map_or(col + 1, |l| l.max(col + 1)));
        }
    }
    let first_col = first.unwrap_or(1);
    let last_col = last.unwrap_or(first_col).max(first_col);
    TableRegion::new(table.header_row, first_col, table.last_row, last_col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ade_model::text_row;

    fn sheet(rows: &[&[&str]]) -> SourceSheet {
        SourceSheet::new(None, rows.iter().map(|row| text_row(row)).collect())
    }

    #[test]
    fn header_then_header_yields_zero_row_table() {
        let sheet = sheet(&[&["a", "b"], &["c", "d"], &["1", "2"]]);
        let kinds = [RowKind::Header, RowKind::Header, RowKind::Data];
        let (regions, orphans) = derive_regions(&sheet, &kinds).expect("regions");
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].header_row(), 1);
        assert_eq!(regions[0].last_row(), 1);
        assert_eq!(regions[0].data_row_count(), 0);
        assert_eq!(regions[1].last_row(), 3);
        assert!(orphans.is_empty());
    }

    #[test]
    fn unknown_row_closes_data_run() {
        let sheet = sheet(&[&["a"], &["1"], &[""], &["2"]]);
        let kinds = [RowKind::Header, RowKind::Data, RowKind::Unknown, RowKind::Data];
        let (regions, orphans) = derive_regions(&sheet, &kinds).expect("regions");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].last_row(), 2);
        assert_eq!(orphans, vec![4]);
    }

    #[test]
    fn data_before_any_header_is_orphaned() {
        let sheet = sheet(&[&["1"], &["h"], &["2"]]);
        let kinds = [RowKind::Data, RowKind::Header, RowKind::Data];
        let (regions, orphans) = derive_regions(&sheet, &kinds).expect("regions");
        assert_eq!(orphans, vec![1]);
        assert_eq!(regions[0].header_row(), 2);
    }

    #[test]
    fn columns_bound_to_non_empty_cells() {
        let sheet = sheet(&[&["", "h1", "h2", ""], &["", "", "x", "y"]]);
        let kinds = [RowKind::Header, RowKind::Data];
        let (regions, _) = derive_regions(&sheet, &kinds).expect("regions");
        assert_eq!(regions[0].first_col(), 2);
        assert_eq!(regions[0].last_col(), 4);
    }

    #[test]
    fn blank_header_falls_back_to_first_column() {
        let sheet = sheet(&[&["", ""]]);
        let (regions, _) = derive_regions(&sheet, &[RowKind::Header]).expect("regions");
        assert_eq!(regions[0].first_col(), 1);
        assert_eq!(regions[0].last_col(), 1);
    }
}
