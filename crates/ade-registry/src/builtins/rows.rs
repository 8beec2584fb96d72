//! Built-in row detectors.
//!
//! Both detectors look at the span between the first and last non-empty cell
//! of a row and vote from simple cell statistics.

use std::collections::BTreeSet;

use ade_model::{CellValue, RowKind};

use crate::callable::RowDetector;
use crate::context::RowContext;
use crate::error::ExtensionError;
use crate::score::RowPatch;
use crate::text::normalize_header;

#[derive(Debug, Default, Clone, Copy)]
struct RowStats {
    total: usize,
    non_empty: usize,
    numeric: usize,
    alpha: usize,
}

impl RowStats {
    fn of(row: &[CellValue]) -> Self {
        let first = row.iter().position(|cell| !cell.is_empty());
        let last = row.iter().rposition(|cell| !cell.is_empty());
        let (Some(first), Some(last)) = (first, last) else {
            return Self::default();
        };
        let mut stats = Self {
            total: last - first + 1,
            ..Self::default()
        };
        for cell in &row[first..=last] {
            if cell.is_empty() {
                continue;
            }
            stats.non_empty += 1;
            match cell {
                CellValue::Number(_) => stats.numeric += 1,
                CellValue::Text(text) => {
                    if cell.as_number().is_some() {
                        stats.numeric += 1;
                    } else if text.chars().any(char::is_alphabetic) {
                        stats.alpha += 1;
                    }
                }
                CellValue::Bool(_) | CellValue::Empty => {}
            }
        }
        stats
    }

    fn ratio(count: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }

    fn non_empty_ratio(self) -> f64 {
        Self::ratio(self.non_empty, self.total)
    }

    fn numeric_ratio(self) -> f64 {
        Self::ratio(self.numeric, self.total)
    }

    fn alpha_ratio(self) -> f64 {
        Self::ratio(self.alpha, self.total)
    }

    fn is_header_like(self) -> bool {
        self.non_empty_ratio() >= 0.8 && self.alpha_ratio() >= 0.5 && self.numeric_ratio() <= 0.1
    }
}

/// Votes header for mostly-filled, alphabetic, non-numeric rows.
///
/// Cells matching a known field name, label or synonym boost the vote, and
/// the first sheet row gets a small bonus.
#[derive(Debug, Clone)]
pub struct HeaderText {
    vocabulary: BTreeSet<String>,
    weight: f64,
}

const HEADER_BASE: f64 = 0.4;
const FIRST_ROW_BONUS: f64 = 0.2;

impl HeaderText {
    pub fn new<I, S>(vocabulary: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vocabulary: vocabulary
                .into_iter()
                .map(|term| normalize_header(term.as_ref()))
                .filter(|term| !term.is_empty())
                .collect(),
            weight,
        }
    }

    fn known_ratio(&self, row: &[CellValue]) -> f64 {
        let cells: Vec<String> = row
            .iter()
            .filter(|cell| !cell.is_empty())
            .map(|cell| normalize_header(&cell.to_string()))
            .collect();
        if cells.is_empty() {
            return 0.0;
        }
        let known = cells
            .iter()
            .filter(|cell| self.vocabulary.contains(cell.as_str()))
            .count();
        known as f64 / cells.len() as f64
    }
}

impl RowDetector for HeaderText {
    fn detect(&self, ctx: &RowContext<'_>) -> Result<RowPatch, ExtensionError> {
        let stats = RowStats::of(ctx.row_values);
        if !stats.is_header_like() {
            return Ok(RowPatch::empty());
        }
        let known = self.known_ratio(ctx.row_values);
        if stats.non_empty < 2 && known == 0.0 {
            return Ok(RowPatch::empty());
        }
        let mut score = HEADER_BASE + known;
        if ctx.row_index == 0 {
            score += FIRST_ROW_BONUS;
        }
        Ok(RowPatch::empty().vote(RowKind::Header, score * self.weight))
    }
}

/// Votes data in proportion to how filled and how numeric a row is.
#[derive(Debug, Clone, Copy)]
pub struct DataDensity {
    weight: f64,
}

impl DataDensity {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl RowDetector for DataDensity {
    fn detect(&self, ctx: &RowContext<'_>) -> Result<RowPatch, ExtensionError> {
        let stats = RowStats::of(ctx.row_values);
        if stats.non_empty == 0 {
            return Ok(RowPatch::empty());
        }
        let score = 0.5 * stats.non_empty_ratio() + 0.5 * stats.numeric_ratio();
        Ok(RowPatch::empty().vote(RowKind::Data, score * self.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ade_model::text_row;

    fn ctx(row_index: usize, row: &[CellValue]) -> RowContext<'_> {
        RowContext {
            row_index,
            row_values: row,
            sheet_name: None,
            state: None,
        }
    }

    fn vote(patch: &RowPatch, kind: RowKind) -> f64 {
        patch.totals().get(&kind).copied().unwrap_or(0.0)
    }

    #[test]
    fn known_headers_outvote_density() {
        let header = HeaderText::new(["email", "name"], 1.0);
        let density = DataDensity::new(1.0);
        let row = text_row(&["Email", "Name", "Notes"]);
        let header_score = vote(&header.detect(&ctx(0, &row)).expect("detect"), RowKind::Header);
        let data_score = vote(&density.detect(&ctx(0, &row)).expect("detect"), RowKind::Data);
        assert!(header_score > data_score);
    }

    #[test]
    fn text_data_rows_below_header_vote_data() {
        let header = HeaderText::new(["email", "name"], 1.0);
        let density = DataDensity::new(1.0);
        let row = text_row(&["bademail", "Bob", "note-2"]);
        let header_score = vote(&header.detect(&ctx(2, &row)).expect("detect"), RowKind::Header);
        let data_score = vote(&density.detect(&ctx(2, &row)).expect("detect"), RowKind::Data);
        assert!(data_score > header_score);
    }

    #[test]
    fn numeric_rows_are_not_header_like() {
        let header = HeaderText::new(["age"], 1.0);
        let row = vec![CellValue::text("Bob"), CellValue::Number(41.0)];
        assert!(header.detect(&ctx(0, &row)).expect("detect").is_empty());
    }

    #[test]
    fn blank_rows_get_no_votes() {
        let row = text_row(&["", "  ", ""]);
        assert!(DataDensity::new(1.0).detect(&ctx(3, &row)).expect("detect").is_empty());
        assert!(HeaderText::new(["a"], 1.0).detect(&ctx(3, &row)).expect("detect").is_empty());
    }
}
