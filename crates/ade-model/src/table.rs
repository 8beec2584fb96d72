//! In-memory source workbooks and the tables carved out of them.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::issue::ValidationIssue;
use crate::mapping::ColumnMap;
use crate::region::TableRegion;

/// One sheet of raw cells. CSV input produces a single unnamed sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSheet {
    pub name: Option<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 0-based position in the workbook as read, kept through sheet selection.
    #[serde(default)]
    pub position: usize,
}

impl SourceSheet {
    pub fn new(name: Option<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name,
            rows,
            position: 0,
        }
    }

    /// Cell at 1-based coordinates; missing cells read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        row.checked_sub(1)
            .and_then(|r| self.rows.get(r))
            .and_then(|cells| col.checked_sub(1).and_then(|c| cells.get(c)))
            .unwrap_or(&EMPTY)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<csv>")
    }

    /// Cells of a 1-based row clipped to the region's columns, padded with empties.
    pub fn clip_row(&self, row: usize, region: &TableRegion) -> Vec<CellValue> {
        region
            .columns()
            .map(|col| self.cell(row, col).clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceWorkbook {
    /// File name of the input, without directories.
    pub source_file: String,
    pub sheets: Vec<SourceSheet>,
}

impl SourceWorkbook {
    /// Numbers the sheets by their order in `sheets`.
    pub fn new(source_file: impl Into<String>, mut sheets: Vec<SourceSheet>) -> Self {
        for (position, sheet) in sheets.iter_mut().enumerate() {
            sheet.position = position;
        }
        Self {
            source_file: source_file.into(),
            sheets,
        }
    }
}

/// One detected table with its raw cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub source_file: String,
    pub source_sheet: Option<String>,
    /// Workbook position of the source sheet, independent of selection order.
    pub sheet_index: usize,
    /// 0-based position of the table within its sheet.
    pub table_index: usize,
    pub region: TableRegion,
    pub header: Vec<CellValue>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ExtractedTable {
    pub fn from_region(
        source_file: &str,
        sheet: &SourceSheet,
        sheet_index: usize,
        table_index: usize,
        region: TableRegion,
    ) -> Self {
        let header = sheet.clip_row(region.header_row(), &region);
        let rows = (region.header_row() + 1..=region.last_row())
            .map(|row| sheet.clip_row(row, &region))
            .collect();
        Self {
            source_file: source_file.to_string(),
            source_sheet: sheet.name.clone(),
            sheet_index,
            table_index,
            region,
            header,
            rows,
        }
    }

    /// Header text for a 1-based sheet column, trimmed.
    pub fn header_text(&self, column: usize) -> String {
        column
            .checked_sub(self.region.first_col())
            .and_then(|offset| self.header.get(offset))
            .map(CellValue::to_trimmed_string)
            .unwrap_or_default()
    }

    /// Values of a 1-based sheet column across all data rows.
    pub fn column_values(&self, column: usize) -> Vec<CellValue> {
        let Some(offset) = column.checked_sub(self.region.first_col()) else {
            return vec![CellValue::Empty; self.rows.len()];
        };
        self.rows
            .iter()
            .map(|row| row.get(offset).cloned().unwrap_or_default())
            .collect()
    }

    pub fn label(&self) -> String {
        match &self.source_sheet {
            Some(sheet) => format!("{}[{}]#{}", self.source_file, sheet, self.table_index),
            None => format!("{}#{}", self.source_file, self.table_index),
        }
    }
}

/// Canonical rows of one table, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTable {
    pub source_file: String,
    pub source_sheet: Option<String>,
    pub sheet_index: usize,
    pub table_index: usize,
    pub region: TableRegion,
    pub header: Vec<CellValue>,
    pub column_map: ColumnMap,
    /// Canonical field names in declaration order.
    pub fields: Vec<String>,
    /// One value per canonical field.
    pub rows: Vec<Vec<CellValue>>,
    /// Output headers of retained unmapped columns, in source order.
    pub unmapped_headers: Vec<String>,
    /// One value per retained unmapped column, aligned with `rows`.
    pub unmapped_rows: Vec<Vec<CellValue>>,
    pub issues: Vec<ValidationIssue>,
}

impl NormalizedTable {
    pub fn output_headers(&self) -> Vec<String> {
        self.fields
            .iter()
            .chain(self.unmapped_headers.iter())
            .cloned()
            .collect()
    }

    /// Canonical values followed by retained unmapped values, per row.
    pub fn output_rows(&self) -> Vec<Vec<CellValue>> {
        let width = self.fields.len() + self.unmapped_headers.len();
        self.rows
            .iter()
            .enumerate()
            .map(|(index, canonical)| {
                let mut row = Vec::with_capacity(width);
                row.extend(canonical.iter().cloned());
                if let Some(extra) = self.unmapped_rows.get(index) {
                    row.extend(extra.iter().cloned());
                }
                row.resize(width, CellValue::Empty);
                row
            })
            .collect()
    }

    pub fn label(&self) -> String {
        match &self.source_sheet {
            Some(sheet) => format!("{}[{}]#{}", self.source_file, sheet, self.table_index),
            None => format!("{}#{}", self.source_file, self.table_index),
        }
    }
}
