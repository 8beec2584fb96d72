use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// A written row; header rows are styled differently by the writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub cells: Vec<CellValue>,
    pub header: bool,
}

impl OutputRow {
    pub fn header<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: names
                .into_iter()
                .map(|name| CellValue::Text(name.into()))
                .collect(),
            header: true,
        }
    }

    pub fn data(cells: Vec<CellValue>) -> Self {
        Self {
            cells,
            header: false,
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSheet {
    pub name: String,
    pub rows: Vec<OutputRow>,
}

/// Where one normalized table landed in the output workbook (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TablePlacement {
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_sheet: Option<String>,
    pub table_index: usize,
    pub sheet: String,
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputWorkbook {
    pub sheets: Vec<OutputSheet>,
    pub placements: Vec<TablePlacement>,
}

impl OutputWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&OutputSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}
