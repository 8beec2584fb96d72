//! Input side of the ADE engine: workbook readers and table detection.

pub mod classify;
pub mod reader;

use ade_model::{ExtractedTable, SourceSheet};

pub use classify::{SheetLayout, classify_row, classify_sheet, derive_regions};
pub use reader::{InputFormat, read_workbook, select_sheets};

/// Cuts the detected regions of a sheet into extracted tables.
pub fn extract_tables(
    source_file: &str,
    sheet: &SourceSheet,
    sheet_index: usize,
    layout: &SheetLayout,
) -> Vec<ExtractedTable> {
    layout
        .regions
        .iter()
        .enumerate()
        .map(|(table_index, region)| {
            ExtractedTable::from_region(source_file, sheet, sheet_index, table_index, *region)
        })
        .collect()
}
