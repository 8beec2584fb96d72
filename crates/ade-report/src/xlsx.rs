//! XLSX writer for rendered output workbooks.

use std::fs;
use std::path::Path;

use ade_model::{CellValue, EngineError, OutputSheet, OutputWorkbook, PipelineStage};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

fn output_error(path: &Path, error: impl std::fmt::Display) -> EngineError {
    EngineError::unknown(
        PipelineStage::Output,
        format!("write {}: {error}", path.display()),
    )
}

/// Saves the workbook, creating parent directories as needed. Header rows
/// are bold.
pub fn write_workbook(output: &OutputWorkbook, path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| output_error(parent, error))?;
    }
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    for sheet in &output.sheets {
        let worksheet = workbook.add_worksheet();
        write_sheet(worksheet, sheet, &bold).map_err(|error| output_error(path, error))?;
    }
    if output.sheets.is_empty() {
        workbook.add_worksheet();
    }
    workbook.save(path).map_err(|error| output_error(path, error))?;
    debug!(path = %path.display(), sheets = output.sheets.len(), "wrote workbook");
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &OutputSheet, bold: &Format) -> Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;
    if sheet.rows.len() > MAX_ROWS {
        return Err(XlsxError::RowColumnLimitError);
    }
    for (row_index, row) in sheet.rows.iter().enumerate() {
        if row.cells.len() > MAX_COLS {
            return Err(XlsxError::RowColumnLimitError);
        }
        let row_number = row_index as u32;
        for (col_index, cell) in row.cells.iter().enumerate() {
            let col_number = col_index as u16;
            match (cell, row.header) {
                (CellValue::Empty, _) => {}
                (CellValue::Text(text), true) => {
                    worksheet.write_string_with_format(row_number, col_number, text, bold)?;
                }
                (CellValue::Text(text), false) => {
                    worksheet.write_string(row_number, col_number, text)?;
                }
                (CellValue::Number(number), _) => {
                    worksheet.write_number(row_number, col_number, *number)?;
                }
                (CellValue::Bool(flag), _) => {
                    worksheet.write_boolean(row_number, col_number, *flag)?;
                }
            }
        }
    }
    Ok(())
}
