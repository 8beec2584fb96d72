//! Reads CSV and spreadsheet files into an in-memory [`SourceWorkbook`].

use std::path::Path;

use ade_model::{CellValue, EngineError, SourceSheet, SourceWorkbook};
use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;
use tracing::{debug, warn};

/// Input format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    Spreadsheet,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

pub fn read_workbook(path: &Path) -> Result<SourceWorkbook, EngineError> {
    if !path.is_file() {
        return Err(EngineError::input_path(
            path,
            format!("input file not found: {}", path.display()),
        ));
    }
    let format = InputFormat::from_path(path).ok_or_else(|| {
        EngineError::input_path(
            path,
            format!("unsupported input file type: {}", path.display()),
        )
    })?;
    let source_file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sheets = match format {
        InputFormat::Csv => vec![read_delimited(path, b',')?],
        InputFormat::Tsv => vec![read_delimited(path, b'\t')?],
        InputFormat::Spreadsheet => read_spreadsheet(path)?,
    };
    debug!(
        file = %source_file,
        sheets = sheets.len(),
        rows = sheets.iter().map(SourceSheet::row_count).sum::<usize>(),
        "read workbook"
    );
    Ok(SourceWorkbook::new(source_file, sheets))
}

fn normalize_cell(raw: &str) -> CellValue {
    CellValue::from(raw.trim_matches('\u{feff}'))
}

/// Reads a delimited file as a single unnamed sheet. Rows keep their own
/// widths; blank rows are kept so sheet coordinates match the file.
fn read_delimited(path: &Path, delimiter: u8) -> Result<SourceSheet, EngineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|error| {
            EngineError::input_path(path, format!("read csv {}: {error}", path.display()))
        })?;
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|error| {
            EngineError::input_path(
                path,
                format!("read record {} of {}: {error}", index + 1, path.display()),
            )
        })?;
        rows.push(record.iter().map(normalize_cell).collect());
    }
    Ok(SourceSheet::new(None, rows))
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::from(text.as_str()),
        Data::Float(number) => CellValue::Number(*number),
        Data::Int(number) => CellValue::Number(*number as f64),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::Error(error) => CellValue::Text(format!("#{error:?}")),
        Data::DateTime(datetime) => CellValue::Number(datetime.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::from(text.as_str()),
    }
}

/// Reads every worksheet. Rows are placed at their absolute sheet position,
/// so a range starting at C3 keeps two leading blank rows and columns.
fn read_spreadsheet(path: &Path) -> Result<Vec<SourceSheet>, EngineError> {
    let mut workbook = open_workbook_auto(path).map_err(|error| {
        EngineError::input_path(path, format!("open workbook {}: {error}", path.display()))
    })?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(error) => {
                warn!(sheet = %name, %error, "skipping unreadable sheet");
                continue;
            }
        };
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![CellValue::Empty; start_col as usize];
            cells.extend(row.iter().map(convert));
            while cells.last().is_some_and(CellValue::is_empty) {
                cells.pop();
            }
            rows.push(cells);
        }
        sheets.push(SourceSheet::new(Some(name), rows));
    }
    Ok(sheets)
}

/// Restricts a workbook to the requested sheets, in request order. Each sheet
/// keeps its workbook position, so the output layout ignores request order.
///
/// Delimited input has a single unnamed sheet and ignores the selection.
pub fn select_sheets(
    workbook: SourceWorkbook,
    requested: Option<&[String]>,
) -> Result<SourceWorkbook, EngineError> {
    let Some(requested) = requested.filter(|names| !names.is_empty()) else {
        return Ok(workbook);
    };
    if workbook.sheets.iter().all(|sheet| sheet.name.is_none()) {
        warn!(
            file = %workbook.source_file,
            "sheet selection ignored for delimited input"
        );
        return Ok(workbook);
    }
    let SourceWorkbook {
        source_file,
        mut sheets,
    } = workbook;
    let mut selected = Vec::with_capacity(requested.len());
    for name in requested {
        let found = sheets
            .iter()
            .position(|sheet| sheet.name.as_deref() == Some(name.as_str()))
            .ok_or_else(|| {
                EngineError::input(format!("sheet '{name}' not found in {source_file}"))
            })?;
        selected.push(sheets.remove(found));
    }
    Ok(SourceWorkbook {
        source_file,
        sheets: selected,
    })
}
