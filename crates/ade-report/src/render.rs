//! Lays normalized tables out in an output workbook.

use std::collections::BTreeMap;
use std::path::Path;

use ade_model::{NormalizedTable, OutputRow, OutputSheet, OutputWorkbook, TablePlacement};
use tracing::debug;

use crate::sheet_name::SheetNamer;

/// One output sheet per (source file, source sheet), tables stacked with a
/// blank row between them.
///
/// Groups are ordered by source file then sheet position; tables within a
/// group by table index, so the layout does not depend on processing order.
pub fn render(tables: &[NormalizedTable]) -> OutputWorkbook {
    let mut groups: BTreeMap<(&str, usize), Vec<&NormalizedTable>> = BTreeMap::new();
    for table in tables {
        groups
            .entry((table.source_file.as_str(), table.sheet_index))
            .or_default()
            .push(table);
    }

    let mut namer = SheetNamer::new();
    let mut workbook = OutputWorkbook::default();
    for ((source_file, _), mut group) in groups {
        group.sort_by_key(|table| table.table_index);
        let raw_name = group
            .first()
            .and_then(|table| table.source_sheet.clone())
            .unwrap_or_else(|| file_stem(source_file));
        let name = namer.claim(&raw_name);
        let mut rows: Vec<OutputRow> = Vec::new();
        for table in group {
            if !rows.is_empty() {
                rows.push(OutputRow::blank());
            }
            let headers = table.output_headers();
            let width = headers.len();
            let first_row = rows.len() + 1;
            rows.push(OutputRow::header(headers));
            rows.extend(table.output_rows().into_iter().map(OutputRow::data));
            workbook.placements.push(TablePlacement {
                source_file: table.source_file.clone(),
                source_sheet: table.source_sheet.clone(),
                table_index: table.table_index,
                sheet: name.clone(),
                first_row,
                first_col: 1,
                last_row: rows.len(),
                last_col: width.max(1),
            });
        }
        debug!(sheet = %name, rows = rows.len(), "rendered sheet");
        workbook.sheets.push(OutputSheet { name, rows });
    }
    workbook
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}
