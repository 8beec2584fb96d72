//! Rendering, XLSX output and artifact persistence.

use std::fs;

use ade_model::{
    ArtifactBuilder, CellValue, ColumnMap, ConfigReport, NormalizedTable, OutputWorkbook,
    RunStatus, TableRegion, text_row,
};
use ade_report::{read_artifact, render, write_artifact, write_workbook};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::Utc;

fn table(
    source_file: &str,
    source_sheet: Option<&str>,
    sheet_index: usize,
    table_index: usize,
    rows: &[&[&str]],
    unmapped: &[(&str, &[&str])],
) -> NormalizedTable {
    let region = TableRegion::new(1, 1, rows.len() + 1, 2).expect("region");
    NormalizedTable {
        source_file: source_file.to_string(),
        source_sheet: source_sheet.map(str::to_string),
        sheet_index,
        table_index,
        region,
        header: text_row(&["Email", "Name"]),
        column_map: ColumnMap::new(region),
        fields: vec!["email".to_string(), "name".to_string()],
        rows: rows.iter().map(|row| text_row(row)).collect(),
        unmapped_headers: unmapped.iter().map(|(name, _)| (*name).to_string()).collect(),
        unmapped_rows: (0..rows.len())
            .map(|row| {
                unmapped
                    .iter()
                    .map(|(_, values)| CellValue::from(values[row]))
                    .collect()
            })
            .collect(),
        issues: Vec::new(),
    }
}

fn grid(output: &OutputWorkbook, sheet: &str) -> String {
    let Some(sheet) = output.sheet(sheet) else {
        return format!("missing sheet {sheet}");
    };
    sheet
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.cells.iter().map(ToString::to_string).collect();
            let marker = if row.header { "*" } else { "" };
            format!("{marker}{}", cells.join("|"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn sample_tables() -> Vec<NormalizedTable> {
    vec![
        table(
            "people.xlsx",
            Some("People"),
            0,
            1,
            &[&["b@x.io", "Bob"], &["c@x.io", ""]],
            &[],
        ),
        table("people.xlsx", Some("people"), 1, 0, &[&["d@x.io", "Dee"]], &[]),
        table(
            "people.xlsx",
            Some("People"),
            0,
            0,
            &[&["a@x.io", "Ann"]],
            &[("raw_Notes", &["n1"])],
        ),
        table("contacts.csv", None, 0, 0, &[&["e@x.io", "Eve"]], &[]),
    ]
}

#[test]
fn groups_tables_into_sheets_in_stable_order() {
    let output = render(&sample_tables());
    let names: Vec<_> = output.sheets.iter().map(|sheet| sheet.name.as_str()).collect();
    assert_eq!(names, vec!["contacts", "People", "people (2)"]);

    insta::assert_snapshot!(grid(&output, "People"), @r"
    *email|name|raw_Notes
    a@x.io|Ann|n1

    *email|name
    b@x.io|Bob
    c@x.io|
    ");
}

#[test]
fn placements_record_the_written_ranges() {
    let output = render(&sample_tables());
    let people: Vec<_> = output
        .placements
        .iter()
        .filter(|placement| placement.sheet == "People")
        .map(|p| (p.table_index, p.first_row, p.last_row, p.first_col, p.last_col))
        .collect();
    assert_eq!(people, vec![(0, 1, 2, 1, 3), (1, 4, 6, 1, 2)]);
    assert_eq!(output.placements.len(), 4);
}

#[test]
fn every_data_row_has_the_header_width() {
    let output = render(&sample_tables());
    for sheet in &output.sheets {
        let mut width = 0;
        for row in &sheet.rows {
            if row.header {
                width = row.cells.len();
            } else if !row.cells.is_empty() {
                assert_eq!(row.cells.len(), width, "sheet {}", sheet.name);
            }
        }
    }
}

#[test]
fn writes_xlsx_that_reads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("people.normalized.xlsx");
    let mut tables = sample_tables();
    tables[3].rows[0][1] = CellValue::Number(42.0);
    let output = render(&tables);
    write_workbook(&output, &path).expect("write");

    let mut workbook = open_workbook_auto(&path).expect("open");
    assert_eq!(workbook.sheet_names(), vec!["contacts", "People", "people (2)"]);
    let range = workbook.worksheet_range("contacts").expect("range");
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("email".to_string())));
    assert_eq!(range.get_value((1, 1)), Some(&Data::Float(42.0)));
}

#[test]
fn artifact_round_trips_and_rejects_unknown_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("logs").join("artifact.json");
    let config = ConfigReport {
        schema: "ade.config/v1".to_string(),
        version: "1.0.0".to_string(),
        name: Some("contacts".to_string()),
    };
    let artifact = ArtifactBuilder::new("run-1", "0.1.0", Utc::now(), config)
        .seal(RunStatus::Succeeded, None);
    write_artifact(&artifact, &path).expect("write");
    assert_eq!(read_artifact(&path).expect("read"), artifact);

    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("raw")).expect("json");
    value["run"]["surprise"] = serde_json::json!(true);
    fs::write(&path, value.to_string()).expect("rewrite");
    let err = read_artifact(&path).expect_err("closed schema");
    assert_eq!(err.code(), "input_error");
}
