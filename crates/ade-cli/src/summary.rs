use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use ade_model::{Artifact, RunStatus, Severity, TableReport};
use ade_registry::Registry;

use crate::commands::{RunOutcome, callable_rows};

pub fn print_run_summary(outcome: &RunOutcome) {
    let result = &outcome.result;
    if let Some(file) = &result.processed_file {
        println!("Input: {file}");
    }
    println!("Status: {}", result.status.as_str());
    if let Some(path) = &result.output_path {
        println!("Output: {}", path.display());
    }
    if let Some(path) = &result.artifact_path {
        println!("Artifact: {}", path.display());
    }
    if let Some(artifact) = &outcome.artifact
        && !artifact.tables.is_empty()
    {
        println!("{}", tables_table(artifact));
    }
    if let Some(error) = &result.error {
        match &error.stage {
            Some(stage) => eprintln!("error[{}] ({stage}): {}", error.code, error.message),
            None => eprintln!("error[{}]: {}", error.code, error.message),
        }
    }
}

/// One row per normalized table.
pub fn tables_table(artifact: &Artifact) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Sheet"),
        header_cell("Table"),
        header_cell("Output"),
        header_cell("Mapped"),
        header_cell("Unmapped"),
        header_cell("Errors"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..table.column_count() {
        if index != 3 {
            align_column(&mut table, index, CellAlignment::Right);
        }
    }
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;
    for report in &artifact.tables {
        let (errors, warnings) = issue_counts(report);
        total_errors += errors;
        total_warnings += warnings;
        table.add_row(vec![
            Cell::new(&report.source_file)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            optional_cell(report.source_sheet.as_deref()),
            Cell::new(report.table_index),
            optional_cell(output_range(artifact, report).as_deref()),
            Cell::new(report.mapped_columns.len()),
            Cell::new(report.unmapped_columns.len()),
            count_cell(errors, Color::Red),
            count_cell(warnings, Color::Yellow),
        ]);
    }
    let status_color = match artifact.run.status {
        RunStatus::Succeeded => Color::Green,
        RunStatus::Failed => Color::Red,
    };
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(artifact.tables.len()).add_attribute(Attribute::Bold),
        Cell::new(artifact.run.status.as_str()).fg(status_color),
        dim_cell("-"),
        dim_cell("-"),
        count_cell(total_errors, Color::Red).add_attribute(Attribute::Bold),
        count_cell(total_warnings, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

pub fn print_catalog(registry: &Registry) {
    let package = registry.package();
    println!("Package: {} {} ({})", package.name, package.version, package.schema);
    let settings = registry.settings();
    println!(
        "Engine: threshold {}, conflict policy {}, append unmapped {}, prefix '{}', sample {}",
        settings.mapping_threshold,
        settings.conflict_policy,
        settings.append_unmapped,
        settings.unmapped_prefix,
        settings.sample_size
    );

    let mut fields = Table::new();
    fields.set_header(vec![
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Type"),
        header_cell("Required"),
        header_cell("Synonyms"),
    ]);
    apply_table_style(&mut fields);
    for field in registry.fields() {
        fields.add_row(vec![
            Cell::new(&field.name).add_attribute(Attribute::Bold),
            optional_cell(field.label.as_deref()),
            Cell::new(field.data_type.as_str()),
            if field.required {
                Cell::new("yes").fg(Color::Yellow)
            } else {
                dim_cell("no")
            },
            optional_cell(Some(field.synonyms.join(", ")).filter(|s| !s.is_empty()).as_deref()),
        ]);
    }
    println!("{fields}");

    let mut callables = Table::new();
    callables.set_header(vec![
        header_cell("Kind"),
        header_cell("Name"),
        header_cell("Field / Stage"),
        header_cell("Priority"),
    ]);
    apply_table_style(&mut callables);
    align_column(&mut callables, 3, CellAlignment::Right);
    for row in callable_rows(registry) {
        callables.add_row(vec![
            Cell::new(row.kind),
            Cell::new(row.name),
            Cell::new(row.scope),
            Cell::new(row.priority),
        ]);
    }
    println!("{callables}");
}

fn issue_counts(report: &TableReport) -> (usize, usize) {
    report
        .validation_issues
        .iter()
        .fold((0, 0), |(errors, warnings), issue| match issue.severity {
            Severity::Error => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
            Severity::Info => (errors, warnings),
        })
}

/// Output sheet and rows a table was written to, e.g. `people!1:3`.
fn output_range(artifact: &Artifact, report: &TableReport) -> Option<String> {
    artifact
        .run
        .outputs
        .iter()
        .flat_map(|output| output.tables.iter())
        .find(|placement| {
            placement.source_file == report.source_file
                && placement.source_sheet == report.source_sheet
                && placement.table_index == report.table_index
        })
        .map(|placement| {
            format!(
                "{}!{}:{}",
                placement.sheet, placement.first_row, placement.last_row
            )
        })
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn optional_cell(value: Option<&str>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}
