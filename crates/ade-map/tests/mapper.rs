//! Column mapping decisions over small extracted tables.

use ade_map::map_table;
use ade_model::{
    CellValue, ConflictPolicy, EngineError, EngineSettings, ExtractedTable, FieldDef,
    SourceSheet, TableRegion, UnmappedReason, text_row,
};
use ade_registry::builtins::columns::{DEFAULT_FUZZY_FLOOR, HeaderSynonyms};
use ade_registry::{
    ColumnContext, ColumnPatch, ExtensionError, ExtensionPackage, Params, Registration, Registry,
    RegistryBuilder, RunState,
};
use proptest::prelude::*;

struct FnPackage(fn(&mut RegistryBuilder) -> Result<(), EngineError>);

impl ExtensionPackage for FnPackage {
    fn name(&self) -> &str {
        "map-test"
    }

    fn version(&self) -> &str {
        "0.0.1"
    }

    fn register(&self, registry: &mut RegistryBuilder) -> Result<(), EngineError> {
        (self.0)(registry)
    }
}

fn registry(register: fn(&mut RegistryBuilder) -> Result<(), EngineError>) -> Registry {
    Registry::build(&FnPackage(register)).expect("registry")
}

fn with_settings(registry: Registry, change: impl FnOnce(&mut EngineSettings)) -> Registry {
    let mut settings = registry.settings().clone();
    change(&mut settings);
    registry.with_settings(settings)
}

fn contacts(builder: &mut RegistryBuilder) -> Result<(), EngineError> {
    let fields = vec![
        FieldDef::new("email").with_synonyms(["e-mail"]),
        FieldDef::new("name"),
    ];
    for field in &fields {
        builder.register_field(field.clone())?;
    }
    builder.register_column_detector(
        None,
        Registration::new("header_synonyms", Params::of(["header"])).with_priority(100),
        HeaderSynonyms::new(&fields, 1.0, DEFAULT_FUZZY_FLOOR),
    )
}

/// Votes email for headers containing "mail"; a trailing `-N` sets the score to N/10.
fn mailish(ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
    let Some(header) = ctx.header else {
        return Ok(ColumnPatch::empty());
    };
    if !header.to_lowercase().contains("mail") {
        return Ok(ColumnPatch::empty());
    }
    let score = header
        .rsplit_once('-')
        .and_then(|(_, tail)| tail.parse::<f64>().ok())
        .map_or(0.9, |tenths| tenths / 10.0);
    Ok(ColumnPatch::field("email", score))
}

fn mail_fields(builder: &mut RegistryBuilder) -> Result<(), EngineError> {
    builder.register_field(FieldDef::new("email"))?;
    builder.register_field(FieldDef::new("name"))?;
    builder.register_column_detector(None, Registration::new("mailish", Params::of(["header"])), mailish)
}

fn sample_counter(ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
    let sample = ctx.column_values_sample.unwrap_or_default();
    Ok(ColumnPatch::field("count", sample.len() as f64))
}

fn small_bonus(ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
    match ctx.header {
        Some(header) if header.eq_ignore_ascii_case("email") => {
            Ok(ColumnPatch::field("email", 0.25))
        }
        _ => Ok(ColumnPatch::empty()),
    }
}

fn infinite(_ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
    Ok(ColumnPatch::field("email", f64::INFINITY))
}

fn stray(_ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
    Ok(ColumnPatch::field("phone", 1.0))
}

fn table(rows: &[&[&str]]) -> ExtractedTable {
    let sheet = SourceSheet::new(None, rows.iter().map(|row| text_row(row)).collect());
    let width = rows.iter().map(|row| row.len()).max().unwrap_or(1).max(1);
    let region = TableRegion::new(1, 1, rows.len().max(1), width).expect("region");
    ExtractedTable::from_region("people.csv", &sheet, 0, 0, region)
}

#[test]
fn maps_by_header_and_names_unmapped_columns() {
    let registry = registry(contacts);
    let table = table(&[
        &["Email", "Name", "Notes"],
        &["USER@Example.com", "Alice", "note-1"],
        &["bademail", "Bob", "note-2"],
    ]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");

    let mapped: Vec<(&str, usize)> = map
        .mapped
        .iter()
        .map(|column| (column.field.as_str(), column.source_column_index))
        .collect();
    assert_eq!(mapped, vec![("email", 1), ("name", 2)]);
    assert_eq!(map.mapped[0].score, 1.0);
    assert_eq!(map.mapped[0].contributions[0].detector, "header_synonyms");

    assert_eq!(map.unmapped.len(), 1);
    assert_eq!(map.unmapped[0].header_text, "Notes");
    assert_eq!(map.unmapped[0].output_header.as_deref(), Some("raw_Notes"));
    assert_eq!(map.unmapped[0].reason, UnmappedReason::NoScore);
}

#[test]
fn synonyms_match_after_normalization() {
    let registry = registry(contacts);
    let table = table(&[&["E-Mail", "NAME "], &["a@x.io", "Ann"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert!(map.is_mapped("email"));
    assert!(map.is_mapped("name"));
}

#[test]
fn ties_resolve_leftmost_by_default() {
    let registry = registry(mail_fields);
    let table = table(&[&["id", "Mail A", "Mail B"], &["1", "a@x.io", "b@x.io"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert_eq!(map.mapped_for("email").map(|c| c.source_column_index), Some(2));
    let lost: Vec<_> = map
        .unmapped
        .iter()
        .filter(|column| column.reason == UnmappedReason::ConflictLost)
        .map(|column| column.source_column_index)
        .collect();
    assert_eq!(lost, vec![3]);
}

#[test]
fn ties_map_nothing_under_leave_unmapped() {
    let registry = with_settings(registry(mail_fields), |settings| {
        settings.conflict_policy = ConflictPolicy::LeaveUnmapped;
    });
    let table = table(&[&["Mail A", "Mail B"], &["a@x.io", "b@x.io"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert!(map.mapped.is_empty());
    assert!(
        map.unmapped
            .iter()
            .all(|column| column.reason == UnmappedReason::ConflictUnresolved)
    );
    let headers: Vec<_> = map.appended().filter_map(|c| c.output_header.as_deref()).collect();
    assert_eq!(headers, vec!["raw_Mail A", "raw_Mail B"]);
}

#[test]
fn best_score_policy_prefers_the_higher_score() {
    let registry = with_settings(registry(mail_fields), |settings| {
        settings.conflict_policy = ConflictPolicy::BestScore;
    });
    let table = table(&[&["mail-6", "mail-9", "mail-9"], &["a", "b", "c"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert_eq!(map.mapped_for("email").map(|c| c.source_column_index), Some(2));
}

#[test]
fn scores_below_threshold_stay_unmapped() {
    let registry = registry(mail_fields);
    let table = table(&[&["mail-3"], &["a@x.io"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert!(map.mapped.is_empty());
    assert_eq!(map.unmapped[0].reason, UnmappedReason::BelowThreshold);
    let (field, score) = map.unmapped[0].best_candidate.clone().expect("candidate");
    assert_eq!(field, "email");
    assert!((score - 0.3).abs() < 1e-9);
}

#[test]
fn appending_can_be_disabled() {
    let registry = with_settings(registry(contacts), |settings| {
        settings.append_unmapped = false;
    });
    let table = table(&[&["Email", "Notes"], &["a@x.io", "n"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    assert_eq!(map.unmapped.len(), 1);
    assert!(map.unmapped[0].output_header.is_none());
    assert_eq!(map.appended().count(), 0);
}

#[test]
fn blank_and_repeated_headers_use_positions() {
    let registry = registry(contacts);
    let table = table(&[&["Email", "", "Notes", "notes"], &["a@x.io", "x", "y", "z"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    let headers: Vec<_> = map.appended().filter_map(|c| c.output_header.as_deref()).collect();
    assert_eq!(headers, vec!["col_2", "raw_Notes", "col_4"]);
}

#[test]
fn contributions_are_ordered_by_priority() {
    let registry = registry(|builder| {
        let fields = vec![FieldDef::new("email")];
        builder.register_field(fields[0].clone())?;
        builder.register_column_detector(
            None,
            Registration::new("bonus", Params::of(["header"])).with_priority(1),
            small_bonus,
        )?;
        builder.register_column_detector(
            None,
            Registration::new("header_synonyms", Params::of(["header"])).with_priority(100),
            HeaderSynonyms::new(&fields, 1.0, DEFAULT_FUZZY_FLOOR),
        )
    });
    let table = table(&[&["Email"], &["a@x.io"]]);
    let map = map_table(&table, &registry, &RunState::new()).expect("map");
    let column = map.mapped_for("email").expect("mapped");
    assert_eq!(column.score, 1.25);
    let detectors: Vec<_> = column.contributions.iter().map(|c| c.detector.as_str()).collect();
    assert_eq!(detectors, vec!["header_synonyms", "bonus"]);
}

#[test]
fn values_pass_receives_a_bounded_sample() {
    let registry = registry(|builder| {
        builder.register_field(FieldDef::new("count"))?;
        builder.register_column_detector(
            None,
            Registration::new("counter", Params::of(["column_values_sample"])),
            sample_counter,
        )
    });
    let registry = with_settings(registry, |settings| settings.sample_size = 3);
    let mut rows: Vec<&[&str]> = vec![&["values"]];
    rows.extend(std::iter::repeat_n(&["v"][..], 10));
    let map = map_table(&table(&rows), &registry, &RunState::new()).expect("map");
    assert_eq!(map.mapped_for("count").map(|c| c.score), Some(3.0));
}

#[test]
fn malformed_patches_are_pipeline_errors() {
    let infinite = registry(|builder| {
        builder.register_field(FieldDef::new("email"))?;
        builder.register_column_detector(None, Registration::new("inf", Params::catch_all_only()), infinite)
    });
    let err = map_table(&table(&[&["x"]]), &infinite, &RunState::new()).expect_err("inf");
    assert_eq!(err.code(), "pipeline_error");
    assert_eq!(err.stage().as_deref(), Some("column_mapping"));
    assert_eq!(err.extension(), Some("inf"));

    let stray = registry(|builder| {
        builder.register_field(FieldDef::new("email"))?;
        builder.register_column_detector(None, Registration::new("stray", Params::catch_all_only()), stray)
    });
    let err = map_table(&table(&[&["x"]]), &stray, &RunState::new()).expect_err("unknown");
    assert!(err.to_string().contains("unknown field 'phone'"));
}

fn header_strategy() -> impl Strategy<Value = Vec<String>> {
    let header = prop_oneof![
        Just("Email".to_string()),
        Just("E-mail".to_string()),
        Just("Name".to_string()),
        Just("Notes".to_string()),
        Just(String::new()),
        "[A-Za-z ]{1,8}",
    ];
    prop::collection::vec(header, 1..8)
}

proptest! {
    #[test]
    fn mapping_is_deterministic(headers in header_strategy()) {
        let registry = registry(contacts);
        let sheet = SourceSheet::new(
            None,
            vec![
                headers.iter().map(|h| CellValue::from(h.as_str())).collect(),
                vec![CellValue::text("v"); headers.len()],
            ],
        );
        let region = TableRegion::new(1, 1, 2, headers.len()).expect("region");
        let table = ExtractedTable::from_region("p.csv", &sheet, 0, 0, region);

        let triples = |registry: &Registry| {
            map_table(&table, registry, &RunState::new())
                .expect("map")
                .mapped
                .into_iter()
                .map(|c| (c.field, c.source_column_index, c.score.to_bits()))
                .collect::<Vec<_>>()
        };
        let first = triples(&registry);
        prop_assert_eq!(&first, &triples(&registry));

        let fields: Vec<&str> = first.iter().map(|(field, _, _)| field.as_str()).collect();
        let mut unique = fields.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), fields.len());
    }
}
