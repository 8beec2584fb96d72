//! Built-in column detectors.

use ade_model::{CellValue, DataType, FieldDef};
use rapidfuzz::distance::jaro_winkler;
use regex::Regex;

use crate::callable::ColumnDetector;
use crate::context::ColumnContext;
use crate::error::ExtensionError;
use crate::score::ColumnPatch;
use crate::text::normalize_header;

/// Similarity a fuzzy header match must reach before it votes.
pub const DEFAULT_FUZZY_FLOOR: f64 = 0.88;
/// Fuzzy matches count for less than exact ones.
const FUZZY_DISCOUNT: f64 = 0.8;

#[derive(Debug, Clone)]
struct FieldTerms {
    field: String,
    terms: Vec<String>,
}

/// Matches header text against every field's name, label and synonyms.
///
/// An exact normalized match votes the full weight. Otherwise the best
/// Jaro-Winkler similarity at or above the floor votes a discounted share.
#[derive(Debug, Clone)]
pub struct HeaderSynonyms {
    fields: Vec<FieldTerms>,
    weight: f64,
    fuzzy_floor: f64,
}

impl HeaderSynonyms {
    pub fn new(fields: &[FieldDef], weight: f64, fuzzy_floor: f64) -> Self {
        let fields = fields
            .iter()
            .map(|field| FieldTerms {
                field: field.name.clone(),
                terms: field
                    .header_candidates()
                    .map(normalize_header)
                    .filter(|term| !term.is_empty())
                    .collect(),
            })
            .collect();
        Self {
            fields,
            weight,
            fuzzy_floor,
        }
    }

    fn score(&self, terms: &[String], header: &str) -> f64 {
        if terms.iter().any(|term| term == header) {
            return self.weight;
        }
        let best = terms
            .iter()
            .map(|term| jaro_winkler::similarity(term.chars(), header.chars()))
            .fold(0.0_f64, f64::max);
        if best >= self.fuzzy_floor {
            best * self.weight * FUZZY_DISCOUNT
        } else {
            0.0
        }
    }
}

impl ColumnDetector for HeaderSynonyms {
    fn detect(&self, ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
        let Some(header) = ctx.header else {
            return Ok(ColumnPatch::empty());
        };
        let header = normalize_header(header);
        if header.is_empty() {
            return Ok(ColumnPatch::empty());
        }
        let mut patch = ColumnPatch::empty();
        for field in &self.fields {
            let score = self.score(&field.terms, &header);
            if score > 0.0 {
                patch.push(field.field.clone(), score);
            }
        }
        Ok(patch)
    }
}

fn non_empty(sample: &[CellValue]) -> impl Iterator<Item = &CellValue> {
    sample.iter().filter(|cell| !cell.is_empty())
}

/// Share of non-empty sample values satisfying `predicate`, or `None` when
/// the sample has no values.
fn match_ratio(sample: &[CellValue], predicate: impl Fn(&CellValue) -> bool) -> Option<f64> {
    let (total, matched) = non_empty(sample).fold((0usize, 0usize), |(total, matched), cell| {
        (total + 1, matched + usize::from(predicate(cell)))
    });
    (total > 0).then(|| matched as f64 / total as f64)
}

fn scoped_field<'a>(ctx: &ColumnContext<'a>, detector: &str) -> Result<&'a FieldDef, ExtensionError> {
    ctx.field
        .ok_or_else(|| ExtensionError::new(format!("{detector} must be bound to a field")))
}

/// Votes the bound field by the share of sample values matching a regex.
#[derive(Debug, Clone)]
pub struct ValuePattern {
    pattern: Regex,
    weight: f64,
}

impl ValuePattern {
    pub fn new(pattern: Regex, weight: f64) -> Self {
        Self { pattern, weight }
    }
}

impl ColumnDetector for ValuePattern {
    fn detect(&self, ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
        let field = scoped_field(ctx, "value_pattern")?;
        let Some(sample) = ctx.column_values_sample else {
            return Ok(ColumnPatch::empty());
        };
        let ratio = match_ratio(sample, |cell| {
            self.pattern.is_match(&cell.to_trimmed_string())
        });
        Ok(match ratio {
            Some(ratio) if ratio > 0.0 => ColumnPatch::field(&field.name, ratio * self.weight),
            _ => ColumnPatch::empty(),
        })
    }
}

/// Votes the bound field by the share of sample values conforming to its type.
#[derive(Debug, Clone, Copy)]
pub struct ValueType {
    weight: f64,
}

impl ValueType {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl ColumnDetector for ValueType {
    fn detect(&self, ctx: &ColumnContext<'_>) -> Result<ColumnPatch, ExtensionError> {
        let field = scoped_field(ctx, "value_type")?;
        let Some(sample) = ctx.column_values_sample else {
            return Ok(ColumnPatch::empty());
        };
        let data_type: DataType = field.data_type;
        let ratio = match_ratio(sample, |cell| data_type.accepts(cell));
        Ok(match ratio {
            Some(ratio) if ratio > 0.0 => ColumnPatch::field(&field.name, ratio * self.weight),
            _ => ColumnPatch::empty(),
        })
    }
}
