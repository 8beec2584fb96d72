//! Typed score patches returned by detectors.

use std::collections::BTreeMap;

use ade_model::RowKind;

/// One vote: add `delta` to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDelta<T> {
    pub target: T,
    pub delta: f64,
}

/// Partial score returned by one detector invocation. Empty means no opinion.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorePatch<T> {
    deltas: Vec<ScoreDelta<T>>,
}

impl<T> Default for ScorePatch<T> {
    fn default() -> Self {
        Self { deltas: Vec::new() }
    }
}

pub type RowPatch = ScorePatch<RowKind>;
pub type ColumnPatch = ScorePatch<String>;

impl<T> ScorePatch<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vote(mut self, target: T, delta: f64) -> Self {
        self.deltas.push(ScoreDelta { target, delta });
        self
    }

    pub fn push(&mut self, target: T, delta: f64) {
        self.deltas.push(ScoreDelta { target, delta });
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn deltas(&self) -> &[ScoreDelta<T>] {
        &self.deltas
    }

    /// First delta that is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<&ScoreDelta<T>> {
        self.deltas.iter().find(|delta| !delta.delta.is_finite())
    }
}

impl<T: Ord + Clone> ScorePatch<T> {
    /// Sums deltas per target.
    pub fn totals(&self) -> BTreeMap<T, f64> {
        let mut totals = BTreeMap::new();
        for delta in &self.deltas {
            *totals.entry(delta.target.clone()).or_insert(0.0) += delta.delta;
        }
        totals
    }
}

impl ColumnPatch {
    pub fn field(field: impl Into<String>, delta: f64) -> Self {
        Self::empty().vote(field.into(), delta)
    }
}
