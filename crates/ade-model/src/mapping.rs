//! Column mapping results.

use serde::{Deserialize, Serialize};

use crate::region::TableRegion;

/// Summed score one detector contributed to a mapping decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub detector: String,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedColumn {
    pub field: String,
    /// 1-based sheet column.
    pub source_column_index: usize,
    pub header_text: String,
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

/// Why a column ended up without a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedReason {
    /// No detector scored the column for any field.
    NoScore,
    /// The best field score was under the mapping threshold.
    BelowThreshold,
    /// Another column won the same field under the conflict policy.
    ConflictLost,
    /// The conflict policy left every contender unmapped.
    ConflictUnresolved,
}

impl UnmappedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoScore => "no_score",
            Self::BelowThreshold => "below_threshold",
            Self::ConflictLost => "conflict_lost",
            Self::ConflictUnresolved => "conflict_unresolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedColumn {
    pub header_text: String,
    /// 1-based sheet column.
    pub source_column_index: usize,
    /// Output header when unmapped columns are appended to the output.
    pub output_header: Option<String>,
    pub reason: UnmappedReason,
    /// Best field candidate and its score, if any detector voted.
    pub best_candidate: Option<(String, f64)>,
}

/// Field assignments for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub region: TableRegion,
    /// Ordered by source column.
    pub mapped: Vec<MappedColumn>,
    /// Ordered by source column.
    pub unmapped: Vec<UnmappedColumn>,
}

impl ColumnMap {
    pub fn new(region: TableRegion) -> Self {
        Self {
            region,
            mapped: Vec::new(),
            unmapped: Vec::new(),
        }
    }

    pub fn mapped_for(&self, field: &str) -> Option<&MappedColumn> {
        self.mapped.iter().find(|column| column.field == field)
    }

    pub fn is_mapped(&self, field: &str) -> bool {
        self.mapped_for(field).is_some()
    }

    /// Unmapped columns that carry an output header, in source order.
    pub fn appended(&self) -> impl Iterator<Item = &UnmappedColumn> {
        self.unmapped
            .iter()
            .filter(|column| column.output_header.is_some())
    }
}
