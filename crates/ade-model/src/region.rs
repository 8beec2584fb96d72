use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Classification outcome for one sheet row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Header,
    Data,
    Unknown,
}

impl RowKind {
    /// Kinds a detector may vote for, in tie-break order.
    pub const VOTABLE: [Self; 2] = [Self::Header, Self::Data];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Data => "data",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "header" => Some(Self::Header),
            "data" => Some(Self::Data),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds of one detected table, 1-based and inclusive.
///
/// A table whose header has no data rows below it has `last_row == header_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRegion", into = "RawRegion")]
pub struct TableRegion {
    header_row: usize,
    first_col: usize,
    last_row: usize,
    last_col: usize,
}

#[derive(Serialize, Deserialize)]
struct RawRegion {
    header_row: usize,
    first_col: usize,
    last_row: usize,
    last_col: usize,
}

impl TryFrom<RawRegion> for TableRegion {
    type Error = ModelError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        Self::new(raw.header_row, raw.first_col, raw.last_row, raw.last_col)
    }
}

impl From<TableRegion> for RawRegion {
    fn from(region: TableRegion) -> Self {
        Self {
            header_row: region.header_row,
            first_col: region.first_col,
            last_row: region.last_row,
            last_col: region.last_col,
        }
    }
}

impl TableRegion {
    pub fn new(
        header_row: usize,
        first_col: usize,
        last_row: usize,
        last_col: usize,
    ) -> Result<Self, ModelError> {
        if header_row == 0 || first_col == 0 || last_row < header_row || last_col < first_col {
            return Err(ModelError::InvalidRegion {
                header_row,
                first_col,
                last_row,
                last_col,
            });
        }
        Ok(Self {
            header_row,
            first_col,
            last_row,
            last_col,
        })
    }

    pub fn header_row(&self) -> usize {
        self.header_row
    }

    pub fn first_col(&self) -> usize {
        self.first_col
    }

    pub fn last_row(&self) -> usize {
        self.last_row
    }

    pub fn last_col(&self) -> usize {
        self.last_col
    }

    pub fn data_row_count(&self) -> usize {
        self.last_row - self.header_row
    }

    pub fn width(&self) -> usize {
        self.last_col - self.first_col + 1
    }

    /// 1-based sheet columns covered by the region.
    pub fn columns(&self) -> std::ops::RangeInclusive<usize> {
        self.first_col..=self.last_col
    }
}

impl fmt::Display for TableRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{}C{}:R{}C{}",
            self.header_row, self.first_col, self.last_row, self.last_col
        )
    }
}
