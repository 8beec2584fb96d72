//! Canonical field definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// Declared data type of a canonical field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Date,
}

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d.%m.%Y"];

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }

    /// Returns true if a non-empty value conforms to this type.
    ///
    /// Empty cells always conform; presence is the `required` check's concern.
    pub fn accepts(&self, value: &CellValue) -> bool {
        if value.is_empty() {
            return true;
        }
        match self {
            Self::String => true,
            Self::Number => value.as_number().is_some(),
            Self::Integer => value.as_number().is_some_and(|n| n.fract() == 0.0),
            Self::Boolean => match value {
                CellValue::Bool(_) => true,
                other => is_boolean_token(&other.to_trimmed_string()),
            },
            Self::Date => match value {
                CellValue::Text(text) => parse_date(text).is_some(),
                CellValue::Number(serial) => *serial > 0.0 && serial.fract() == 0.0,
                _ => false,
            },
        }
    }
}

fn is_boolean_token(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "y" | "n" | "1" | "0"
    )
}

/// Parses the common calendar date layouts seen in spreadsheets.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// A canonical output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Unique key; also the output header.
    pub name: String,
    pub label: Option<String>,
    pub required: bool,
    pub data_type: DataType,
    /// Alternative header spellings used during header matching.
    pub synonyms: Vec<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: false,
            data_type: DataType::default(),
            synonyms: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms.into_iter().map(Into::into).collect();
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Name, label and synonyms, in that order.
    pub fn header_candidates(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(self.name.as_str())
            .chain(self.label.as_deref())
            .chain(self.synonyms.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_rejects_fractions() {
        assert!(DataType::Integer.accepts(&CellValue::text("12")));
        assert!(!DataType::Integer.accepts(&CellValue::text("12.5")));
        assert!(DataType::Integer.accepts(&CellValue::Empty));
    }

    #[test]
    fn date_accepts_common_layouts() {
        assert!(DataType::Date.accepts(&CellValue::text("2024-01-15")));
        assert!(DataType::Date.accepts(&CellValue::text("15/01/2024")));
        assert!(!DataType::Date.accepts(&CellValue::text("yesterday")));
    }

    #[test]
    fn header_candidates_include_label_and_synonyms() {
        let field = FieldDef::new("email")
            .with_label("E-mail address")
            .with_synonyms(["mail"]);
        let candidates: Vec<&str> = field.header_candidates().collect();
        assert_eq!(candidates, vec!["email", "E-mail address", "mail"]);
    }
}
