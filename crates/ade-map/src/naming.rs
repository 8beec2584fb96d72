//! Output headers for unmapped columns.

use std::collections::BTreeSet;

/// Collapses whitespace and drops control characters.
pub fn sanitize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.chars().filter(|ch| !ch.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out unique output header names for one table.
///
/// Names are compared case-insensitively. Canonical field names are reserved
/// up front, so an unmapped column can never shadow a field.
#[derive(Debug, Default)]
pub struct HeaderNamer {
    prefix: String,
    taken: BTreeSet<String>,
    seen_headers: BTreeSet<String>,
}

impl HeaderNamer {
    pub fn new<I, S>(prefix: &str, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefix: prefix.to_string(),
            taken: reserved
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
            seen_headers: BTreeSet::new(),
        }
    }

    /// Records a source header, returning false if an earlier column already used it.
    pub fn observe(&mut self, header: &str) -> bool {
        let key = sanitize_header(header).to_lowercase();
        key.is_empty() || self.seen_headers.insert(key)
    }

    /// Name for an unmapped column; `first_use` comes from [`Self::observe`].
    pub fn name(&mut self, header: &str, column: usize, first_use: bool) -> String {
        let clean = sanitize_header(header);
        let base = if clean.is_empty() || !first_use {
            format!("col_{column}")
        } else {
            format!("{}{clean}", self.prefix)
        };
        self.claim(base)
    }

    fn claim(&mut self, base: String) -> String {
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{base}_{suffix}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_whitespace_and_controls() {
        assert_eq!(sanitize_header("  Home \t Phone\u{7}  "), "Home Phone");
        assert_eq!(sanitize_header(" \n "), "");
    }

    #[test]
    fn blank_and_repeated_headers_fall_back_to_position() {
        let mut namer = HeaderNamer::new("raw_", ["email"]);
        let first = namer.observe("Notes");
        assert_eq!(namer.name("Notes", 3, first), "raw_Notes");
        let again = namer.observe("notes");
        assert!(!again);
        assert_eq!(namer.name("notes", 4, again), "col_4");
        let blank = namer.observe("  ");
        assert_eq!(namer.name("  ", 5, blank), "col_5");
    }

    #[test]
    fn collisions_get_numeric_suffixes() {
        let mut namer = HeaderNamer::new("", ["email", "col_2"]);
        assert_eq!(namer.name("Email", 1, true), "Email_2");
        assert_eq!(namer.name("", 2, true), "col_2_2");
        assert_eq!(namer.name("EMAIL_2", 3, true), "EMAIL_2_2");
    }
}
