//! XLSX-safe, unique worksheet names.

use std::collections::BTreeSet;

pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Replaces characters Excel rejects, trims apostrophes at either end and
/// truncates to 31 characters. Blank names become `Sheet`.
pub fn sanitize_sheet_name(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|ch| if FORBIDDEN.contains(&ch) || ch.is_control() { '_' } else { ch })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let name: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    if name.is_empty() {
        "Sheet".to_string()
    } else {
        name
    }
}

/// Hands out sheet names that are unique ignoring case.
#[derive(Debug, Default)]
pub struct SheetNamer {
    taken: BTreeSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitized `raw`, or `raw (2)`, `raw (3)`... on collision.
    pub fn claim(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }
        let mut counter = 2;
        loop {
            let suffix = format!(" ({counter})");
            let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
            let stem: String = base.chars().take(keep).collect();
            let candidate = format!("{}{suffix}", stem.trim_end());
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_forbidden_characters_and_truncates() {
        assert_eq!(sanitize_sheet_name("Q1/Q2 [draft]?"), "Q1_Q2 _draft__");
        assert_eq!(sanitize_sheet_name("'quoted'"), "quoted");
        assert_eq!(sanitize_sheet_name("   "), "Sheet");
        let long = "x".repeat(40);
        assert_eq!(sanitize_sheet_name(&long).chars().count(), MAX_SHEET_NAME_LEN);
    }

    #[test]
    fn deduplicates_case_insensitively() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.claim("People"), "People");
        assert_eq!(namer.claim("people"), "people (2)");
        assert_eq!(namer.claim("PEOPLE"), "PEOPLE (3)");
    }

    #[test]
    fn suffixed_names_stay_within_the_limit() {
        let mut namer = SheetNamer::new();
        let long = "a".repeat(31);
        namer.claim(&long);
        let second = namer.claim(&long);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME_LEN);
        assert!(second.ends_with(" (2)"));
    }
}
