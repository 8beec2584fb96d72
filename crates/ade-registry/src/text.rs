//! Header text normalization shared by the built-in detectors.

/// Lowercases and turns separators into single spaces, so `E-Mail_Address`
/// and `e mail address` compare equal.
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\', ':', '#'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_collapse_to_spaces() {
        assert_eq!(normalize_header("  E-Mail_Address "), "e mail address");
        assert_eq!(normalize_header("Zip/Postal"), "zip postal");
        assert_eq!(normalize_header(""), "");
    }
}
