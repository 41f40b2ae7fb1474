//! Lexical reference extraction.

use std::collections::BTreeSet;

use blockflow_core::expr::scan_identifiers;

/// Ids from `known_ids` that `expression` references.
///
/// The scan is lexical and works on text that does not parse: identifiers
/// inside string literals, numeric suffixes and attribute names after `.` are
/// ignored.
pub fn extract_references(expression: &str, known_ids: &BTreeSet<String>) -> BTreeSet<String> {
    scan_identifiers(expression)
        .into_iter()
        .filter(|name| known_ids.contains(*name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_only_known_ids() {
        let refs = extract_references("samp_rate / decim + other", &known(&["samp_rate", "decim"]));
        assert_eq!(refs, known(&["decim", "samp_rate"]));
    }

    #[test]
    fn test_token_boundaries() {
        let refs = extract_references("v10 + v1x", &known(&["v1"]));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_ignores_string_literals() {
        let refs = extract_references("'v1' + \"v2\" + v3", &known(&["v1", "v2", "v3"]));
        assert_eq!(refs, known(&["v3"]));
    }

    #[test]
    fn test_unparseable_text_still_scans() {
        let refs = extract_references("v1 +* (v2", &known(&["v1", "v2"]));
        assert_eq!(refs, known(&["v1", "v2"]));
    }

    #[test]
    fn test_escaped_multibyte_character() {
        let refs = extract_references(r"'\é' + v1", &known(&["v1"]));
        assert_eq!(refs, known(&["v1"]));
    }
}
