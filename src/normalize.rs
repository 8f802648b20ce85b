//! Canonical comparison keys for search input.
//!
//! Both sides of every comparison (stored value and query value) must go
//! through the same normalization; the SQL in `registry` applies the same
//! transform to the stored column.

/// Normalize a company registration number for equality comparison.
///
/// Trims, uppercases, and strips `(`, `)`, spaces, and hyphens. Leading
/// zeros are significant and survive normalization ("00123456" stays
/// "00123456"). Idempotent: applying it twice yields the same key.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ' ' | '-'))
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Normalize free text (names, addresses) for case-insensitive substring
/// matching. Trim and uppercase only; internal punctuation is preserved.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_strips_formatting_noise() {
        assert_eq!(normalize_identifier("  (oc-123456) "), "OC123456");
        assert_eq!(normalize_identifier("01 234-567"), "01234567");
        assert_eq!(normalize_identifier("(01 234-567)"), "01234567");
    }

    #[test]
    fn identifier_preserves_leading_zeros() {
        assert_eq!(normalize_identifier("00123456"), "00123456");
        assert_eq!(normalize_identifier(" 00123456 "), "00123456");
    }

    #[test]
    fn identifier_is_idempotent() {
        for raw in ["(oc 123456)", "  ab-12 ", "00123456", ""] {
            let once = normalize_identifier(raw);
            assert_eq!(normalize_identifier(&once), once);
        }
    }

    #[test]
    fn text_keeps_internal_punctuation() {
        assert_eq!(normalize_text("  12, High St.  "), "12, HIGH ST.");
        assert_eq!(normalize_text("acme (holdings)"), "ACME (HOLDINGS)");
    }
}
