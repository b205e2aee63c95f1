//! Identifier grammar
//!
//! Every name that may be interpolated into engine SQL (schema names, field
//! names, aliases) must satisfy `[A-Za-z_][A-Za-z0-9_]*`. Subject values are
//! never identifiers; they travel as bound parameters.

/// Check a name against the identifier grammar
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert!(is_valid_identifier("vehicles"));
        assert!(is_valid_identifier("owner_id"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("v2"));
    }

    #[test]
    fn test_rejects_injection_shapes() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("2cool"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier("a b"));
        assert!(!is_valid_identifier("a;DROP TABLE x"));
        assert!(!is_valid_identifier("a.b"));
        assert!(!is_valid_identifier("a'b"));
    }
}
