//! Utility functions for label processing and validation.
//!
//! Helpers shared by target normalization, the mutation engine and the
//! candidate builder.

use std::collections::HashSet;

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Normalize free text into a label: lowercase, letters/digits/hyphen only.
///
/// Leading and trailing hyphens are trimmed. Non-ASCII characters are dropped.
pub fn normalize_label(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    filtered.trim_matches('-').to_string()
}

/// Normalize a TLD: strip the leading dot, trim, lowercase.
pub fn normalize_tld(tld: &str) -> String {
    tld.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Normalize a TLD list, dropping empties and duplicates while keeping order.
pub fn normalize_tlds<S: AsRef<str>>(tlds: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tlds.iter()
        .map(|t| normalize_tld(t.as_ref()))
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Split raw target text into a label part and an optional TLD.
///
/// Text that looks like a domain (`PayPal.com`, `bank.co.uk`) is split at the
/// first dot. Anything with whitespace, or whose suffix is not alphabetic, is
/// treated as a plain keyword and its dots are discarded.
pub fn split_target(raw: &str) -> (String, Option<String>) {
    let trimmed = raw.trim().trim_end_matches('.');

    if trimmed.chars().any(char::is_whitespace) {
        return (trimmed.replace('.', ""), None);
    }

    match trimmed.split_once('.') {
        Some((label, suffix))
            if !label.is_empty()
                && suffix
                    .split('.')
                    .all(|part| part.len() >= 2 && part.chars().all(|c| c.is_ascii_alphabetic())) =>
        {
            (label.to_string(), Some(suffix.to_ascii_lowercase()))
        }
        _ => (trimmed.replace('.', ""), None),
    }
}

/// Check that a label is a usable DNS label.
///
/// ASCII letters, digits and hyphens only, 1 to 63 characters, no leading or
/// trailing hyphen.
pub fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }

    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Structural similarity of two labels in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("PayPal"), "paypal");
        assert_eq!(normalize_label("Open AI"), "openai");
        assert_eq!(normalize_label("-rust-lang-"), "rust-lang");
        assert_eq!(normalize_label("Café"), "caf");
        assert_eq!(normalize_label("!!!"), "");
    }

    #[test]
    fn test_normalize_tlds() {
        let tlds = normalize_tlds(&[".COM", "net", "com", "", " org "]);
        assert_eq!(tlds, vec!["com", "net", "org"]);
    }

    #[test]
    fn test_split_target() {
        assert_eq!(
            split_target("paypal.com"),
            ("paypal".to_string(), Some("com".to_string()))
        );
        assert_eq!(
            split_target("bank.co.uk"),
            ("bank".to_string(), Some("co.uk".to_string()))
        );
        assert_eq!(split_target("paypal"), ("paypal".to_string(), None));
        assert_eq!(split_target("web3.0"), ("web30".to_string(), None));
        assert_eq!(split_target("Open AI"), ("Open AI".to_string(), None));
    }

    #[test]
    fn test_is_valid_label() {
        assert!(is_valid_label("example"));
        assert!(is_valid_label("pay-pal"));
        assert!(is_valid_label("paypa1"));
        assert!(is_valid_label("x"));

        assert!(!is_valid_label(""));
        assert!(!is_valid_label("-example"));
        assert!(!is_valid_label("example-"));
        assert!(!is_valid_label("p@ypal"));
        assert!(!is_valid_label("Example"));
        assert!(!is_valid_label(&"a".repeat(64)));
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("paypal", "paypal"), 1.0);
        assert!(similarity("paypal", "paypa1") > 0.8);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }
}
