//! Typo mutation engine.
//!
//! Pure string transformations that turn a normalized label into the
//! misspellings a person (or an attacker) is likely to produce. Each strategy
//! is a plain function with the same signature, selected by [`StrategyId`].
//! Nothing here performs I/O, and mutations are never chained.
//!
//! # Examples
//!
//! ```
//! use squatwatch_lib::mutate::{generate, label_variants};
//! use squatwatch_lib::StrategyId;
//!
//! let omissions = label_variants("example", StrategyId::Omission);
//! assert!(omissions.contains(&"exampl".to_string()));
//!
//! let tlds = vec!["net".to_string(), "org".to_string()];
//! let swapped: Vec<_> = generate("paypal", StrategyId::TldSwap, &tlds)
//!     .map(|c| c.domain)
//!     .collect();
//! assert_eq!(swapped, vec!["paypal.net", "paypal.org"]);
//! ```

use crate::types::{Candidate, StrategyId};
use crate::utils::is_valid_label;
use std::collections::HashSet;

/// Signature shared by every label-mutating strategy.
pub type StrategyFn = fn(&str) -> Vec<String>;

/// Keys physically adjacent on a QWERTY keyboard.
fn qwerty_neighbors(c: char) -> &'static str {
    match c {
        'q' => "wa",
        'w' => "qeas",
        'e' => "wrds",
        'r' => "etdf",
        't' => "ryfg",
        'y' => "tugh",
        'u' => "yijh",
        'i' => "uojk",
        'o' => "iplk",
        'p' => "ol",
        'a' => "qwsz",
        's' => "weadzx",
        'd' => "ersfxc",
        'f' => "rtdgcv",
        'g' => "tyfhvb",
        'h' => "yugjbn",
        'j' => "uihknm",
        'k' => "oijlm",
        'l' => "opk",
        'z' => "asx",
        'x' => "zsdc",
        'c' => "xdfv",
        'v' => "cfgb",
        'b' => "vghn",
        'n' => "bhjm",
        'm' => "njk",
        _ => "",
    }
}

/// Visually confusable glyphs and sequences.
///
/// Entries that are not valid in a DNS label (such as `@`) are kept for
/// completeness and filtered out at generation time.
const HOMOGLYPHS: &[(&str, &[&str])] = &[
    ("l", &["1", "i"]),
    ("i", &["1", "l"]),
    ("o", &["0"]),
    ("0", &["o"]),
    ("1", &["l", "i"]),
    ("s", &["5", "z"]),
    ("5", &["s"]),
    ("a", &["@", "4"]),
    ("e", &["3"]),
    ("b", &["6"]),
    ("g", &["9"]),
    ("t", &["7"]),
    ("m", &["rn"]),
    ("w", &["vv"]),
    ("d", &["cl"]),
    ("rn", &["m"]),
    ("cl", &["d"]),
    ("vv", &["w"]),
];

/// Remove exactly one character at each position.
pub fn omissions(label: &str) -> Vec<String> {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() < 2 {
        return Vec::new();
    }

    (0..chars.len())
        .map(|i| {
            chars
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, c)| *c)
                .collect()
        })
        .collect()
}

/// Duplicate exactly one character at each position.
pub fn doublings(label: &str) -> Vec<String> {
    let chars: Vec<char> = label.chars().collect();

    (0..chars.len())
        .map(|i| {
            let mut out = String::with_capacity(label.len() + 1);
            out.extend(&chars[..=i]);
            out.extend(&chars[i..]);
            out
        })
        .collect()
}

/// Swap each pair of adjacent characters once.
pub fn transpositions(label: &str) -> Vec<String> {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() < 2 {
        return Vec::new();
    }

    (0..chars.len() - 1)
        .map(|i| {
            let mut swapped = chars.clone();
            swapped.swap(i, i + 1);
            swapped.into_iter().collect()
        })
        .collect()
}

/// Replace each character with each of its QWERTY neighbors.
pub fn adjacent_keys(label: &str) -> Vec<String> {
    let chars: Vec<char> = label.chars().collect();
    let mut out = Vec::new();

    for (i, c) in chars.iter().enumerate() {
        for neighbor in qwerty_neighbors(*c).chars() {
            let mut replaced = chars.clone();
            replaced[i] = neighbor;
            out.push(replaced.into_iter().collect());
        }
    }

    out
}

/// Replace characters and short sequences with confusable glyphs.
pub fn homoglyphs(label: &str) -> Vec<String> {
    let mut out = Vec::new();

    for (pattern, replacements) in HOMOGLYPHS {
        for (idx, _) in label.match_indices(pattern) {
            for replacement in *replacements {
                let mut replaced = String::with_capacity(label.len() + replacement.len());
                replaced.push_str(&label[..idx]);
                replaced.push_str(replacement);
                replaced.push_str(&label[idx + pattern.len()..]);
                out.push(replaced);
            }
        }
    }

    out
}

/// The label-mutating function behind a strategy.
///
/// TLD swap keeps the label fixed and LLM suggestions come from outside, so
/// neither has one.
pub fn strategy_fn(strategy: StrategyId) -> Option<StrategyFn> {
    match strategy {
        StrategyId::Omission => Some(omissions),
        StrategyId::Doubling => Some(doublings),
        StrategyId::Transposition => Some(transpositions),
        StrategyId::AdjacentKey => Some(adjacent_keys),
        StrategyId::Homoglyph => Some(homoglyphs),
        StrategyId::TldSwap | StrategyId::LlmSuggested => None,
    }
}

/// Distinct, valid label variants a strategy produces for `label`.
///
/// The original label is never included. Order is deterministic.
pub fn label_variants(label: &str, strategy: StrategyId) -> Vec<String> {
    let Some(mutate) = strategy_fn(strategy) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    mutate(label)
        .into_iter()
        .filter(|variant| variant != label && is_valid_label(variant))
        .filter(|variant| seen.insert(variant.clone()))
        .collect()
}

/// Generate candidates for one strategy across a TLD set.
///
/// The returned iterator is lazy and finite. Calling `generate` again with the
/// same inputs yields the same sequence. TLD swap yields `label.tld` for each
/// TLD; excluding the target's own domain is the caller's concern.
pub fn generate<'a>(
    label: &'a str,
    strategy: StrategyId,
    tlds: &'a [String],
) -> impl Iterator<Item = Candidate> + 'a {
    let labels = match strategy {
        StrategyId::TldSwap if is_valid_label(label) => vec![label.to_string()],
        _ => label_variants(label, strategy),
    };

    labels.into_iter().flat_map(move |variant| {
        tlds.iter()
            .map(move |tld| Candidate::new(&variant, tld, label, strategy))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tlds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sorted_chars(s: &str) -> Vec<char> {
        let mut chars: Vec<char> = s.chars().collect();
        chars.sort_unstable();
        chars
    }

    // ── Omission ────────────────────────────────────────────────────

    #[test]
    fn test_omission_example() {
        let variants = label_variants("example", StrategyId::Omission);
        assert!(variants.contains(&"xample".to_string()));
        assert!(variants.contains(&"exampl".to_string()));
        assert!(variants.contains(&"examle".to_string()));
        assert!(!variants.contains(&"example".to_string()));
        assert!(variants.len() <= 7);
        assert!(variants.iter().all(|v| v.len() == 6));
    }

    #[test]
    fn test_omission_dedupes_repeated_letters() {
        // removing either 'o' in "google" gives "gogle"
        let variants = label_variants("google", StrategyId::Omission);
        assert_eq!(variants.iter().filter(|v| *v == "gogle").count(), 1);
        assert_eq!(variants.len(), 5);
    }

    #[test]
    fn test_omission_short_label_is_empty() {
        assert!(label_variants("a", StrategyId::Omission).is_empty());
        assert!(label_variants("", StrategyId::Omission).is_empty());
    }

    #[test]
    fn test_omission_drops_invalid_labels() {
        let variants = label_variants("a-b", StrategyId::Omission);
        assert_eq!(variants, vec!["ab"]);
    }

    // ── Doubling ────────────────────────────────────────────────────

    #[test]
    fn test_doubling_lengths() {
        let variants = label_variants("stripe", StrategyId::Doubling);
        assert_eq!(variants.len(), 6);
        assert!(variants.iter().all(|v| v.len() == 7));
        assert!(variants.contains(&"sstripe".to_string()));
        assert!(variants.contains(&"stripee".to_string()));
    }

    #[test]
    fn test_doubling_single_char() {
        assert_eq!(label_variants("x", StrategyId::Doubling), vec!["xx"]);
    }

    // ── Transposition ───────────────────────────────────────────────

    #[test]
    fn test_transposition_preserves_multiset() {
        let variants = label_variants("paypal", StrategyId::Transposition);
        assert!(variants.len() <= 5);
        assert!(variants.contains(&"apypal".to_string()));
        for v in &variants {
            assert_eq!(v.len(), 6);
            assert_eq!(sorted_chars(v), sorted_chars("paypal"));
        }
    }

    #[test]
    fn test_transposition_identical_pair_is_noop() {
        // "aa" swapped is still "aa"
        assert!(label_variants("aa", StrategyId::Transposition).is_empty());
    }

    // ── Adjacent key ────────────────────────────────────────────────

    #[test]
    fn test_adjacent_key_substitutions() {
        let variants = label_variants("go", StrategyId::AdjacentKey);
        assert!(variants.contains(&"to".to_string()));
        assert!(variants.contains(&"gp".to_string()));
        assert_eq!(variants.len(), 6 + 4);
    }

    #[test]
    fn test_adjacent_key_skips_unmapped_chars() {
        let variants = label_variants("a1", StrategyId::AdjacentKey);
        assert_eq!(variants, vec!["q1", "w1", "s1", "z1"]);
    }

    // ── Homoglyph ───────────────────────────────────────────────────

    #[test]
    fn test_homoglyph_single_and_multi_char() {
        let variants = label_variants("modern", StrategyId::Homoglyph);
        assert!(variants.contains(&"m0dern".to_string()));
        assert!(variants.contains(&"rnodern".to_string()));
        assert!(variants.contains(&"modem".to_string()));
        assert!(!variants.contains(&"mo3ern".to_string()));
    }

    #[test]
    fn test_homoglyph_filters_invalid_glyphs() {
        let variants = label_variants("paypal", StrategyId::Homoglyph);
        assert!(variants.contains(&"p4ypal".to_string()));
        assert!(variants.contains(&"paypa1".to_string()));
        assert!(variants.iter().all(|v| !v.contains('@')));
    }

    // ── Generation ──────────────────────────────────────────────────

    #[test]
    fn test_generate_crosses_tlds() {
        let tlds = tlds(&["com"]);
        let domains: Vec<String> = generate("example", StrategyId::Omission, &tlds)
            .map(|c| c.domain)
            .collect();
        assert!(domains.contains(&"exampl.com".to_string()));
        assert!(domains.contains(&"xample.com".to_string()));
        assert!(domains.contains(&"examle.com".to_string()));
        assert!(!domains.contains(&"example.com".to_string()));
    }

    #[test]
    fn test_generate_tld_swap_keeps_label() {
        let tlds = tlds(&["net", "org"]);
        let candidates: Vec<Candidate> = generate("paypal", StrategyId::TldSwap, &tlds).collect();
        let domains: Vec<&str> = candidates.iter().map(|c| c.domain.as_str()).collect();
        assert_eq!(domains, vec!["paypal.net", "paypal.org"]);
        assert!(candidates.iter().all(|c| c.similarity == 1.0));
    }

    #[test]
    fn test_generate_is_restartable() {
        let tlds = tlds(&["com", "io"]);
        let first: Vec<String> = generate("rust", StrategyId::AdjacentKey, &tlds)
            .map(|c| c.domain)
            .collect();
        let second: Vec<String> = generate("rust", StrategyId::AdjacentKey, &tlds)
            .map(|c| c.domain)
            .collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_generate_llm_strategy_is_empty() {
        let tlds = tlds(&["com"]);
        assert_eq!(generate("paypal", StrategyId::LlmSuggested, &tlds).count(), 0);
    }

    #[test]
    fn test_no_strategy_yields_original_label() {
        for strategy in StrategyId::ALGORITHMIC {
            if strategy == StrategyId::TldSwap {
                continue;
            }
            let variants = label_variants("paypal", strategy);
            assert!(!variants.contains(&"paypal".to_string()), "{}", strategy);
        }
    }
}
