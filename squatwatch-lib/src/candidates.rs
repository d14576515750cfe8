//! Candidate set construction.
//!
//! Runs the enabled mutation strategies for a target across the configured
//! TLDs, merges externally suggested labels and deduplicates the result by
//! full domain. First occurrence wins, so the canonical strategy order
//! decides provenance.

use crate::mutate;
use crate::types::{Candidate, StrategyId, Target};
use crate::utils::{is_valid_label, normalize_label};
use std::collections::HashSet;
use tracing::debug;

/// Enabled strategies in canonical order, without duplicates.
///
/// `llm-suggested` is not an algorithmic strategy and is dropped here;
/// suggestions enter through `extra_suggestions` in [`build`].
pub fn canonical_order(enabled: &[StrategyId]) -> Vec<StrategyId> {
    StrategyId::ALGORITHMIC
        .iter()
        .copied()
        .filter(|s| enabled.contains(s))
        .collect()
}

/// Build the deduplicated candidate set for one target.
///
/// Candidates equal to the target's own domain are rejected. Suggestions are
/// normalized and tagged `llm-suggested`; invalid ones, and ones equal to the
/// target label, are dropped.
pub fn build(
    target: &Target,
    strategies: &[StrategyId],
    tlds: &[String],
    extra_suggestions: &[String],
) -> Vec<Candidate> {
    let label = target.normalized.as_str();
    let original = target.original_domain();

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    let mut push = |candidate: Candidate, out: &mut Vec<Candidate>| {
        if original.as_deref() == Some(candidate.domain.as_str()) {
            return;
        }
        if seen.insert(candidate.domain.clone()) {
            out.push(candidate);
        }
    };

    for strategy in canonical_order(strategies) {
        for candidate in mutate::generate(label, strategy, tlds) {
            push(candidate, &mut out);
        }
    }

    for suggestion in extra_suggestions {
        let normalized = normalize_label(suggestion);
        if normalized == label || !is_valid_label(&normalized) {
            debug!("Dropping suggestion '{}' for '{}'", suggestion, label);
            continue;
        }
        for tld in tlds {
            push(
                Candidate::new(&normalized, tld, label, StrategyId::LlmSuggested),
                &mut out,
            );
        }
    }

    debug!("Built {} candidates for '{}'", out.len(), label);
    out
}

/// Keep at most `max` candidates, preferring the most plausible strategies.
///
/// Ties keep their build order.
pub fn cap_per_target(mut candidates: Vec<Candidate>, max: usize) -> Vec<Candidate> {
    if candidates.len() <= max {
        return candidates;
    }

    candidates.sort_by(|a, b| b.plausibility().total_cmp(&a.plausibility()));
    candidates.truncate(max);
    candidates
}
