//! Risk ranking for available lookalike domains.
//!
//! Scores run from 0 to 100. Higher means the unregistered domain is a more
//! likely squatting target and worth registering defensively or watching.

use crate::types::VerificationResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suspicion used when no model score is available.
pub const NEUTRAL_SUSPICION: f64 = 0.5;

const MAX_VELOCITY: f64 = 3.0;
/// Cost per click (USD) that earns the full commercial weight.
const FULL_VALUE_CPC: f64 = 10.0;

/// Points each component contributes at full strength.
///
/// `enforcement_penalty` is subtracted: it is the most a brand that
/// aggressively pursues lookalike registrations can lose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub trend: f64,
    pub commercial: f64,
    pub plausibility: f64,
    pub domain_quality: f64,
    pub similarity: f64,
    pub suspicion: f64,
    pub enforcement_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            trend: 20.0,
            commercial: 15.0,
            plausibility: 20.0,
            domain_quality: 15.0,
            similarity: 15.0,
            suspicion: 15.0,
            enforcement_penalty: 15.0,
        }
    }
}

/// Model estimate of what a brand is worth to squatters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandAssessment {
    /// Typical cost per click of the brand's search terms, in USD
    pub estimated_cpc: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niche: Option<String>,
    /// How actively the owner goes after lookalike domains, 1 to 10
    pub enforcement: f64,
}

impl BrandAssessment {
    pub const DEFAULT_CPC: f64 = 1.0;
    pub const DEFAULT_ENFORCEMENT: f64 = 3.0;
}

impl Default for BrandAssessment {
    fn default() -> Self {
        Self {
            estimated_cpc: Self::DEFAULT_CPC,
            niche: None,
            enforcement: Self::DEFAULT_ENFORCEMENT,
        }
    }
}

/// Per-component points behind a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub commercial: f64,
    pub plausibility: f64,
    pub domain_quality: f64,
    pub similarity: f64,
    pub suspicion: f64,
    /// Zero or negative
    pub enforcement: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.trend
            + self.commercial
            + self.plausibility
            + self.domain_quality
            + self.similarity
            + self.suspicion
            + self.enforcement
    }
}

/// A verification result with its risk score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub result: VerificationResult,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Model suspicion in `0.0..=1.0`, when one was obtained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicion: Option<f64>,
}

impl ScoredCandidate {
    pub fn domain(&self) -> &str {
        &self.result.candidate.domain
    }

    pub fn brand(&self) -> &str {
        &self.result.candidate.target
    }
}

/// How attractive a TLD is to squatters.
pub fn tld_quality(tld: &str) -> f64 {
    match tld {
        "com" => 1.0,
        "ai" => 0.85,
        "io" => 0.8,
        "co" => 0.75,
        "net" => 0.7,
        "org" => 0.65,
        "app" => 0.6,
        "dev" => 0.55,
        "gg" => 0.45,
        "me" | "tv" => 0.4,
        "xyz" => 0.3,
        _ => 0.3,
    }
}

/// Shorter labels are easier to mistype and remember.
pub fn length_score(label: &str) -> f64 {
    match label.len() {
        0..=5 => 1.0,
        6..=8 => 0.8,
        9..=12 => 0.6,
        13..=16 => 0.4,
        _ => 0.2,
    }
}

/// Weighted sum of the trend, commercial, plausibility, quality, similarity
/// and suspicion components, less the enforcement penalty.
#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer {
    weights: ScoringWeights,
}

impl HeuristicScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one result given its target's trend velocity.
    pub fn score(
        &self,
        result: &VerificationResult,
        velocity: f64,
        suspicion: Option<f64>,
    ) -> ScoredCandidate {
        self.score_with(result, velocity, suspicion, None)
    }

    /// Score one result, using the brand's assessment when there is one.
    ///
    /// Without an assessment the brand counts as a $1 CPC brand with
    /// enforcement 3.
    pub fn score_with(
        &self,
        result: &VerificationResult,
        velocity: f64,
        suspicion: Option<f64>,
        assessment: Option<&BrandAssessment>,
    ) -> ScoredCandidate {
        let candidate = &result.candidate;
        let w = &self.weights;
        let (cpc, enforcement) = assessment
            .map(|a| (a.estimated_cpc, a.enforcement))
            .unwrap_or((BrandAssessment::DEFAULT_CPC, BrandAssessment::DEFAULT_ENFORCEMENT));

        let quality = (tld_quality(&candidate.tld) + length_score(&candidate.label)) / 2.0;
        let breakdown = ScoreBreakdown {
            trend: (velocity.max(0.0) / MAX_VELOCITY).min(1.0) * w.trend,
            commercial: (cpc.max(0.0) / FULL_VALUE_CPC).min(1.0) * w.commercial,
            plausibility: candidate.plausibility() * w.plausibility,
            domain_quality: quality * w.domain_quality,
            similarity: candidate.similarity.clamp(0.0, 1.0) * w.similarity,
            suspicion: suspicion
                .unwrap_or(NEUTRAL_SUSPICION)
                .clamp(0.0, 1.0)
                * w.suspicion,
            enforcement: -(enforcement.clamp(0.0, 10.0) / 10.0).powf(1.5) * w.enforcement_penalty,
        };

        let score = (breakdown.total().clamp(0.0, 100.0) * 10.0).round() / 10.0;

        ScoredCandidate {
            result: result.clone(),
            score,
            breakdown,
            suspicion,
        }
    }

    /// Score every available result and return them best first.
    ///
    /// `velocities` maps target labels to trend velocity; unknown targets
    /// count as 1.0. `suspicion` maps domains to model scores.
    pub fn rank(
        &self,
        results: &[VerificationResult],
        velocities: &HashMap<String, f64>,
        suspicion: &HashMap<String, f64>,
    ) -> Vec<ScoredCandidate> {
        self.rank_with(results, velocities, suspicion, &HashMap::new())
    }

    /// [`rank`](Self::rank) with brand assessments keyed by target label.
    pub fn rank_with(
        &self,
        results: &[VerificationResult],
        velocities: &HashMap<String, f64>,
        suspicion: &HashMap<String, f64>,
        assessments: &HashMap<String, BrandAssessment>,
    ) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = results
            .iter()
            .filter(|r| r.is_available())
            .map(|r| {
                let velocity = velocities
                    .get(&r.candidate.target)
                    .copied()
                    .unwrap_or(1.0);
                let model = suspicion.get(&r.candidate.domain).copied();
                self.score_with(r, velocity, model, assessments.get(&r.candidate.target))
            })
            .collect();

        sort_by_score(&mut scored);
        scored
    }
}

/// Sort best first; equal scores fall back to domain name.
pub fn sort_by_score(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.domain().cmp(b.domain()))
    });
}

/// Keep at most `max_per_brand` entries per target, preserving order.
///
/// Zero disables the limit.
pub fn diversify(ranked: &[ScoredCandidate], max_per_brand: usize) -> Vec<ScoredCandidate> {
    if max_per_brand == 0 {
        return ranked.to_vec();
    }

    let mut per_brand: HashMap<&str, usize> = HashMap::new();
    ranked
        .iter()
        .filter(|s| {
            let count = per_brand.entry(s.brand()).or_insert(0);
            *count += 1;
            *count <= max_per_brand
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Candidate, Classification, DnsOutcome, OutcomeReason, RegistryOutcome, StrategyId,
    };
    use chrono::Utc;

    fn available(label: &str, tld: &str, target: &str, strategy: StrategyId) -> VerificationResult {
        VerificationResult {
            candidate: Candidate::new(label, tld, target, strategy),
            dns: DnsOutcome::NoRecord,
            registry: RegistryOutcome::NotRegistered,
            classification: Classification::Available,
            reason: OutcomeReason::RegistryNotRegistered,
            checked_at: Utc::now(),
            attempts: 0,
            duration: None,
            info: None,
        }
    }

    #[test]
    fn test_tables() {
        assert_eq!(tld_quality("com"), 1.0);
        assert_eq!(tld_quality("zip"), 0.3);
        assert_eq!(length_score("paypl"), 1.0);
        assert_eq!(length_score("paypall"), 0.8);
        assert_eq!(length_score("averyveryverylonglabel"), 0.2);
    }

    #[test]
    fn test_score_components() {
        let scorer = HeuristicScorer::default();
        let result = available("paypl", "com", "paypal", StrategyId::Omission);

        let scored = scorer.score(&result, 3.0, Some(1.0));
        assert_eq!(scored.breakdown.trend, 20.0);
        assert_eq!(scored.breakdown.plausibility, 0.8 * 20.0);
        assert_eq!(scored.breakdown.domain_quality, 15.0);
        assert_eq!(scored.breakdown.suspicion, 15.0);
        assert!(scored.score > 60.0 && scored.score <= 100.0);
    }

    #[test]
    fn test_missing_assessment_uses_defaults() {
        let scorer = HeuristicScorer::default();
        let result = available("paypl", "com", "paypal", StrategyId::Omission);

        let scored = scorer.score(&result, 1.0, None);
        assert_eq!(scored.breakdown.commercial, 0.1 * 15.0);
        assert!((scored.breakdown.enforcement + 0.3f64.powf(1.5) * 15.0).abs() < 1e-9);
        assert_eq!(
            scored,
            scorer.score_with(&result, 1.0, None, Some(&BrandAssessment::default()))
        );
    }

    #[test]
    fn test_assessment_components() {
        let scorer = HeuristicScorer::default();
        let result = available("paypl", "com", "paypal", StrategyId::Omission);

        let valuable = BrandAssessment {
            estimated_cpc: 25.0,
            niche: Some("payments".to_string()),
            enforcement: 1.0,
        };
        let scored = scorer.score_with(&result, 1.0, None, Some(&valuable));
        assert_eq!(scored.breakdown.commercial, 15.0);
        assert!((scored.breakdown.enforcement + 0.1f64.powf(1.5) * 15.0).abs() < 1e-9);

        let litigious = BrandAssessment {
            enforcement: 10.0,
            ..valuable
        };
        let scored = scorer.score_with(&result, 1.0, None, Some(&litigious));
        assert_eq!(scored.breakdown.enforcement, -15.0);
    }

    #[test]
    fn test_rank_with_assessments_demotes_enforced_brands() {
        let scorer = HeuristicScorer::default();
        let results = vec![
            available("paypl", "com", "paypal", StrategyId::Omission),
            available("strpe", "com", "stripe", StrategyId::Omission),
        ];
        let assessments: HashMap<String, BrandAssessment> = [(
            "paypal".to_string(),
            BrandAssessment {
                enforcement: 10.0,
                ..BrandAssessment::default()
            },
        )]
        .into_iter()
        .collect();

        let ranked = scorer.rank_with(&results, &HashMap::new(), &HashMap::new(), &assessments);
        assert_eq!(ranked[0].domain(), "strpe.com");
        assert!(ranked[1].breakdown.enforcement < ranked[0].breakdown.enforcement);
    }

    #[test]
    fn test_missing_suspicion_is_neutral() {
        let scorer = HeuristicScorer::default();
        let result = available("paypl", "com", "paypal", StrategyId::Omission);

        let with_none = scorer.score(&result, 1.0, None);
        assert_eq!(with_none.breakdown.suspicion, 7.5);
        assert!(with_none.suspicion.is_none());
    }

    #[test]
    fn test_score_is_bounded_and_rounded() {
        let scorer = HeuristicScorer::default();
        let result = available("paypl", "com", "paypal", StrategyId::Omission);

        let scored = scorer.score(&result, 100.0, Some(5.0));
        assert!(scored.score <= 100.0);
        assert_eq!(scored.score, (scored.score * 10.0).round() / 10.0);
    }

    #[test]
    fn test_rank_only_available_best_first() {
        let scorer = HeuristicScorer::default();
        let mut taken = available("paypa", "com", "paypal", StrategyId::Omission);
        taken.classification = Classification::Taken;

        let results = vec![
            available("paypal", "xyz", "paypal", StrategyId::TldSwap),
            available("paypl", "com", "paypal", StrategyId::Omission),
            taken,
        ];

        let ranked = scorer.rank(&results, &HashMap::new(), &HashMap::new());
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].domain(), "paypl.com");
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn test_diversify_caps_per_brand() {
        let scorer = HeuristicScorer::default();
        let results = vec![
            available("paypl", "com", "paypal", StrategyId::Omission),
            available("paypa", "com", "paypal", StrategyId::Omission),
            available("aypal", "com", "paypal", StrategyId::Omission),
            available("strpe", "com", "stripe", StrategyId::Omission),
        ];
        let ranked = scorer.rank(&results, &HashMap::new(), &HashMap::new());

        let diverse = diversify(&ranked, 2);
        assert_eq!(diverse.len(), 3);
        assert_eq!(diverse.iter().filter(|s| s.brand() == "paypal").count(), 2);
        assert_eq!(diversify(&ranked, 0).len(), 4);
    }
}
