//! End-to-end orchestration of one discovery run.
//!
//! ```text
//! Idle -> CollectingTargets -> [Enriching] -> GeneratingCandidates
//!      -> Verifying -> [Scoring] -> Assembling -> Done
//! ```
//!
//! Any state before verification may end in `Failed` when the run is
//! misconfigured (no targets, strategies or TLDs). Optional stages never fail
//! the run; their outcome is recorded in [`PipelineRun::stages`].

use crate::candidates;
use crate::checker::AvailabilityChecker;
use crate::concurrent::verify_all;
use crate::error::SquatWatchError;
use crate::llm::Enricher;
use crate::protocols::registry::DEFAULT_TLDS;
use crate::scoring::{BrandAssessment, HeuristicScorer, ScoredCandidate};
use crate::trends::{collect_signals, TargetSource};
use crate::types::{Candidate, Classification, OutcomeReason, StrategyId, Target, VerificationResult};
use crate::utils::normalize_tlds;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parallel calls made to the enrichment collaborator.
const ENRICHMENT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Idle,
    CollectingTargets,
    Enriching,
    GeneratingCandidates,
    Verifying,
    Scoring,
    Assembling,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

/// Optional steps whose outcome is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    TargetSource,
    Filtering,
    Suggestions,
    Scoring,
    Assessment,
    Suspicion,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::TargetSource => "target-source",
            Stage::Filtering => "filtering",
            Stage::Suggestions => "suggestions",
            Stage::Scoring => "scoring",
            Stage::Assessment => "assessment",
            Stage::Suspicion => "suspicion",
            Stage::Report => "report",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum StageOutcome {
    /// Ran and produced `items` results
    Ran { items: usize },
    /// Ran and produced nothing
    RanEmpty,
    Skipped { reason: String },
    Failed { error: String },
}

impl StageOutcome {
    pub(crate) fn from_count(items: usize) -> Self {
        if items == 0 {
            StageOutcome::RanEmpty
        } else {
            StageOutcome::Ran { items }
        }
    }

    pub(crate) fn skipped<R: Into<String>>(reason: R) -> Self {
        StageOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    /// Which source or sink, when a stage runs more than once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub outcome: StageOutcome,
}

/// Tally of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub targets: usize,
    pub candidates: usize,
    pub verified: usize,
    pub available: usize,
    pub taken: usize,
    pub indeterminate: usize,
    /// Indeterminate because a query failed (as opposed to the deadline)
    pub errored: usize,
}

impl RunCounts {
    pub fn tally(targets: usize, candidates: usize, results: &[VerificationResult]) -> Self {
        let mut counts = RunCounts {
            targets,
            candidates,
            verified: results.len(),
            ..Default::default()
        };

        for result in results {
            match result.classification {
                Classification::Available => counts.available += 1,
                Classification::Taken => counts.taken += 1,
                Classification::Indeterminate => {
                    counts.indeterminate += 1;
                    if result.reason != OutcomeReason::DeadlineExceeded {
                        counts.errored += 1;
                    }
                }
            }
        }
        counts
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Cause of a `Failed` run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub counts: RunCounts,
    pub targets: Vec<Target>,
    pub stages: Vec<StageRecord>,
    pub results: Vec<VerificationResult>,
    /// Available domains, best first; empty when scoring was skipped
    pub ranked: Vec<ScoredCandidate>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            started_at: Utc::now(),
            finished_at: None,
            failure: None,
            counts: RunCounts::default(),
            targets: Vec::new(),
            stages: Vec::new(),
            results: Vec::new(),
            ranked: Vec::new(),
        }
    }

    fn enter(&mut self, state: PipelineState) {
        info!("Pipeline {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub fn record(&mut self, stage: Stage, detail: Option<&str>, outcome: StageOutcome) {
        match &outcome {
            StageOutcome::Failed { error } => warn!("Stage {} failed: {}", stage, error),
            StageOutcome::Skipped { reason } => info!("Stage {} skipped: {}", stage, reason),
            _ => debug!("Stage {}: {:?}", stage, outcome),
        }
        self.stages.push(StageRecord {
            stage,
            detail: detail.map(str::to_string),
            outcome,
        });
    }

    /// Recorded outcomes for one stage.
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &StageRecord> {
        self.stages.iter().filter(move |r| r.stage == stage)
    }

    pub fn is_failed(&self) -> bool {
        self.state == PipelineState::Failed
    }

    pub fn with_classification(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &VerificationResult> {
        self.results
            .iter()
            .filter(move |r| r.classification == classification)
    }

    fn finish(&mut self, outcome: Result<(), SquatWatchError>) {
        match outcome {
            Ok(()) => self.enter(PipelineState::Done),
            Err(e) => {
                warn!("Pipeline failed: {}", e);
                self.failure = Some(e.to_string());
                self.counts = RunCounts::tally(self.targets.len(), 0, &[]);
                self.enter(PipelineState::Failed);
            }
        }
        self.finished_at = Some(Utc::now());
    }
}

/// Run parameters that are not verification settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Manual targets; when set, target sources are bypassed
    pub targets: Vec<String>,
    pub strategies: Vec<StrategyId>,
    pub tlds: Vec<String>,
    pub max_targets: usize,
    pub max_candidates_per_target: usize,
    /// Use the enrichment collaborator for filtering, suggestions and suspicion
    pub enrichment: bool,
    pub scoring: bool,
    /// How many of the best heuristic results get a model suspicion score
    pub suspicion_top_n: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            strategies: StrategyId::ALGORITHMIC.to_vec(),
            tlds: DEFAULT_TLDS.iter().map(|t| t.to_string()).collect(),
            max_targets: 50,
            max_candidates_per_target: 30,
            enrichment: true,
            scoring: true,
            suspicion_top_n: 25,
        }
    }
}

/// Targets and candidates prepared for verification.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub targets: Vec<Target>,
    pub candidates: Vec<Candidate>,
    pub stages: Vec<StageRecord>,
}

/// Drives one run from target collection to a finished [`PipelineRun`].
pub struct Pipeline {
    settings: PipelineSettings,
    checker: Arc<AvailabilityChecker>,
    sources: Vec<Arc<dyn TargetSource>>,
    enricher: Option<Arc<dyn Enricher>>,
    scorer: HeuristicScorer,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, checker: Arc<AvailabilityChecker>) -> Self {
        Self {
            settings,
            checker,
            sources: Vec::new(),
            enricher: None,
            scorer: HeuristicScorer::default(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn TargetSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_enricher(mut self, enricher: Option<Arc<dyn Enricher>>) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_scorer(mut self, scorer: HeuristicScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// The enricher, when enrichment is enabled and one is configured.
    fn active_enricher(&self) -> Option<&Arc<dyn Enricher>> {
        if self.settings.enrichment {
            self.enricher.as_ref()
        } else {
            None
        }
    }

    fn enrichment_skip_reason(&self) -> &'static str {
        if !self.settings.enrichment {
            "disabled"
        } else {
            "no enrichment collaborator configured"
        }
    }

    /// Collect, enrich and generate without verifying anything.
    pub async fn plan(&self) -> Result<Plan, SquatWatchError> {
        let mut run = PipelineRun::new();
        let candidates = self.prepare(&mut run).await?;
        Ok(Plan {
            targets: run.targets,
            candidates,
            stages: run.stages,
        })
    }

    /// Execute a full run. Always returns a run in a terminal state.
    pub async fn run(&self) -> PipelineRun {
        let mut run = PipelineRun::new();
        let outcome = self.execute(&mut run).await;
        run.finish(outcome);
        run
    }

    async fn execute(&self, run: &mut PipelineRun) -> Result<(), SquatWatchError> {
        let candidates = self.prepare(run).await?;
        let candidate_count = candidates.len();

        run.enter(PipelineState::Verifying);
        run.results = verify_shared(&self.checker, candidates).await;

        if self.settings.scoring {
            run.enter(PipelineState::Scoring);
            self.score(run).await;
        } else {
            run.record(Stage::Scoring, None, StageOutcome::skipped("disabled"));
        }

        run.enter(PipelineState::Assembling);
        run.counts = RunCounts::tally(run.targets.len(), candidate_count, &run.results);
        info!(
            "Run complete: {} available, {} taken, {} indeterminate",
            run.counts.available, run.counts.taken, run.counts.indeterminate
        );
        Ok(())
    }

    /// Everything up to and including candidate generation.
    async fn prepare(&self, run: &mut PipelineRun) -> Result<Vec<Candidate>, SquatWatchError> {
        let strategies = candidates::canonical_order(&self.settings.strategies);
        if strategies.is_empty() {
            return Err(SquatWatchError::config("no mutation strategies enabled"));
        }
        let tlds = normalize_tlds(&self.settings.tlds);
        if tlds.is_empty() {
            return Err(SquatWatchError::config("no candidate TLDs configured"));
        }

        run.enter(PipelineState::CollectingTargets);
        let (targets, from_sources) = self.collect_targets(run).await;
        if targets.is_empty() {
            return Err(SquatWatchError::config("no targets to protect"));
        }

        let mut suggestions = HashMap::new();
        match self.active_enricher() {
            Some(enricher) => {
                run.enter(PipelineState::Enriching);
                let filtered = self.filter_targets(run, enricher, targets, from_sources).await;
                run.targets = filtered;
                suggestions = self.suggest(run, enricher).await;
            }
            None => {
                let reason = self.enrichment_skip_reason();
                run.record(Stage::Filtering, None, StageOutcome::skipped(reason));
                run.record(Stage::Suggestions, None, StageOutcome::skipped(reason));
                run.targets = cap_targets(targets, self.settings.max_targets);
            }
        }

        run.enter(PipelineState::GeneratingCandidates);
        let mut out = Vec::new();
        for target in &run.targets {
            let extra = suggestions
                .get(&target.normalized)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let built = candidates::build(target, &strategies, &tlds, extra);
            out.extend(candidates::cap_per_target(
                built,
                self.settings.max_candidates_per_target,
            ));
        }

        info!(
            "Generated {} candidates for {} targets",
            out.len(),
            run.targets.len()
        );
        Ok(out)
    }

    /// Returns the targets and whether they came from trend sources.
    async fn collect_targets(&self, run: &mut PipelineRun) -> (Vec<Target>, bool) {
        if !self.settings.targets.is_empty() {
            run.record(
                Stage::TargetSource,
                None,
                StageOutcome::skipped("manual targets supplied"),
            );
            let targets = self
                .settings
                .targets
                .iter()
                .filter_map(|raw| match Target::manual(raw) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        warn!("Ignoring target: {}", e);
                        None
                    }
                })
                .collect();
            return (dedupe_targets(targets), false);
        }

        if self.sources.is_empty() {
            run.record(
                Stage::TargetSource,
                None,
                StageOutcome::skipped("no target sources configured"),
            );
            return (Vec::new(), true);
        }

        let (signals, failures) = collect_signals(&self.sources).await;
        for (name, error) in failures {
            run.record(
                Stage::TargetSource,
                Some(&name),
                StageOutcome::Failed {
                    error: error.to_string(),
                },
            );
        }

        let targets: Vec<Target> = signals
            .into_iter()
            .filter_map(|signal| signal.into_target())
            .collect();
        let targets = dedupe_targets(targets);
        run.record(Stage::TargetSource, None, StageOutcome::from_count(targets.len()));
        (targets, true)
    }

    async fn filter_targets(
        &self,
        run: &mut PipelineRun,
        enricher: &Arc<dyn Enricher>,
        targets: Vec<Target>,
        from_sources: bool,
    ) -> Vec<Target> {
        let max = self.settings.max_targets;
        if !from_sources {
            run.record(
                Stage::Filtering,
                None,
                StageOutcome::skipped("manual targets are not filtered"),
            );
            return cap_targets(targets, max);
        }

        match enricher.filter(&targets, max).await {
            Ok(picked) if !picked.is_empty() => {
                run.record(Stage::Filtering, None, StageOutcome::from_count(picked.len()));
                cap_targets(picked, max)
            }
            Ok(_) => {
                run.record(Stage::Filtering, None, StageOutcome::RanEmpty);
                cap_targets(targets, max)
            }
            Err(e) => {
                run.record(
                    Stage::Filtering,
                    None,
                    StageOutcome::Failed {
                        error: e.to_string(),
                    },
                );
                cap_targets(targets, max)
            }
        }
    }

    /// Ask the collaborator for extra labels, keyed by target label.
    async fn suggest(
        &self,
        run: &mut PipelineRun,
        enricher: &Arc<dyn Enricher>,
    ) -> HashMap<String, Vec<String>> {
        let replies: Vec<(String, Result<Vec<String>, SquatWatchError>)> =
            stream::iter(run.targets.iter())
                .map(|target| async move {
                    (target.normalized.clone(), enricher.suggest(target).await)
                })
                .buffer_unordered(ENRICHMENT_CONCURRENCY)
                .collect()
                .await;

        let mut suggestions = HashMap::new();
        let mut first_error = None;
        let mut succeeded = 0usize;
        let mut total = 0usize;

        for (label, reply) in replies {
            match reply {
                Ok(labels) => {
                    succeeded += 1;
                    total += labels.len();
                    suggestions.insert(label, labels);
                }
                Err(e) => {
                    warn!("No suggestions for {}: {}", label, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let outcome = match (succeeded, first_error) {
            (0, Some(e)) => StageOutcome::Failed {
                error: e.to_string(),
            },
            _ => StageOutcome::from_count(total),
        };
        run.record(Stage::Suggestions, None, outcome);
        suggestions
    }

    async fn score(&self, run: &mut PipelineRun) {
        let velocities: HashMap<String, f64> = run
            .targets
            .iter()
            .map(|t| (t.normalized.clone(), t.velocity))
            .collect();

        let mut ranked = self.scorer.rank(&run.results, &velocities, &HashMap::new());

        match self.active_enricher() {
            Some(enricher) if !ranked.is_empty() => {
                let assessments = self.assess(run, enricher, &ranked).await;
                let suspicion = self.suspicion(run, enricher, &ranked).await;
                if !assessments.is_empty() || !suspicion.is_empty() {
                    ranked = self
                        .scorer
                        .rank_with(&run.results, &velocities, &suspicion, &assessments);
                }
            }
            Some(_) => {
                let reason = "nothing available to score";
                run.record(Stage::Assessment, None, StageOutcome::skipped(reason));
                run.record(Stage::Suspicion, None, StageOutcome::skipped(reason));
            }
            None => {
                let reason = self.enrichment_skip_reason();
                run.record(Stage::Assessment, None, StageOutcome::skipped(reason));
                run.record(Stage::Suspicion, None, StageOutcome::skipped(reason));
            }
        }

        run.record(Stage::Scoring, None, StageOutcome::from_count(ranked.len()));
        run.ranked = ranked;
    }

    /// Brand value and enforcement for every brand with an available domain.
    async fn assess(
        &self,
        run: &mut PipelineRun,
        enricher: &Arc<dyn Enricher>,
        ranked: &[ScoredCandidate],
    ) -> HashMap<String, BrandAssessment> {
        let mut brands: Vec<String> = Vec::new();
        for scored in ranked {
            if !brands.iter().any(|b| b == scored.brand()) {
                brands.push(scored.brand().to_string());
            }
        }

        match enricher.assess(&brands).await {
            Ok(assessments) => {
                run.record(
                    Stage::Assessment,
                    None,
                    StageOutcome::from_count(assessments.len()),
                );
                assessments
            }
            Err(e) => {
                run.record(
                    Stage::Assessment,
                    None,
                    StageOutcome::Failed {
                        error: e.to_string(),
                    },
                );
                HashMap::new()
            }
        }
    }

    /// Model suspicion for the best heuristic results, keyed by domain.
    async fn suspicion(
        &self,
        run: &mut PipelineRun,
        enricher: &Arc<dyn Enricher>,
        ranked: &[ScoredCandidate],
    ) -> HashMap<String, f64> {
        let mut asked = HashSet::new();
        let top = ranked
            .iter()
            .filter(|scored| asked.insert(scored.domain().to_string()))
            .take(self.settings.suspicion_top_n);
        let replies: Vec<(String, Result<f64, SquatWatchError>)> = stream::iter(top)
            .map(|scored| async move {
                let candidate = &scored.result.candidate;
                (candidate.domain.clone(), enricher.score(candidate).await)
            })
            .buffer_unordered(ENRICHMENT_CONCURRENCY)
            .collect()
            .await;

        let mut scores = HashMap::new();
        let mut first_error = None;
        for (domain, reply) in replies {
            match reply {
                Ok(score) => {
                    scores.insert(domain, score);
                }
                Err(e) => {
                    debug!("No suspicion score for {}: {}", domain, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let outcome = match (scores.len(), first_error) {
            (0, Some(e)) => StageOutcome::Failed {
                error: e.to_string(),
            },
            (n, _) => StageOutcome::from_count(n),
        };
        run.record(Stage::Suspicion, None, outcome);
        scores
    }
}

/// Verify each distinct domain once; every candidate gets its own result.
///
/// Two targets can mutate into the same domain ("abcd" and "abce" both
/// lose a letter to "abc"). Both candidates are kept, in generation order.
async fn verify_shared(
    checker: &AvailabilityChecker,
    candidates: Vec<Candidate>,
) -> Vec<VerificationResult> {
    let mut seen = HashSet::new();
    let unique: Vec<Candidate> = candidates
        .iter()
        .filter(|c| seen.insert(c.domain.clone()))
        .cloned()
        .collect();
    if unique.len() < candidates.len() {
        debug!(
            "{} candidates share {} distinct domains",
            candidates.len(),
            unique.len()
        );
    }

    let by_domain: HashMap<String, VerificationResult> = verify_all(checker, unique)
        .await
        .into_iter()
        .map(|r| (r.candidate.domain.clone(), r))
        .collect();

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let shared = by_domain.get(&candidate.domain)?;
            Some(VerificationResult {
                candidate,
                ..shared.clone()
            })
        })
        .collect()
}

/// Drop repeated labels, keeping the first (strongest) occurrence.
fn dedupe_targets(targets: Vec<Target>) -> Vec<Target> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|t| seen.insert(t.normalized.clone()))
        .collect()
}

fn cap_targets(mut targets: Vec<Target>, max: usize) -> Vec<Target> {
    targets.truncate(max);
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Verifying.is_terminal());
    }

    #[test]
    fn test_stage_outcome_from_count() {
        assert_eq!(StageOutcome::from_count(0), StageOutcome::RanEmpty);
        assert_eq!(StageOutcome::from_count(3), StageOutcome::Ran { items: 3 });
    }

    #[test]
    fn test_stage_record_serializes_flat() {
        let record = StageRecord {
            stage: Stage::Filtering,
            detail: None,
            outcome: StageOutcome::skipped("disabled"),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["stage"], "filtering");
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "disabled");
    }

    #[test]
    fn test_tally_separates_deadline_from_errors() {
        use crate::types::{DnsOutcome, RegistryOutcome};

        let candidate = Candidate::new("paypl", "com", "paypal", StrategyId::Omission);
        let mut failed = VerificationResult::deadline_exceeded(candidate.clone());
        failed.reason = OutcomeReason::DnsQueryFailed;
        failed.dns = DnsOutcome::QueryFailed;
        failed.registry = RegistryOutcome::Unknown;

        let results = vec![VerificationResult::deadline_exceeded(candidate), failed];
        let counts = RunCounts::tally(1, 2, &results);

        assert_eq!(counts.indeterminate, 2);
        assert_eq!(counts.errored, 1);
        assert_eq!(counts.available, 0);
    }

    #[test]
    fn test_dedupe_targets_keeps_first() {
        let targets = vec![
            Target::manual("paypal").unwrap().with_velocity(3.0),
            Target::manual("PayPal.com").unwrap(),
        ];
        let deduped = dedupe_targets(targets);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].velocity, 3.0);
    }
}
