//! Report sinks for finished runs.
//!
//! Sinks are write-only. A failing sink is recorded on the run and never
//! changes its terminal state.

use crate::error::SquatWatchError;
use crate::pipeline::{PipelineRun, Stage, StageOutcome};
use crate::scoring::diversify;
use crate::types::Classification;
use serde::Serialize;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Environment variable GitHub Actions sets to the job summary file.
pub const GITHUB_SUMMARY_ENV: &str = "GITHUB_STEP_SUMMARY";

/// Destination for a finished run.
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &str;

    /// Write the run, returning the path written to, if any.
    fn write(&self, run: &PipelineRun) -> Result<Option<PathBuf>, SquatWatchError>;
}

/// Hand a finished run to every sink and record how each one did.
pub fn deliver(run: &mut PipelineRun, sinks: &[Arc<dyn ReportSink>]) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for sink in sinks {
        let outcome = match sink.write(run) {
            Ok(Some(path)) => {
                info!("{} report written to {}", sink.name(), path.display());
                written.push(path);
                StageOutcome::Ran { items: 1 }
            }
            Ok(None) => StageOutcome::RanEmpty,
            Err(e) => {
                warn!("{} report failed: {}", sink.name(), e);
                StageOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        run.record(Stage::Report, Some(sink.name()), outcome);
    }

    written
}

#[derive(Serialize)]
struct JsonReport<'a> {
    date: String,
    total_results: usize,
    #[serde(flatten)]
    run: &'a PipelineRun,
}

/// Writes the whole run as `<dir>/<YYYY-MM-DD>.json`.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Path the report for `run` goes to.
    pub fn path_for(&self, run: &PipelineRun) -> PathBuf {
        self.dir
            .join(format!("{}.json", run.started_at.format("%Y-%m-%d")))
    }
}

impl ReportSink for JsonReportSink {
    fn name(&self) -> &str {
        "json"
    }

    fn write(&self, run: &PipelineRun) -> Result<Option<PathBuf>, SquatWatchError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SquatWatchError::file_error(self.dir.to_string_lossy(), e.to_string())
        })?;

        let report = JsonReport {
            date: run.started_at.format("%Y-%m-%d").to_string(),
            total_results: run.results.len(),
            run,
        };
        let json = serde_json::to_string_pretty(&report)?;

        let path = self.path_for(run);
        fs::write(&path, json)
            .map_err(|e| SquatWatchError::file_error(path.to_string_lossy(), e.to_string()))?;
        Ok(Some(path))
    }
}

/// Appends a Markdown summary table, e.g. to a GitHub Actions job summary.
#[derive(Debug, Clone)]
pub struct MarkdownSummarySink {
    path: PathBuf,
    top: usize,
    max_per_brand: usize,
}

impl MarkdownSummarySink {
    pub fn new<P: Into<PathBuf>>(path: P, top: usize, max_per_brand: usize) -> Self {
        Self {
            path: path.into(),
            top,
            max_per_brand,
        }
    }

    /// A sink for `$GITHUB_STEP_SUMMARY`, if it is set.
    pub fn from_env(top: usize, max_per_brand: usize) -> Option<Self> {
        env::var_os(GITHUB_SUMMARY_ENV)
            .filter(|p| !p.is_empty())
            .map(|p| Self::new(p, top, max_per_brand))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for MarkdownSummarySink {
    fn name(&self) -> &str {
        "markdown"
    }

    fn write(&self, run: &PipelineRun) -> Result<Option<PathBuf>, SquatWatchError> {
        let markdown = render_markdown(run, self.top, self.max_per_brand);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| SquatWatchError::file_error(self.path.to_string_lossy(), e.to_string()))?;
        file.write_all(markdown.as_bytes())?;
        Ok(Some(self.path.clone()))
    }
}

/// Render the run as a Markdown section with a ranked table.
pub fn render_markdown(run: &PipelineRun, top: usize, max_per_brand: usize) -> String {
    let mut out = format!(
        "## squatwatch report {}\n\n",
        run.started_at.format("%Y-%m-%d")
    );

    if let Some(failure) = &run.failure {
        out.push_str(&format!("**Run failed:** {}\n\n", failure));
        return out;
    }

    let c = &run.counts;
    out.push_str(&format!(
        "{} targets, {} candidates checked: **{} available**, {} taken, {} indeterminate\n\n",
        c.targets, c.verified, c.available, c.taken, c.indeterminate
    ));

    if !run.ranked.is_empty() {
        out.push_str("| Rank | Domain | Brand | Strategy | Score |\n");
        out.push_str("|-----:|--------|-------|----------|------:|\n");
        for (i, scored) in diversify(&run.ranked, max_per_brand)
            .iter()
            .take(top)
            .enumerate()
        {
            let candidate = &scored.result.candidate;
            out.push_str(&format!(
                "| {} | `{}` | {} | {} | {:.1} |\n",
                i + 1,
                candidate.domain,
                candidate.target,
                candidate.strategy,
                scored.score
            ));
        }
    } else if c.available > 0 {
        out.push_str("| Domain | Brand | Strategy |\n");
        out.push_str("|--------|-------|----------|\n");
        for result in run.with_classification(Classification::Available).take(top) {
            let candidate = &result.candidate;
            out.push_str(&format!(
                "| `{}` | {} | {} |\n",
                candidate.domain, candidate.target, candidate.strategy
            ));
        }
    } else {
        out.push_str("_No available lookalike domains found._\n");
    }

    if c.indeterminate > 0 {
        out.push_str(&format!(
            "\n{} candidates could not be verified and are not listed as available.\n",
            c.indeterminate
        ));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineState, RunCounts};
    use crate::scoring::HeuristicScorer;
    use crate::types::{
        Candidate, DnsOutcome, OutcomeReason, RegistryOutcome, StrategyId, VerificationResult,
    };
    use chrono::Utc;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn result(label: &str, classification: Classification) -> VerificationResult {
        let (dns, registry, reason) = match classification {
            Classification::Available => (
                DnsOutcome::NoRecord,
                RegistryOutcome::NotRegistered,
                OutcomeReason::RegistryNotRegistered,
            ),
            Classification::Taken => (
                DnsOutcome::Resolves,
                RegistryOutcome::NotRun,
                OutcomeReason::DnsResolved,
            ),
            Classification::Indeterminate => (
                DnsOutcome::QueryFailed,
                RegistryOutcome::Unknown,
                OutcomeReason::DnsQueryFailed,
            ),
        };
        VerificationResult {
            candidate: Candidate::new(label, "com", "paypal", StrategyId::Omission),
            dns,
            registry,
            classification,
            reason,
            checked_at: Utc::now(),
            attempts: 0,
            duration: None,
            info: None,
        }
    }

    fn finished_run() -> PipelineRun {
        let mut run = PipelineRun::new();
        run.results = vec![
            result("paypl", Classification::Available),
            result("aypal", Classification::Available),
            result("paypa", Classification::Taken),
            result("papal", Classification::Indeterminate),
        ];
        run.counts = RunCounts::tally(1, 4, &run.results);
        run.ranked = HeuristicScorer::default().rank(&run.results, &HashMap::new(), &HashMap::new());
        run.state = PipelineState::Done;
        run
    }

    #[test]
    fn test_json_sink_writes_dated_file() {
        let dir = TempDir::new().unwrap();
        let sink = JsonReportSink::new(dir.path().join("reports"));
        let run = finished_run();

        let path = sink.write(&run).unwrap().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("{}.json", Utc::now().format("%Y-%m-%d"))
        );

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total_results"], 4);
        assert_eq!(json["state"], "done");
        assert_eq!(json["counts"]["available"], 2);
        assert_eq!(json["ranked"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_markdown_lists_ranked_and_mentions_indeterminate() {
        let run = finished_run();
        let md = render_markdown(&run, 10, 0);

        assert!(md.contains("| Rank | Domain |"));
        assert!(md.contains("`paypl.com`"));
        assert!(md.contains("`aypal.com`"));
        assert!(!md.contains("`paypa.com`"));
        assert!(md.contains("1 candidates could not be verified"));
    }

    #[test]
    fn test_markdown_respects_top_and_brand_cap() {
        let run = finished_run();
        let md = render_markdown(&run, 10, 1);
        assert_eq!(md.matches("| `").count(), 1);
    }

    #[test]
    fn test_markdown_failed_run() {
        let mut run = PipelineRun::new();
        run.state = PipelineState::Failed;
        run.failure = Some("Configuration error: no targets to protect".to_string());

        let md = render_markdown(&run, 10, 0);
        assert!(md.contains("**Run failed:**"));
        assert!(!md.contains("| Rank"));
    }

    #[test]
    fn test_markdown_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        fs::write(&path, "existing\n").unwrap();

        let sink = MarkdownSummarySink::new(&path, 5, 0);
        let run = finished_run();
        sink.write(&run).unwrap();
        sink.write(&run).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("existing\n"));
        assert_eq!(content.matches("## squatwatch report").count(), 2);
    }

    #[test]
    fn test_deliver_records_failures() {
        struct Broken;
        impl ReportSink for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            fn write(&self, _run: &PipelineRun) -> Result<Option<PathBuf>, SquatWatchError> {
                Err(SquatWatchError::file_error("/nowhere", "read-only"))
            }
        }

        let dir = TempDir::new().unwrap();
        let sinks: Vec<Arc<dyn ReportSink>> =
            vec![Arc::new(Broken), Arc::new(JsonReportSink::new(dir.path()))];
        let mut run = finished_run();

        let written = deliver(&mut run, &sinks);
        assert_eq!(written.len(), 1);
        assert_eq!(run.state, PipelineState::Done);

        let outcomes: Vec<_> = run.stage(Stage::Report).collect();
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].outcome, StageOutcome::Failed { .. }));
        assert_eq!(outcomes[1].outcome, StageOutcome::Ran { items: 1 });
    }
}
