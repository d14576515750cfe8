//! Terminal display logic for the squatwatch CLI.
//!
//! Stage notes, the ranked table, summary bar and spinner. Uses only the
//! `console` crate. The spinner writes to stderr so stdout stays clean.

use console::{pad_str, style, Alignment, Term};
use squatwatch_lib::{
    diversify, get_available_presets, get_preset_tlds, Classification, OutcomeReason,
    PipelineRun, Plan, StageOutcome, StageRecord,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DOMAIN_WIDTH: usize = 30;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner on stderr.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    pub fn start(message: String) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

pub fn stderr_is_term() -> bool {
    Term::stderr().is_term()
}

// ── Presets ──────────────────────────────────────────────────────────────────

/// Print all available TLD presets with their TLDs.
pub fn print_presets() {
    use console::Style;

    let heading = Style::new().yellow().bold();
    let name_style = Style::new().green().bold();
    let count_style = Style::new().cyan();

    println!();
    println!("{}", heading.apply_to("Available TLD Presets:"));
    println!();

    for preset_name in get_available_presets() {
        if let Some(tlds) = get_preset_tlds(preset_name) {
            println!(
                "  {} {}  {}",
                name_style.apply_to(format!("{:<12}", preset_name)),
                count_style.apply_to(format!("({})", tlds.len())),
                tlds.join(", "),
            );
        }
    }

    println!();
    println!("Use: squatwatch scan --target <brand> --preset <preset>");
}

// ── Dry run ──────────────────────────────────────────────────────────────────

/// Print the targets and candidates a run would verify.
pub fn print_plan(plan: &Plan) {
    println!(
        "{} {}",
        style("squatwatch").bold(),
        style(format!(
            "dry run: {} target{}, {} candidate{}",
            plan.targets.len(),
            plural(plan.targets.len()),
            plan.candidates.len(),
            plural(plan.candidates.len())
        ))
        .dim(),
    );
    print_stage_notes(&plan.stages);
    println!();

    for target in &plan.targets {
        let candidates: Vec<_> = plan
            .candidates
            .iter()
            .filter(|c| c.target == target.normalized)
            .collect();
        section(&format!("{} ({})", target.normalized, candidates.len()), |s| {
            s.cyan()
        });
        for candidate in candidates {
            println!(
                "    {}  {}",
                pad_str(&candidate.domain, DOMAIN_WIDTH, Alignment::Left, Some("..")),
                style(candidate.strategy).dim(),
            );
        }
        println!();
    }
}

// ── Run ──────────────────────────────────────────────────────────────────────

/// Print a finished run: stage notes, the ranked table and a summary bar.
pub fn print_run(run: &PipelineRun, top: usize, max_per_brand: usize) {
    let c = &run.counts;
    println!(
        "{} {} {}",
        style("squatwatch").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "{} target{} | {} candidate{}",
            c.targets,
            plural(c.targets),
            c.candidates,
            plural(c.candidates)
        ))
        .dim(),
    );
    print_stage_notes(&run.stages);
    println!();

    if run.is_failed() {
        return;
    }

    if !run.ranked.is_empty() {
        let shown = diversify(&run.ranked, max_per_brand);
        let shown: Vec<_> = shown.iter().take(top).collect();
        section(&format!("Top candidates ({})", shown.len()), |s| s.green());
        for (i, scored) in shown.iter().enumerate() {
            let candidate = &scored.result.candidate;
            println!(
                "  {} {}  {}  {}  {}",
                style(format!("{:>3}.", i + 1)).dim(),
                style(pad_str(
                    &candidate.domain,
                    DOMAIN_WIDTH,
                    Alignment::Left,
                    Some("..")
                ))
                .white(),
                style(format!("{:>5.1}", scored.score)).green().bold(),
                pad_str(&candidate.target, 14, Alignment::Left, Some("..")),
                style(candidate.strategy).dim(),
            );
        }
        println!();
    } else if c.available > 0 {
        section(&format!("Available ({})", c.available), |s| s.green());
        for result in run.with_classification(Classification::Available).take(top) {
            println!(
                "    {}  {}",
                style(pad_str(
                    &result.candidate.domain,
                    DOMAIN_WIDTH,
                    Alignment::Left,
                    Some("..")
                ))
                .white(),
                style(result.candidate.strategy).dim(),
            );
        }
        println!();
    } else {
        println!("  {}", style("No available lookalike domains found.").dim());
        println!();
    }

    print_summary(run);
    print_indeterminate(run);
}

fn print_summary(run: &PipelineRun) {
    let c = &run.counts;
    let elapsed = run
        .finished_at
        .map(|end| (end - run.started_at).num_milliseconds().max(0) as f64 / 1000.0)
        .unwrap_or_default();

    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} checked in {:.1}s  {}  {}  {}  {}  {}  {}",
        style(c.verified).bold(),
        elapsed,
        style("|").dim(),
        style(format!("{} available", c.available)).green(),
        style("|").dim(),
        style(format!("{} taken", c.taken)).red(),
        style("|").dim(),
        style(format!("{} indeterminate", c.indeterminate)).yellow(),
    );
}

/// Break indeterminate results down by reason.
fn print_indeterminate(run: &PipelineRun) {
    let mut by_reason: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for result in run.with_classification(Classification::Indeterminate) {
        by_reason
            .entry(describe_reason(result.reason).to_string())
            .or_default()
            .push(&result.candidate.domain);
    }
    if by_reason.is_empty() {
        return;
    }

    println!();
    println!(
        "  {}",
        style("Some candidates could not be verified and are not listed:").yellow()
    );
    for (reason, domains) in &by_reason {
        println!(
            "  {} {} {}: {}",
            style("•").dim(),
            domains.len(),
            reason,
            format_list(domains, 5),
        );
    }
}

/// Report files written by the sinks.
pub fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("  {} {}", style("Report:").dim(), path.display());
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Skipped and failed stages, one dim or yellow line each.
fn print_stage_notes(stages: &[StageRecord]) {
    for record in stages {
        let label = match &record.detail {
            Some(detail) => format!("{} ({})", record.stage, detail),
            None => record.stage.to_string(),
        };
        match &record.outcome {
            StageOutcome::Skipped { reason } => {
                println!("{}", style(format!("{} skipped: {}", label, reason)).dim());
            }
            StageOutcome::Failed { error } => {
                println!("{}", style(format!("{} failed: {}", label, error)).yellow());
            }
            StageOutcome::Ran { .. } | StageOutcome::RanEmpty => {}
        }
    }
}

fn section<F>(title: &str, paint: F)
where
    F: Fn(console::StyledObject<String>) -> console::StyledObject<String>,
{
    let heading = format!("── {} ", title);
    let rule = "─".repeat(52usize.saturating_sub(heading.chars().count()));
    println!(
        "  {} {}",
        paint(style(heading)).bold(),
        paint(style(rule)).dim()
    );
}

fn describe_reason(reason: OutcomeReason) -> &'static str {
    match reason {
        OutcomeReason::DnsQueryFailed => "DNS lookup failed",
        OutcomeReason::RegistryUnknown => "registry gave no answer",
        OutcomeReason::DeadlineExceeded => "deadline exceeded",
        OutcomeReason::DnsResolved
        | OutcomeReason::RegistryRegistered
        | OutcomeReason::RegistryNotRegistered => "other",
    }
}

fn format_list(items: &[&str], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            items[..max_show].join(", "),
            items.len() - max_show
        )
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_list_truncates() {
        let items = ["a.com", "b.com", "c.com"];
        assert_eq!(format_list(&items, 5), "a.com, b.com, c.com");
        assert_eq!(format_list(&items, 2), "a.com, b.com, ... and 1 more");
    }

    #[test]
    fn test_describe_reason() {
        assert_eq!(
            describe_reason(OutcomeReason::DeadlineExceeded),
            "deadline exceeded"
        );
        assert_eq!(
            describe_reason(OutcomeReason::DnsQueryFailed),
            "DNS lookup failed"
        );
    }
}
