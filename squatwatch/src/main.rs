//! Squatwatch CLI Application
//!
//! Generates typosquat candidates for brands worth protecting and reports the
//! ones that are still unregistered. Thin wrapper around squatwatch-lib.

mod ui;

use anyhow::{bail, Context};
use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};
use squatwatch_lib::{
    deliver, load_env_config, parse_duration, parse_strategies, resolve_preset,
    AvailabilityChecker, ConfigManager, Enricher, GoogleTrendsSource, HackerNewsSource,
    HeuristicScorer, JsonReportSink, MarkdownSummarySink, OpenAiClient, Pipeline, ReportSink,
    Settings, TargetSource, WatchlistSource, MIN_REQUESTS_PER_SECOND,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const TREND_TIMEOUT: Duration = Duration::from_secs(10);

/// CLI arguments for squatwatch
#[derive(Parser, Debug)]
#[command(name = "squatwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find unregistered typosquat domains of brands worth protecting")]
#[command(
    long_about = "Generate typosquat candidates for brands and verify them with DNS then RDAP.\n\nOnly candidates that neither DNS nor the registry know about are reported as available."
)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate candidates, verify them and report the available ones
    Scan(ScanArgs),
    /// List all available TLD presets and exit
    ListPresets,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Brand or domain to protect (repeatable; skips trend sources)
    #[arg(long = "target", value_name = "TARGET", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Targets")]
    pub targets: Vec<String>,

    /// Candidate TLDs (comma-separated or multiple --tld flags)
    #[arg(short = 't', long = "tld", value_name = "TLD", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Targets")]
    pub tlds: Option<Vec<String>>,

    /// Use a predefined TLD preset (see `squatwatch list-presets`)
    #[arg(long = "preset", value_name = "NAME", help_heading = "Targets")]
    pub preset: Option<String>,

    /// Mutation strategies to enable (comma-separated)
    #[arg(short = 's', long = "strategy", value_name = "STRATEGY", value_delimiter = ',', action = clap::ArgAction::Append, help_heading = "Targets")]
    pub strategies: Option<Vec<String>>,

    /// Disable model-backed filtering, suggestions and suspicion scores
    #[arg(long = "no-llm", help_heading = "Targets")]
    pub no_llm: bool,

    /// Max concurrent verifications (1-100)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Verification")]
    pub concurrency: Option<usize>,

    /// Global request budget in requests per second
    #[arg(long = "rps", value_name = "RATE", help_heading = "Verification")]
    pub rps: Option<f64>,

    /// Overall verification deadline (e.g. "30s", "2m")
    #[arg(long = "deadline", value_name = "DURATION", help_heading = "Verification")]
    pub deadline: Option<String>,

    /// Write a dated JSON report into this directory
    #[arg(short = 'o', long = "output", value_name = "DIR", help_heading = "Output")]
    pub output: Option<PathBuf>,

    /// Number of ranked domains to show
    #[arg(long = "top", value_name = "N", help_heading = "Output")]
    pub top: Option<usize>,

    /// Max ranked domains shown per brand (0 = no limit)
    #[arg(long = "max-per-brand", value_name = "N", help_heading = "Output")]
    pub max_per_brand: Option<usize>,

    /// Print the whole run as JSON on stdout
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// Show targets and candidates without verifying anything
    #[arg(long = "dry-run", help_heading = "Output")]
    pub dry_run: bool,

    /// Use a specific config file instead of discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Log stage progress to stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Log per-request protocol detail to stderr
    #[arg(long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::ListPresets => {
            ui::print_presets();
            Ok(())
        }
        Command::Scan(args) => {
            init_logging(&args);
            run_scan(args).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &ScanArgs) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Validate command line arguments
fn validate_args(args: &ScanArgs) -> anyhow::Result<()> {
    if args.tlds.is_some() && args.preset.is_some() {
        bail!("Cannot specify both --tld and --preset");
    }

    if let Some(c) = args.concurrency {
        if c == 0 || c > 100 {
            bail!("Concurrency must be between 1 and 100");
        }
    }

    if let Some(rps) = args.rps {
        if !(rps >= MIN_REQUESTS_PER_SECOND && rps.is_finite()) {
            bail!("--rps must be at least {}", MIN_REQUESTS_PER_SECOND);
        }
    }

    if args.targets.iter().any(|t| t.trim().is_empty()) {
        bail!("--target must not be empty");
    }

    Ok(())
}

/// File config, then environment, then CLI flags.
fn resolve_settings(args: &ScanArgs) -> anyhow::Result<Settings> {
    let env_config = load_env_config();
    let explicit = args.config.clone().or_else(|| env_config.config.clone());

    let manager = ConfigManager::new(args.verbose || args.debug);
    let file = manager
        .discover_and_load(explicit.as_deref())
        .context("failed to load configuration")?;

    let mut settings = Settings::from_file(&file)?;
    settings.apply_env(&env_config);

    if let Some(preset) = &args.preset {
        settings.tlds = resolve_preset(preset, file.custom_presets.as_ref())?;
    } else if let Some(tlds) = &args.tlds {
        settings.tlds = tlds
            .iter()
            .map(|t| t.trim().trim_start_matches('.').to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if let Some(names) = &args.strategies {
        settings.strategies = parse_strategies(names)?;
    }
    if args.no_llm {
        settings.llm_enabled = false;
    }

    let mut verification = settings.verification.clone();
    if let Some(c) = args.concurrency {
        verification = verification.with_concurrency(c);
    }
    if let Some(rps) = args.rps {
        verification = verification.with_requests_per_second(Some(rps));
    }
    if let Some(raw) = &args.deadline {
        let deadline = parse_duration(raw).with_context(|| {
            format!("Invalid deadline '{}'. Use a format like '30s' or '2m'", raw)
        })?;
        verification = verification.with_deadline(Some(deadline));
    }
    settings.verification = verification;

    if let Some(dir) = &args.output {
        settings.report_dir = Some(dir.clone());
    }
    settings.top = args.top.unwrap_or(settings.top);
    settings.max_per_brand = args.max_per_brand.unwrap_or(settings.max_per_brand);

    Ok(settings)
}

fn build_sources(args: &ScanArgs, settings: &Settings) -> anyhow::Result<Vec<Arc<dyn TargetSource>>> {
    let mut sources: Vec<Arc<dyn TargetSource>> = Vec::new();
    if !args.targets.is_empty() {
        return Ok(sources);
    }

    if !settings.watchlist.is_empty() {
        sources.push(Arc::new(WatchlistSource::new(&settings.watchlist)));
    }
    if settings.hackernews {
        sources.push(Arc::new(HackerNewsSource::new(
            settings.max_stories,
            TREND_TIMEOUT,
        )?));
    }
    if settings.google_trends {
        sources.push(Arc::new(GoogleTrendsSource::new(
            settings.geo.clone(),
            settings.max_searches,
            TREND_TIMEOUT,
        )?));
    }
    Ok(sources)
}

fn build_enricher(settings: &Settings) -> Option<Arc<dyn Enricher>> {
    if !settings.llm_enabled {
        return None;
    }
    match OpenAiClient::from_env(settings.llm.clone()) {
        Ok(client) => Some(Arc::new(client) as Arc<dyn Enricher>),
        Err(e) => {
            warn!("Enrichment disabled: {}", e);
            None
        }
    }
}

fn build_sinks(settings: &Settings) -> Vec<Arc<dyn ReportSink>> {
    let mut sinks: Vec<Arc<dyn ReportSink>> = Vec::new();
    if let Some(dir) = &settings.report_dir {
        sinks.push(Arc::new(JsonReportSink::new(dir)));
    }
    if settings.github_summary {
        if let Some(sink) = MarkdownSummarySink::from_env(settings.top, settings.max_per_brand) {
            debug!("Appending summary to {}", sink.path().display());
            sinks.push(Arc::new(sink));
        }
    }
    sinks
}

/// Main scan logic
async fn run_scan(args: ScanArgs) -> anyhow::Result<()> {
    validate_args(&args)?;
    let settings = resolve_settings(&args)?;

    let checker = Arc::new(AvailabilityChecker::new(settings.verification.clone())?);
    let mut pipeline = Pipeline::new(settings.pipeline_settings(args.targets.clone()), checker)
        .with_scorer(HeuristicScorer::new(settings.weights.clone()))
        .with_enricher(build_enricher(&settings));
    for source in build_sources(&args, &settings)? {
        pipeline = pipeline.with_source(source);
    }

    if args.dry_run {
        let plan = pipeline.plan().await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            ui::print_plan(&plan);
        }
        return Ok(());
    }

    let quiet = args.json || args.verbose || args.debug;
    let spinner = (!quiet && ui::stderr_is_term())
        .then(|| ui::Spinner::start("Scanning for lookalike domains...".to_string()));
    let mut run = pipeline.run().await;
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    let written = deliver(&mut run, &build_sinks(&settings));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        ui::print_run(&run, settings.top, settings.max_per_brand);
        ui::print_written(&written);
    }

    if let Some(failure) = &run.failure {
        bail!("run failed: {}", failure);
    }
    Ok(())
}
