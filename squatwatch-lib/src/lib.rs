//! # Squatwatch Library
//!
//! Finds unregistered lookalike domains of brands worth protecting.
//!
//! Targets come from a manual list or trend feeds. Each target is mutated
//! with typo strategies (omission, doubling, transposition, adjacent-key,
//! homoglyph, TLD swap) into candidate domains, which are verified with a DNS
//! probe followed by an authoritative RDAP lookup. Only candidates that DNS
//! cannot find *and* the registry reports as unregistered are classified as
//! available; anything uncertain is indeterminate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use squatwatch_lib::{AvailabilityChecker, Pipeline, PipelineSettings, VerificationConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let checker = Arc::new(AvailabilityChecker::new(VerificationConfig::default())?);
//!     let settings = PipelineSettings {
//!         targets: vec!["paypal".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let run = Pipeline::new(settings, checker).run().await;
//!     for scored in &run.ranked {
//!         println!("{} {:.1}", scored.result.candidate.domain, scored.score);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typo strategies**: pure functions selected by [`StrategyId`]
//! - **Two-phase verification**: DNS first, RDAP for everything DNS can't see
//! - **Shared rate limit**: one token bucket across all in-flight checks
//! - **Bootstrap Registry**: dynamic RDAP endpoint discovery
//! - **Optional enrichment**: trend feeds and an OpenAI-compatible model

// Re-export main public API types and functions
pub use candidates::{build as build_candidates, cap_per_target, canonical_order};
pub use checker::{classify, AvailabilityChecker};
pub use concurrent::{verify_all, RateLimiter};
pub use config::{
    load_env_config, parse_duration, parse_strategies, resolve_preset, validate_rps,
    ConfigManager, EnvConfig, FileConfig, Settings, MIN_REQUESTS_PER_SECOND,
};
pub use error::SquatWatchError;
pub use llm::{Enricher, LlmSettings, OpenAiClient};
pub use pipeline::{
    Pipeline, PipelineRun, PipelineSettings, PipelineState, Plan, RunCounts, Stage, StageOutcome,
    StageRecord,
};
pub use protocols::registry::{
    get_available_presets, get_preset_tlds, get_preset_tlds_with_custom, DEFAULT_TLDS,
};
pub use protocols::{DnsAnswer, DnsProbe, HickoryDnsProbe, RdapClient, RegistryAnswer, RegistryLookup};
pub use report::{deliver, render_markdown, JsonReportSink, MarkdownSummarySink, ReportSink};
pub use scoring::{
    diversify, BrandAssessment, HeuristicScorer, ScoreBreakdown, ScoredCandidate, ScoringWeights,
};
pub use trends::{
    GoogleTrendsSource, HackerNewsSource, TargetSource, TrendSignal, WatchlistSource,
};
pub use types::{
    Candidate, Classification, DnsOutcome, DomainInfo, OutcomeReason, RegistryOutcome,
    StrategyId, Target, VerificationConfig, VerificationResult,
};

// Public modules
pub mod mutate;

// Internal modules - these are not part of the public API
mod candidates;
mod checker;
mod concurrent;
mod config;
mod error;
mod llm;
mod pipeline;
mod protocols;
mod report;
mod scoring;
mod trends;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SquatWatchError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        features: get_enabled_features(),
    }
}

/// Information about the library build and features
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub features: Vec<&'static str>,
}

/// Get list of enabled features at compile time
#[allow(clippy::vec_init_then_push)]
fn get_enabled_features() -> Vec<&'static str> {
    let mut features = Vec::new();

    #[cfg(feature = "bootstrap")]
    features.push("bootstrap");

    features
}
