//! Core data types for typosquat discovery.
//!
//! This module defines the data flowing through the pipeline: targets,
//! generated candidates, verification outcomes and the configuration that
//! drives verification.

use crate::error::SquatWatchError;
use crate::utils::{normalize_label, normalize_tld, similarity, split_target, MAX_LABEL_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A brand or keyword to protect.
///
/// Immutable once created. The normalized label is what mutations run on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Text as supplied by the user or the trend feed
    pub raw: String,

    /// Lowercase label containing only letters, digits and hyphens
    pub normalized: String,

    /// TLD of the raw text when it was given as a domain (e.g. "paypal.com")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_tld: Option<String>,

    /// Where the target came from ("manual", "hackernews", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Relative trend strength, used by the heuristic scorer
    pub velocity: f64,
}

impl Target {
    /// Create a target from raw text and an optional source tag.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` if nothing usable remains after normalization.
    pub fn new<S: Into<String>>(raw: &str, source: Option<S>) -> Result<Self, SquatWatchError> {
        let (label, tld) = split_target(raw);
        let normalized = normalize_label(&label);

        Self::from_parts(raw, normalized, tld, source.map(Into::into))
    }

    /// Create a target from a trend keyword.
    ///
    /// Unlike [`Target::new`] this never treats the text as a domain, so
    /// names like "Node.js" become `nodejs`.
    pub fn from_keyword<S: Into<String>>(raw: &str, source: Option<S>) -> Result<Self, SquatWatchError> {
        let normalized = normalize_label(&raw.replace('.', ""));
        Self::from_parts(raw, normalized, None, source.map(Into::into))
    }

    fn from_parts(
        raw: &str,
        normalized: String,
        original_tld: Option<String>,
        source: Option<String>,
    ) -> Result<Self, SquatWatchError> {
        if normalized.is_empty() {
            return Err(SquatWatchError::invalid_target(
                raw,
                "no letters or digits after normalization",
            ));
        }

        if normalized.len() > MAX_LABEL_LEN {
            return Err(SquatWatchError::invalid_target(
                raw,
                format!("label longer than {} characters", MAX_LABEL_LEN),
            ));
        }

        Ok(Self {
            raw: raw.trim().to_string(),
            normalized,
            original_tld,
            source,
            velocity: 1.0,
        })
    }

    /// Create a manually supplied target.
    pub fn manual(raw: &str) -> Result<Self, SquatWatchError> {
        let mut target = Self::new(raw, Some("manual"))?;
        target.velocity = 2.0;
        Ok(target)
    }

    /// Set the trend velocity.
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity.max(0.0);
        self
    }

    /// The domain this target itself lives on, if it was given as one.
    pub fn original_domain(&self) -> Option<String> {
        self.original_tld
            .as_ref()
            .map(|tld| format!("{}.{}", self.normalized, tld))
    }
}

/// Identifier of the strategy that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    Omission,
    Doubling,
    Transposition,
    AdjacentKey,
    Homoglyph,
    TldSwap,
    LlmSuggested,
}

impl StrategyId {
    /// The six algorithmic strategies in canonical order.
    pub const ALGORITHMIC: [StrategyId; 6] = [
        StrategyId::Omission,
        StrategyId::Doubling,
        StrategyId::Transposition,
        StrategyId::AdjacentKey,
        StrategyId::Homoglyph,
        StrategyId::TldSwap,
    ];

    /// How likely a real person is to produce this kind of typo (0.0-1.0).
    pub fn plausibility(self) -> f64 {
        match self {
            StrategyId::Transposition => 0.85,
            StrategyId::Omission => 0.8,
            StrategyId::AdjacentKey => 0.7,
            StrategyId::LlmSuggested => 0.65,
            StrategyId::Doubling => 0.6,
            StrategyId::Homoglyph => 0.5,
            StrategyId::TldSwap => 0.4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyId::Omission => "omission",
            StrategyId::Doubling => "doubling",
            StrategyId::Transposition => "transposition",
            StrategyId::AdjacentKey => "adjacent-key",
            StrategyId::Homoglyph => "homoglyph",
            StrategyId::TldSwap => "tld-swap",
            StrategyId::LlmSuggested => "llm-suggested",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = SquatWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "omission" => Ok(StrategyId::Omission),
            "doubling" => Ok(StrategyId::Doubling),
            "transposition" | "swap" => Ok(StrategyId::Transposition),
            "adjacent-key" | "adjacent" => Ok(StrategyId::AdjacentKey),
            "homoglyph" => Ok(StrategyId::Homoglyph),
            "tld-swap" | "tld" => Ok(StrategyId::TldSwap),
            "llm-suggested" | "llm" => Ok(StrategyId::LlmSuggested),
            other => Err(SquatWatchError::config(format!(
                "Unknown strategy '{}'. Valid: omission, doubling, transposition, adjacent-key, homoglyph, tld-swap",
                other
            ))),
        }
    }
}

/// A generated domain name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Fully-qualified domain (label + "." + tld)
    pub domain: String,

    /// Label portion of the domain
    pub label: String,

    /// Top-level domain, without the leading dot
    pub tld: String,

    /// Normalized label of the originating target
    pub target: String,

    /// Strategy that produced this candidate first
    pub strategy: StrategyId,

    /// Structural similarity of the label to the target (0.0-1.0)
    pub similarity: f64,
}

impl Candidate {
    /// Build a candidate from a label/TLD pair.
    pub fn new(label: &str, tld: &str, target: &str, strategy: StrategyId) -> Self {
        let tld = normalize_tld(tld);
        Self {
            domain: format!("{}.{}", label, tld),
            label: label.to_string(),
            tld,
            target: target.to_string(),
            strategy,
            similarity: similarity(label, target),
        }
    }

    /// Plausibility weight of the generating strategy.
    pub fn plausibility(&self) -> f64 {
        self.strategy.plausibility()
    }
}

/// Outcome of the DNS existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DnsOutcome {
    /// At least one address or mail record exists
    Resolves,
    /// The resolver affirmatively reported no such record
    NoRecord,
    /// Retries exhausted or the answer was unusable
    QueryFailed,
    /// The probe never ran (deadline)
    NotRun,
}

/// Outcome of the authoritative registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryOutcome {
    Registered,
    NotRegistered,
    /// Query failed, rate limited past the retry budget, or malformed data
    Unknown,
    /// Skipped because DNS already proved the domain taken, or the deadline hit
    NotRun,
}

/// Final classification of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Available,
    Taken,
    /// Could not verify. Never to be treated as available.
    Indeterminate,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Available => write!(f, "available"),
            Classification::Taken => write!(f, "taken"),
            Classification::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Why a candidate ended up with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeReason {
    DnsResolved,
    RegistryRegistered,
    RegistryNotRegistered,
    DnsQueryFailed,
    RegistryUnknown,
    DeadlineExceeded,
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutcomeReason::DnsResolved => "dns-resolved",
            OutcomeReason::RegistryRegistered => "registry-registered",
            OutcomeReason::RegistryNotRegistered => "registry-not-registered",
            OutcomeReason::DnsQueryFailed => "dns-query-failed",
            OutcomeReason::RegistryUnknown => "registry-unknown",
            OutcomeReason::DeadlineExceeded => "deadline-exceeded",
        };
        f.write_str(s)
    }
}

/// Detailed information about a registered domain.
///
/// Extracted from RDAP responses for taken domains.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DomainInfo {
    /// The registrar that manages this domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,

    /// When the domain was first registered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,

    /// When the domain registration expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,

    /// Domain status codes (e.g., "client transfer prohibited")
    pub status: Vec<String>,

    /// Last update date of the domain record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,

    /// Nameservers associated with the domain
    pub nameservers: Vec<String>,
}

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub candidate: Candidate,
    pub dns: DnsOutcome,
    pub registry: RegistryOutcome,
    pub classification: Classification,
    pub reason: OutcomeReason,

    /// When the classification was reached
    pub checked_at: DateTime<Utc>,

    /// Retry attempts consumed across both phases
    pub attempts: u32,

    /// How long the check took
    #[serde(skip)]
    pub duration: Option<Duration>,

    /// Registration details when the registry reported the domain taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<DomainInfo>,
}

impl VerificationResult {
    /// Result for a candidate that was never started because the deadline passed.
    pub fn deadline_exceeded(candidate: Candidate) -> Self {
        Self {
            candidate,
            dns: DnsOutcome::NotRun,
            registry: RegistryOutcome::NotRun,
            classification: Classification::Indeterminate,
            reason: OutcomeReason::DeadlineExceeded,
            checked_at: Utc::now(),
            attempts: 0,
            duration: None,
            info: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.classification == Classification::Available
    }
}

/// Configuration for the availability checker and verification scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Retries allowed per phase after the first attempt
    /// Default: 2
    pub max_retries: u32,

    /// Base delay for exponential backoff
    /// Default: 250ms
    #[serde(skip)]
    pub backoff_base: Duration,

    /// Upper bound on a single backoff delay
    /// Default: 8 seconds
    #[serde(skip)]
    pub backoff_cap: Duration,

    /// Upper bound on a provider's retry-after hint we are willing to honor
    /// Default: 60 seconds
    #[serde(skip)]
    pub max_retry_after: Duration,

    /// Maximum number of candidates checked concurrently
    /// Default: 10, Range: 1-100
    pub max_concurrency: usize,

    /// Global outbound request budget shared by all checks. `None` disables it.
    /// Default: 5 requests/second
    pub max_requests_per_second: Option<f64>,

    /// Overall verification deadline. `None` means no deadline.
    #[serde(skip)]
    pub deadline: Option<Duration>,

    /// Timeout for a single DNS query
    /// Default: 3 seconds
    #[serde(skip)]
    pub dns_timeout: Duration,

    /// Timeout for a single RDAP request
    /// Default: 5 seconds
    #[serde(skip)]
    pub rdap_timeout: Duration,

    /// Whether to use the IANA bootstrap registry for unknown TLDs
    /// Default: true
    pub use_bootstrap: bool,
}

impl Default for VerificationConfig {
    /// Conservative defaults that keep well under public RDAP rate limits.
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(8),
            max_retry_after: Duration::from_secs(60),
            max_concurrency: 10,
            max_requests_per_second: Some(5.0),
            deadline: None,
            dns_timeout: Duration::from_secs(3),
            rdap_timeout: Duration::from_secs(5),
            use_bootstrap: true,
        }
    }
}

impl VerificationConfig {
    /// Set concurrency, capped at 100 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.max_concurrency = concurrency.clamp(1, 100);
        self
    }

    /// Set the retry budget per phase.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff base and cap.
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap.max(base);
        self
    }

    /// Set the global request budget. Non-positive values disable limiting.
    pub fn with_requests_per_second(mut self, rps: Option<f64>) -> Self {
        self.max_requests_per_second = rps.filter(|r| *r > 0.0);
        self
    }

    /// Set the overall verification deadline.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Enable or disable IANA bootstrap.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.use_bootstrap = enabled;
        self
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_cap)
    }

    /// Delay before retrying a rate-limited request.
    ///
    /// Honors the provider hint (bounded by `max_retry_after`) and never waits
    /// less than the regular backoff.
    pub fn rate_limit_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff_delay(attempt);
        match hint {
            Some(hint) => hint.min(self.max_retry_after).max(backoff),
            None => backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_normalization() {
        let target = Target::new("Pay Pal!", Some("hackernews")).unwrap();
        assert_eq!(target.normalized, "paypal");
        assert_eq!(target.source.as_deref(), Some("hackernews"));
        assert!(target.original_tld.is_none());

        let target = Target::manual("PayPal.com").unwrap();
        assert_eq!(target.normalized, "paypal");
        assert_eq!(target.original_tld.as_deref(), Some("com"));
        assert_eq!(target.original_domain().as_deref(), Some("paypal.com"));
    }

    #[test]
    fn test_target_rejects_empty() {
        assert!(Target::manual("   ").is_err());
        assert!(Target::manual("!!!").is_err());
        assert!(Target::manual(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_keyword_targets_ignore_dots() {
        let target = Target::from_keyword("Node.js", Some("hackernews")).unwrap();
        assert_eq!(target.normalized, "nodejs");
        assert!(target.original_tld.is_none());
    }

    #[test]
    fn test_strategy_round_trip_names() {
        for strategy in StrategyId::ALGORITHMIC {
            assert_eq!(strategy.as_str().parse::<StrategyId>().unwrap(), strategy);
        }
        assert_eq!("adjacent_key".parse::<StrategyId>().unwrap(), StrategyId::AdjacentKey);
        assert!("bogus".parse::<StrategyId>().is_err());
    }

    #[test]
    fn test_strategy_serializes_kebab_case() {
        let json = serde_json::to_string(&StrategyId::AdjacentKey).unwrap();
        assert_eq!(json, "\"adjacent-key\"");
        let json = serde_json::to_string(&OutcomeReason::DeadlineExceeded).unwrap();
        assert_eq!(json, "\"deadline-exceeded\"");
    }

    #[test]
    fn test_candidate_similarity() {
        let candidate = Candidate::new("exampl", ".COM", "example", StrategyId::Omission);
        assert_eq!(candidate.domain, "exampl.com");
        assert_eq!(candidate.tld, "com");
        assert!(candidate.similarity > 0.8 && candidate.similarity < 1.0);
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config = VerificationConfig::default()
            .with_backoff(Duration::from_millis(100), Duration::from_millis(700));
        assert_eq!(config.backoff_delay(0), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(700));
        assert_eq!(config.backoff_delay(40), Duration::from_millis(700));
    }

    #[test]
    fn test_rate_limit_delay_honors_hint() {
        let config = VerificationConfig::default()
            .with_backoff(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(
            config.rate_limit_delay(0, Some(Duration::from_secs(3))),
            Duration::from_secs(3)
        );
        assert_eq!(
            config.rate_limit_delay(0, Some(Duration::from_secs(3600))),
            config.max_retry_after
        );
        assert_eq!(config.rate_limit_delay(1, None), Duration::from_millis(200));
    }

    #[test]
    fn test_config_builders_clamp() {
        let config = VerificationConfig::default()
            .with_concurrency(0)
            .with_requests_per_second(Some(0.0));
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_requests_per_second, None);
        assert_eq!(VerificationConfig::default().with_concurrency(500).max_concurrency, 100);
    }
}
