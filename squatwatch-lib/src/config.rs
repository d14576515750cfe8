//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files, merging
//! configurations with proper precedence rules, applying `SW_*` environment
//! overrides and resolving everything into [`Settings`].

use crate::error::SquatWatchError;
use crate::llm::LlmSettings;
use crate::pipeline::PipelineSettings;
use crate::protocols::registry::{get_preset_tlds_with_custom, DEFAULT_TLDS};
use crate::scoring::ScoringWeights;
use crate::types::{StrategyId, VerificationConfig};
use crate::utils::normalize_tlds;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<GenerationSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<TrendsSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportSection>,

    /// User-defined TLD presets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_presets: Option<HashMap<String, Vec<String>>>,
}

/// `[verification]`: retry, rate and deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VerificationSection {
    pub concurrency: Option<usize>,
    pub requests_per_second: Option<f64>,
    pub max_retries: Option<u32>,
    /// Duration strings such as "250ms", "5s", "2m"
    pub backoff_base: Option<String>,
    pub backoff_cap: Option<String>,
    pub max_retry_after: Option<String>,
    pub deadline: Option<String>,
    pub dns_timeout: Option<String>,
    pub rdap_timeout: Option<String>,
    pub bootstrap: Option<bool>,
}

/// `[generation]`: what to mutate and where.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSection {
    pub strategies: Option<Vec<String>>,
    pub preset: Option<String>,
    pub tlds: Option<Vec<String>>,
    pub max_targets: Option<usize>,
    pub max_candidates_per_target: Option<usize>,
}

/// `[scoring]`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScoringSection {
    pub enabled: Option<bool>,
    pub top: Option<usize>,
    pub max_per_brand: Option<usize>,
    pub suspicion_top_n: Option<usize>,
    pub weights: Option<ScoringWeights>,
}

/// `[llm]`; the API key itself only comes from the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LlmSection {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub filter_model: Option<String>,
    pub suggest_model: Option<String>,
    pub score_model: Option<String>,
    pub timeout: Option<String>,
    pub max_suggestions: Option<usize>,
}

/// `[trends]`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TrendsSection {
    pub hackernews: Option<bool>,
    pub max_stories: Option<usize>,
    pub google_trends: Option<bool>,
    /// Country code for Google Trends ("US", "GB")
    pub geo: Option<String>,
    pub max_searches: Option<usize>,
    /// Brands that are always checked alongside trending ones
    pub watchlist: Option<Vec<String>>,
}

/// `[report]`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReportSection {
    pub dir: Option<String>,
    pub github_summary: Option<bool>,
}

/// Copy every field `higher` sets over `lower`.
macro_rules! overlay {
    ($lower:expr, $higher:expr; $($field:ident),+ $(,)?) => {
        $(
            if $higher.$field.is_some() {
                $lower.$field = $higher.$field;
            }
        )+
    };
}

/// Merge two optional sections field by field.
fn merge_section<T, F>(lower: Option<T>, higher: Option<T>, merge: F) -> Option<T>
where
    F: FnOnce(&mut T, T),
{
    match (lower, higher) {
        (Some(mut lower), Some(higher)) => {
            merge(&mut lower, higher);
            Some(lower)
        }
        (None, higher) => higher,
        (lower, None) => lower,
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report every file that was loaded
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `FileError` if the file is missing or unreadable, `ConfigError` if it
    /// does not parse or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SquatWatchError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SquatWatchError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SquatWatchError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            SquatWatchError::config(format!(
                "Failed to parse {}: {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG, then global, then local; an explicit path wins over all of them.
    /// Broken discovered files are skipped with a warning; a broken explicit
    /// file is an error.
    pub fn discover_and_load(&self, explicit: Option<&Path>) -> Result<FileConfig, SquatWatchError> {
        let mut merged = FileConfig::default();
        let mut loaded: Vec<PathBuf> = Vec::new();

        let discovered = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in discovered.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged = self.merge_configs(merged, config);
                    loaded.push(path);
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }

        if let Some(path) = explicit {
            let config = self.load_file(path)?;
            merged = self.merge_configs(merged, config);
            loaded.push(path.to_path_buf());
        }

        if self.verbose {
            for path in &loaded {
                debug!("Loaded configuration from {}", path.display());
            }
        }

        Ok(merged)
    }

    /// `./squatwatch.toml` or `./.squatwatch.toml`
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./squatwatch.toml", "./.squatwatch.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    /// `~/.squatwatch.toml` or `~/squatwatch.toml`
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".squatwatch.toml", "squatwatch.toml"]
            .iter()
            .map(|name| Path::new(&home).join(name))
            .find(|p| p.exists())
    }

    /// `$XDG_CONFIG_HOME/squatwatch/config.toml`
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("squatwatch").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` take precedence.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            verification: merge_section(lower.verification, higher.verification, |l, h| {
                overlay!(l, h; concurrency, requests_per_second, max_retries, backoff_base,
                    backoff_cap, max_retry_after, deadline, dns_timeout, rdap_timeout, bootstrap);
            }),
            generation: merge_section(lower.generation, higher.generation, |l, h| {
                overlay!(l, h; strategies, preset, tlds, max_targets, max_candidates_per_target);
            }),
            scoring: merge_section(lower.scoring, higher.scoring, |l, h| {
                overlay!(l, h; enabled, top, max_per_brand, suspicion_top_n, weights);
            }),
            llm: merge_section(lower.llm, higher.llm, |l, h| {
                overlay!(l, h; enabled, base_url, filter_model, suggest_model, score_model,
                    timeout, max_suggestions);
            }),
            trends: merge_section(lower.trends, higher.trends, |l, h| {
                overlay!(l, h; hackernews, max_stories, google_trends, geo, max_searches, watchlist);
            }),
            report: merge_section(lower.report, higher.report, |l, h| {
                overlay!(l, h; dir, github_summary);
            }),
            custom_presets: merge_section(lower.custom_presets, higher.custom_presets, |l, h| {
                l.extend(h);
            }),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), SquatWatchError> {
        if let Some(v) = &config.verification {
            if let Some(concurrency) = v.concurrency {
                validate_concurrency(concurrency)?;
            }
            if let Some(rps) = v.requests_per_second {
                validate_rps(rps)?;
            }
            for (key, value) in [
                ("backoff_base", &v.backoff_base),
                ("backoff_cap", &v.backoff_cap),
                ("max_retry_after", &v.max_retry_after),
                ("deadline", &v.deadline),
                ("dns_timeout", &v.dns_timeout),
                ("rdap_timeout", &v.rdap_timeout),
            ] {
                if let Some(value) = value {
                    parse_duration_field(key, value)?;
                }
            }
        }

        if let Some(g) = &config.generation {
            if let Some(strategies) = &g.strategies {
                parse_strategies(strategies)?;
            }
            if g.preset.is_some() && g.tlds.is_some() {
                return Err(SquatWatchError::config(
                    "Cannot specify both 'preset' and 'tlds' in [generation]",
                ));
            }
            if let Some(tlds) = &g.tlds {
                validate_tlds(tlds, "[generation] tlds")?;
            }
            if g.max_targets == Some(0) || g.max_candidates_per_target == Some(0) {
                return Err(SquatWatchError::config(
                    "max_targets and max_candidates_per_target must be at least 1",
                ));
            }
        }

        if let Some(timeout) = config.llm.as_ref().and_then(|l| l.timeout.as_ref()) {
            parse_duration_field("llm.timeout", timeout)?;
        }

        if let Some(presets) = &config.custom_presets {
            for (name, tlds) in presets {
                if name.is_empty() {
                    return Err(SquatWatchError::config("Custom preset names cannot be empty"));
                }
                if tlds.is_empty() {
                    return Err(SquatWatchError::config(format!(
                        "Custom preset '{}' cannot have empty TLD list",
                        name
                    )));
                }
                validate_tlds(tlds, &format!("preset '{}'", name))?;
            }
        }

        Ok(())
    }
}

fn validate_concurrency(concurrency: usize) -> Result<(), SquatWatchError> {
    if concurrency == 0 || concurrency > 100 {
        return Err(SquatWatchError::config("Concurrency must be between 1 and 100"));
    }
    Ok(())
}

/// Slowest accepted request rate: one request every ~16 minutes.
pub const MIN_REQUESTS_PER_SECOND: f64 = 0.001;

pub fn validate_rps(rps: f64) -> Result<(), SquatWatchError> {
    if !(rps >= MIN_REQUESTS_PER_SECOND && rps.is_finite()) {
        return Err(SquatWatchError::config(format!(
            "Requests per second must be a number of at least {}, got {}",
            MIN_REQUESTS_PER_SECOND, rps
        )));
    }
    Ok(())
}

fn validate_tlds(tlds: &[String], context: &str) -> Result<(), SquatWatchError> {
    for tld in tlds {
        let tld = tld.trim().trim_start_matches('.');
        if tld.is_empty() || tld.contains('.') || tld.contains(' ') {
            return Err(SquatWatchError::config(format!(
                "Invalid TLD '{}' in {}",
                tld, context
            )));
        }
    }
    Ok(())
}

fn parse_duration_field(key: &str, value: &str) -> Result<Duration, SquatWatchError> {
    parse_duration(value).ok_or_else(|| {
        SquatWatchError::config(format!(
            "Invalid duration '{}' for {}. Use a format like '500ms', '5s', '2m'",
            value, key
        ))
    })
}

/// Parse strategy names, rejecting unknown ones.
pub fn parse_strategies<S: AsRef<str>>(names: &[S]) -> Result<Vec<StrategyId>, SquatWatchError> {
    names.iter().map(|n| n.as_ref().parse()).collect()
}

/// Longest accepted duration (one year).
const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Parse a duration like "500ms", "5s" or "2m". Bare numbers are seconds.
///
/// Anything longer than a year is rejected.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let s = input.trim().to_lowercase();

    let duration = if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }?;

    (duration.as_secs() <= MAX_DURATION_SECS).then_some(duration)
}

/// `SW_*` environment overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub tlds: Option<Vec<String>>,
    pub strategies: Option<Vec<StrategyId>>,
    pub concurrency: Option<usize>,
    pub requests_per_second: Option<f64>,
    pub max_retries: Option<u32>,
    pub deadline: Option<Duration>,
    pub llm: Option<bool>,
    pub config: Option<PathBuf>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load overrides from `SW_*` environment variables.
///
/// Invalid values are logged and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`] with a custom variable lookup.
pub fn load_env_from<F>(get: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = get("SW_TLD") {
        let tlds = split_list(&val);
        if !tlds.is_empty() {
            env_config.tlds = Some(tlds);
        }
    }

    if let Some(val) = get("SW_STRATEGIES") {
        match parse_strategies(&split_list(&val)) {
            Ok(strategies) if !strategies.is_empty() => env_config.strategies = Some(strategies),
            Ok(_) => {}
            Err(e) => warn!("Invalid SW_STRATEGIES='{}': {}", val, e),
        }
    }

    if let Some(val) = get("SW_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(c) if validate_concurrency(c).is_ok() => env_config.concurrency = Some(c),
            _ => warn!("Invalid SW_CONCURRENCY='{}', must be 1-100", val),
        }
    }

    if let Some(val) = get("SW_RPS") {
        match val.trim().parse::<f64>() {
            Ok(rps) if validate_rps(rps).is_ok() => env_config.requests_per_second = Some(rps),
            _ => warn!(
                "Invalid SW_RPS='{}', must be at least {}",
                val, MIN_REQUESTS_PER_SECOND
            ),
        }
    }

    if let Some(val) = get("SW_MAX_RETRIES") {
        match val.trim().parse::<u32>() {
            Ok(n) => env_config.max_retries = Some(n),
            Err(_) => warn!("Invalid SW_MAX_RETRIES='{}'", val),
        }
    }

    if let Some(val) = get("SW_DEADLINE") {
        match parse_duration(&val) {
            Some(d) => env_config.deadline = Some(d),
            None => warn!("Invalid SW_DEADLINE='{}', use a format like '30s', '2m'", val),
        }
    }

    if let Some(val) = get("SW_LLM") {
        match parse_bool(&val) {
            Some(b) => env_config.llm = Some(b),
            None => warn!("Invalid SW_LLM='{}', use true/false", val),
        }
    }

    if let Some(val) = get("SW_CONFIG") {
        if !val.trim().is_empty() {
            env_config.config = Some(PathBuf::from(val.trim()));
        }
    }

    env_config
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub verification: VerificationConfig,
    pub strategies: Vec<StrategyId>,
    pub tlds: Vec<String>,
    pub max_targets: usize,
    pub max_candidates_per_target: usize,
    pub scoring: bool,
    pub top: usize,
    pub max_per_brand: usize,
    pub suspicion_top_n: usize,
    pub weights: ScoringWeights,
    pub llm_enabled: bool,
    pub llm: LlmSettings,
    pub hackernews: bool,
    pub max_stories: usize,
    pub google_trends: bool,
    pub geo: String,
    pub max_searches: usize,
    pub watchlist: Vec<String>,
    pub report_dir: Option<PathBuf>,
    pub github_summary: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let pipeline = PipelineSettings::default();
        Self {
            verification: VerificationConfig::default(),
            strategies: pipeline.strategies,
            tlds: pipeline.tlds,
            max_targets: pipeline.max_targets,
            max_candidates_per_target: pipeline.max_candidates_per_target,
            scoring: pipeline.scoring,
            top: 20,
            max_per_brand: 3,
            suspicion_top_n: pipeline.suspicion_top_n,
            weights: ScoringWeights::default(),
            llm_enabled: pipeline.enrichment,
            llm: LlmSettings::default(),
            hackernews: true,
            max_stories: 60,
            google_trends: true,
            geo: "US".to_string(),
            max_searches: 20,
            watchlist: Vec::new(),
            report_dir: None,
            github_summary: true,
        }
    }
}

impl Settings {
    /// Resolve file configuration on top of the defaults.
    pub fn from_file(file: &FileConfig) -> Result<Self, SquatWatchError> {
        let mut s = Settings::default();

        if let Some(v) = &file.verification {
            let mut cfg = s.verification.clone();
            if let Some(c) = v.concurrency {
                cfg = cfg.with_concurrency(c);
            }
            if let Some(rps) = v.requests_per_second {
                cfg = cfg.with_requests_per_second(Some(rps));
            }
            if let Some(n) = v.max_retries {
                cfg = cfg.with_max_retries(n);
            }
            let base = opt_duration("backoff_base", &v.backoff_base)?.unwrap_or(cfg.backoff_base);
            let cap = opt_duration("backoff_cap", &v.backoff_cap)?.unwrap_or(cfg.backoff_cap);
            cfg = cfg.with_backoff(base, cap);
            if let Some(d) = opt_duration("max_retry_after", &v.max_retry_after)? {
                cfg.max_retry_after = d;
            }
            if let Some(d) = opt_duration("deadline", &v.deadline)? {
                cfg = cfg.with_deadline(Some(d));
            }
            if let Some(d) = opt_duration("dns_timeout", &v.dns_timeout)? {
                cfg.dns_timeout = d;
            }
            if let Some(d) = opt_duration("rdap_timeout", &v.rdap_timeout)? {
                cfg.rdap_timeout = d;
            }
            if let Some(b) = v.bootstrap {
                cfg = cfg.with_bootstrap(b);
            }
            s.verification = cfg;
        }

        if let Some(g) = &file.generation {
            if let Some(names) = &g.strategies {
                s.strategies = parse_strategies(names)?;
            }
            if let Some(preset) = &g.preset {
                s.tlds = resolve_preset(preset, file.custom_presets.as_ref())?;
            } else if let Some(tlds) = &g.tlds {
                s.tlds = normalize_tlds(tlds);
            }
            if let Some(n) = g.max_targets {
                s.max_targets = n;
            }
            if let Some(n) = g.max_candidates_per_target {
                s.max_candidates_per_target = n;
            }
        }

        if let Some(sc) = &file.scoring {
            s.scoring = sc.enabled.unwrap_or(s.scoring);
            s.top = sc.top.unwrap_or(s.top);
            s.max_per_brand = sc.max_per_brand.unwrap_or(s.max_per_brand);
            s.suspicion_top_n = sc.suspicion_top_n.unwrap_or(s.suspicion_top_n);
            if let Some(weights) = &sc.weights {
                s.weights = weights.clone();
            }
        }

        if let Some(l) = &file.llm {
            s.llm_enabled = l.enabled.unwrap_or(s.llm_enabled);
            if let Some(url) = &l.base_url {
                s.llm.base_url = url.clone();
            }
            if let Some(m) = &l.filter_model {
                s.llm.filter_model = m.clone();
            }
            if let Some(m) = &l.suggest_model {
                s.llm.suggest_model = m.clone();
            }
            if let Some(m) = &l.score_model {
                s.llm.score_model = m.clone();
            }
            if let Some(d) = opt_duration("llm.timeout", &l.timeout)? {
                s.llm.timeout = d;
            }
            s.llm.max_suggestions = l.max_suggestions.unwrap_or(s.llm.max_suggestions);
        }

        if let Some(t) = &file.trends {
            s.hackernews = t.hackernews.unwrap_or(s.hackernews);
            s.max_stories = t.max_stories.unwrap_or(s.max_stories);
            s.google_trends = t.google_trends.unwrap_or(s.google_trends);
            if let Some(geo) = &t.geo {
                s.geo = geo.trim().to_uppercase();
            }
            s.max_searches = t.max_searches.unwrap_or(s.max_searches);
            if let Some(list) = &t.watchlist {
                s.watchlist = list.clone();
            }
        }

        if let Some(r) = &file.report {
            s.report_dir = r.dir.as_ref().map(PathBuf::from).or(s.report_dir);
            s.github_summary = r.github_summary.unwrap_or(s.github_summary);
        }

        Ok(s)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self, env_config: &EnvConfig) {
        if let Some(tlds) = &env_config.tlds {
            self.tlds = normalize_tlds(tlds);
        }
        if let Some(strategies) = &env_config.strategies {
            self.strategies = strategies.clone();
        }
        if let Some(c) = env_config.concurrency {
            self.verification = self.verification.clone().with_concurrency(c);
        }
        if let Some(rps) = env_config.requests_per_second {
            self.verification = self.verification.clone().with_requests_per_second(Some(rps));
        }
        if let Some(n) = env_config.max_retries {
            self.verification = self.verification.clone().with_max_retries(n);
        }
        if let Some(d) = env_config.deadline {
            self.verification = self.verification.clone().with_deadline(Some(d));
        }
        if let Some(llm) = env_config.llm {
            self.llm_enabled = llm;
        }
    }

    /// Pipeline parameters for a run with the given manual targets.
    pub fn pipeline_settings(&self, targets: Vec<String>) -> PipelineSettings {
        PipelineSettings {
            targets,
            strategies: self.strategies.clone(),
            tlds: self.tlds.clone(),
            max_targets: self.max_targets,
            max_candidates_per_target: self.max_candidates_per_target,
            enrichment: self.llm_enabled,
            scoring: self.scoring,
            suspicion_top_n: self.suspicion_top_n,
        }
    }
}

fn opt_duration(key: &str, value: &Option<String>) -> Result<Option<Duration>, SquatWatchError> {
    value.as_deref().map(|v| parse_duration_field(key, v)).transpose()
}

/// TLDs for a built-in or custom preset.
pub fn resolve_preset(
    preset: &str,
    custom: Option<&HashMap<String, Vec<String>>>,
) -> Result<Vec<String>, SquatWatchError> {
    get_preset_tlds_with_custom(preset, custom)
        .map(|tlds| normalize_tlds(&tlds))
        .ok_or_else(|| SquatWatchError::config(format!("Unknown TLD preset '{}'", preset)))
}

/// The default candidate TLD set.
pub fn default_tlds() -> Vec<String> {
    DEFAULT_TLDS.iter().map(|t| t.to_string()).collect()
}
