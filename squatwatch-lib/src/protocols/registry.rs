//! TLD registry mappings, presets and IANA bootstrap discovery.
//!
//! Maps TLDs to the RDAP endpoint of their registry. Well-known TLDs are
//! hardcoded; everything else is discovered through the IANA bootstrap file
//! and cached process-wide for 24 hours.

use crate::error::SquatWatchError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// IANA RDAP bootstrap file for DNS.
const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Bootstrap cache TTL: 24 hours (RDAP endpoints rarely change)
const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);

/// TLDs scanned when nothing else is configured.
/// Default candidate TLDs. Each one has a built-in RDAP endpoint.
pub const DEFAULT_TLDS: [&str; 5] = ["com", "net", "org", "io", "ai"];

/// Cache of endpoints discovered through the IANA bootstrap registry.
struct BootstrapCache {
    /// TLD -> RDAP endpoint URL
    rdap_endpoints: HashMap<String, String>,
    /// TLDs known to have no RDAP endpoint
    no_rdap: HashSet<String>,
    /// Whether the full bootstrap file has been fetched
    loaded: bool,
    last_fetch: Option<Instant>,
}

impl BootstrapCache {
    fn new() -> Self {
        Self {
            rdap_endpoints: HashMap::new(),
            no_rdap: HashSet::new(),
            loaded: false,
            last_fetch: None,
        }
    }

    fn is_stale(&self) -> bool {
        match self.last_fetch {
            Some(t) => t.elapsed() > BOOTSTRAP_TTL,
            None => true,
        }
    }
}

lazy_static::lazy_static! {
    static ref BOOTSTRAP_CACHE: Mutex<BootstrapCache> = Mutex::new(BootstrapCache::new());
}

fn lock_cache() -> Result<std::sync::MutexGuard<'static, BootstrapCache>, SquatWatchError> {
    BOOTSTRAP_CACHE
        .lock()
        .map_err(|_| SquatWatchError::internal("Failed to acquire bootstrap cache lock"))
}

/// Built-in RDAP endpoints for common TLDs.
///
/// Every URL ends in `/domain/` so the domain can be appended directly.
pub fn get_rdap_registry_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        // Popular gTLDs
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        (
            "org",
            "https://rdap.publicinterestregistry.org/rdap/domain/",
        ),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        // Google TLDs
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        // CentralNic
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        // Identity Digital
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        // ccTLDs with working RDAP
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
        // co, gg and others come from the bootstrap file
    ])
}

/// Curated TLD lists for typosquat scans.
///
/// # Examples
///
/// ```rust
/// use squatwatch_lib::get_preset_tlds;
///
/// let tlds = get_preset_tlds("default").unwrap();
/// assert_eq!(tlds, vec!["com", "net", "org", "io", "ai"]);
/// ```
pub fn get_preset_tlds(preset: &str) -> Option<Vec<String>> {
    let tlds: Option<Vec<&str>> = match preset.to_lowercase().as_str() {
        "default" | "tier1" => Some(DEFAULT_TLDS.to_vec()),
        "classic" => Some(vec!["com", "net", "org"]),
        "startup" => Some(vec!["com", "io", "ai", "co", "app", "dev", "tech", "xyz"]),
        "popular" => Some(vec![
            "com", "net", "org", "io", "ai", "co", "app", "dev", "me", "xyz", "tv", "gg",
        ]),
        "country" => Some(vec!["us", "uk", "de", "fr", "ca", "nl"]),
        "cheap" => Some(vec!["xyz", "online", "site", "info", "biz"]),
        _ => None,
    };
    tlds.map(|v| v.into_iter().map(|s| s.to_string()).collect())
}

/// Look up a preset, checking user-defined presets first.
pub fn get_preset_tlds_with_custom(
    preset: &str,
    custom_presets: Option<&HashMap<String, Vec<String>>>,
) -> Option<Vec<String>> {
    if let Some(custom) = custom_presets {
        if let Some(tlds) = custom.get(&preset.to_lowercase()) {
            return Some(tlds.clone());
        }
    }
    get_preset_tlds(preset)
}

/// Names of the built-in presets.
pub fn get_available_presets() -> Vec<&'static str> {
    vec!["cheap", "classic", "country", "default", "popular", "startup"]
}

/// Look up the RDAP endpoint for a TLD.
///
/// Lookup flow:
/// 1. Built-in registry map
/// 2. Bootstrap cache hit
/// 3. Negative cache (TLD known to lack RDAP)
/// 4. Fetch the full bootstrap file if the cache is empty or stale, re-check
/// 5. Still missing: remember the TLD as lacking RDAP and fail
pub async fn get_rdap_endpoint(tld: &str, use_bootstrap: bool) -> Result<String, SquatWatchError> {
    let tld_lower = tld.to_lowercase();

    if let Some(endpoint) = get_rdap_registry_map().get(tld_lower.as_str()) {
        return Ok(endpoint.to_string());
    }

    {
        let cache = lock_cache()?;
        if !cache.is_stale() {
            if let Some(endpoint) = cache.rdap_endpoints.get(&tld_lower) {
                return Ok(endpoint.clone());
            }
            if cache.no_rdap.contains(&tld_lower) {
                return Err(SquatWatchError::bootstrap(
                    &tld_lower,
                    "TLD has no known RDAP endpoint",
                ));
            }
        }
    }

    if !use_bootstrap {
        return Err(SquatWatchError::bootstrap(
            &tld_lower,
            "No known RDAP endpoint and bootstrap disabled",
        ));
    }

    initialize_bootstrap().await?;

    let mut cache = lock_cache()?;
    if let Some(endpoint) = cache.rdap_endpoints.get(&tld_lower) {
        return Ok(endpoint.clone());
    }

    cache.no_rdap.insert(tld_lower.clone());
    Err(SquatWatchError::bootstrap(
        &tld_lower,
        "TLD not found in IANA bootstrap registry",
    ))
}

/// Parse the IANA bootstrap JSON into a TLD -> endpoint map.
pub fn parse_bootstrap(json: &serde_json::Value) -> Result<HashMap<String, String>, SquatWatchError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| {
            SquatWatchError::bootstrap("*", "Invalid bootstrap JSON: missing 'services' array")
        })?;

    let mut endpoints = HashMap::new();

    for service in services {
        let Some([tlds, urls, ..]) = service.as_array().map(Vec::as_slice) else {
            continue;
        };

        // Prefer an https endpoint when a service lists several
        let url = urls.as_array().and_then(|urls| {
            urls.iter()
                .filter_map(|u| u.as_str())
                .find(|u| u.starts_with("https://"))
                .or_else(|| urls.first().and_then(|u| u.as_str()))
        });

        let (Some(url), Some(tlds)) = (url, tlds.as_array()) else {
            continue;
        };

        let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
        for tld in tlds.iter().filter_map(|t| t.as_str()) {
            endpoints.insert(tld.to_lowercase(), endpoint.clone());
        }
    }

    Ok(endpoints)
}

async fn fetch_full_bootstrap() -> Result<(), SquatWatchError> {
    debug!("Fetching IANA bootstrap registry from {}", BOOTSTRAP_URL);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| {
            SquatWatchError::network_with_source("Failed to create HTTP client", e.to_string())
        })?;

    let response = client.get(BOOTSTRAP_URL).send().await.map_err(|e| {
        SquatWatchError::bootstrap("*", format!("Failed to fetch bootstrap registry: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(SquatWatchError::bootstrap(
            "*",
            format!("Bootstrap registry returned HTTP {}", response.status()),
        ));
    }

    let json: serde_json::Value = response.json().await.map_err(|e| {
        SquatWatchError::bootstrap("*", format!("Failed to parse bootstrap JSON: {}", e))
    })?;

    let endpoints = parse_bootstrap(&json)?;
    info!("Loaded {} RDAP endpoints from IANA bootstrap", endpoints.len());

    let mut cache = lock_cache()?;
    cache.rdap_endpoints = endpoints;
    cache.loaded = true;
    cache.last_fetch = Some(Instant::now());
    cache.no_rdap.clear();

    Ok(())
}

/// Pre-warm the bootstrap cache.
///
/// A no-op while the cache is fresh.
pub async fn initialize_bootstrap() -> Result<(), SquatWatchError> {
    let needs_fetch = {
        let cache = lock_cache()?;
        !cache.loaded || cache.is_stale()
    };

    if needs_fetch {
        fetch_full_bootstrap().await?;
    }

    Ok(())
}

/// Extract the TLD (last label) from a domain name.
pub fn extract_tld(domain: &str) -> Result<String, SquatWatchError> {
    match domain.rsplit_once('.') {
        Some((rest, tld)) if !rest.is_empty() && !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(SquatWatchError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}
