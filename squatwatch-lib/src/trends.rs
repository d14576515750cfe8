//! Target sources: where brands to protect come from.
//!
//! A source returns trend signals (a name plus a velocity). Signals from all
//! sources are merged, keeping the strongest velocity per name, before they
//! become [`Target`]s.

use crate::error::SquatWatchError;
use crate::types::Target;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Base URL of the public Hacker News API.
pub const HACKER_NEWS_API: &str = "https://hacker-news.firebaseio.com/v0";

/// Public Google Trends daily trending searches feed.
pub const GOOGLE_TRENDS_RSS: &str = "https://trends.google.com/trending/rss";

/// Upper bound for any signal's velocity.
pub const MAX_SIGNAL_VELOCITY: f64 = 5.0;

/// Score that maps to a velocity of 1.0.
const SCORE_PER_VELOCITY: f64 = 200.0;
const MAX_STORY_VELOCITY: f64 = 3.0;
/// Approximate daily searches that map to a velocity of 1.0.
const TRAFFIC_PER_VELOCITY: f64 = 20_000.0;
const MIN_BRAND_LEN: usize = 3;

lazy_static! {
    /// Capitalized words, optionally dotted ("Stripe", "Node.js")
    static ref CAPITALIZED: Regex =
        Regex::new(r"\b[A-Z][a-z]+(?:\.[a-z]+)*\b").expect("valid brand pattern");
    /// Short all-caps acronyms ("AWS", "OPENAI")
    static ref ACRONYM: Regex = Regex::new(r"\b[A-Z]{2,6}\b").expect("valid acronym pattern");
    static ref RSS_ITEM: Regex = Regex::new(r"(?s)<item>(.*?)</item>").expect("valid item pattern");
    static ref RSS_TITLE: Regex =
        Regex::new(r"(?s)<title>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>")
            .expect("valid title pattern");
    static ref RSS_TRAFFIC: Regex =
        Regex::new(r"<ht:approx_traffic>\s*([0-9][0-9,.]*)\s*([KkMm]?)\+?\s*</ht:approx_traffic>")
            .expect("valid traffic pattern");
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "how", "why", "what", "when", "show", "ask",
    "tell", "new", "from", "with", "for", "and", "not", "can", "will", "has", "have", "had",
    "this", "that", "your", "our", "my", "its", "all", "any", "but", "into", "about", "just",
    "than", "now", "get", "got", "use", "way", "who", "hn", "yc", "launch", "hiring", "pdf",
    "video", "api", "ceo", "usa", "you", "we", "they", "one", "two",
];

/// A brand name observed in a trend feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSignal {
    /// Name as it appeared in the feed
    pub name: String,
    /// Source tag ("hackernews", "google-trends", "watchlist")
    pub source: String,
    /// Relative strength, 0.0..=5.0
    pub velocity: f64,
}

impl TrendSignal {
    pub fn new<N: Into<String>, S: Into<String>>(name: N, source: S, velocity: f64) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            velocity: velocity.clamp(0.0, MAX_SIGNAL_VELOCITY),
        }
    }

    /// Convert into a target, or `None` if the name has nothing usable.
    pub fn into_target(self) -> Option<Target> {
        match Target::from_keyword(&self.name, Some(self.source)) {
            Ok(target) => Some(target.with_velocity(self.velocity)),
            Err(e) => {
                debug!("Skipping trend '{}': {}", self.name, e);
                None
            }
        }
    }
}

/// A feed of candidate brands. Returning zero signals is valid.
#[async_trait]
pub trait TargetSource: Send + Sync {
    /// Short tag recorded on every target this source produces.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<TrendSignal>, SquatWatchError>;
}

/// A fixed list of brands, e.g. from the `[trends] watchlist` config key.
#[derive(Debug, Clone, Default)]
pub struct WatchlistSource {
    names: Vec<String>,
}

impl WatchlistSource {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names
                .iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

#[async_trait]
impl TargetSource for WatchlistSource {
    fn name(&self) -> &str {
        "watchlist"
    }

    async fn fetch(&self) -> Result<Vec<TrendSignal>, SquatWatchError> {
        Ok(self
            .names
            .iter()
            .map(|n| TrendSignal::new(n.as_str(), self.name(), 1.0))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct HnItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    score: Option<u64>,
}

/// Brands mentioned in current Hacker News top stories.
pub struct HackerNewsSource {
    http_client: reqwest::Client,
    base_url: String,
    max_stories: usize,
}

impl HackerNewsSource {
    pub fn new(max_stories: usize, timeout: Duration) -> Result<Self, SquatWatchError> {
        Self::with_base_url(HACKER_NEWS_API, max_stories, timeout)
    }

    /// Point the source at a different API root (used by tests).
    pub fn with_base_url<U: Into<String>>(
        base_url: U,
        max_stories: usize,
        timeout: Duration,
    ) -> Result<Self, SquatWatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("squatwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SquatWatchError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_stories,
        })
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>, SquatWatchError> {
        let url = format!("{}/topstories.json", self.base_url);
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(SquatWatchError::unavailable(
                "Hacker News",
                format!("top stories returned HTTP {}", response.status()),
            ));
        }

        let ids: Vec<u64> = response
            .json()
            .await
            .map_err(|e| SquatWatchError::malformed("Hacker News", e.to_string()))?;
        Ok(ids.into_iter().take(self.max_stories).collect())
    }

    async fn item(&self, id: u64) -> Option<HnItem> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let response = match self.http_client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Story {} returned HTTP {}", id, r.status());
                return None;
            }
            Err(e) => {
                debug!("Story {} failed: {}", id, e);
                return None;
            }
        };
        // deleted items come back as `null`
        response.json::<Option<HnItem>>().await.ok().flatten()
    }
}

#[async_trait]
impl TargetSource for HackerNewsSource {
    fn name(&self) -> &str {
        "hackernews"
    }

    async fn fetch(&self) -> Result<Vec<TrendSignal>, SquatWatchError> {
        let ids = self.top_story_ids().await?;
        info!("Fetching {} Hacker News stories", ids.len());

        let items: Vec<HnItem> = stream::iter(ids)
            .map(|id| self.item(id))
            .buffer_unordered(8)
            .filter_map(|item| async move { item })
            .collect()
            .await;

        let mut signals = Vec::new();
        for item in items {
            let Some(title) = item.title else { continue };
            let velocity = story_velocity(item.score.unwrap_or(0));
            for brand in extract_brands(&title) {
                signals.push(TrendSignal::new(brand, self.name(), velocity));
            }
        }

        Ok(merge_signals(signals))
    }
}

/// Velocity of a story with the given score.
pub fn story_velocity(score: u64) -> f64 {
    (score as f64 / SCORE_PER_VELOCITY).min(MAX_STORY_VELOCITY)
}

/// Searches trending on Google today, from the public RSS feed.
pub struct GoogleTrendsSource {
    http_client: reqwest::Client,
    feed_url: String,
    geo: String,
    max_items: usize,
}

impl GoogleTrendsSource {
    pub fn new<G: Into<String>>(
        geo: G,
        max_items: usize,
        timeout: Duration,
    ) -> Result<Self, SquatWatchError> {
        Self::with_feed_url(GOOGLE_TRENDS_RSS, geo, max_items, timeout)
    }

    /// Point the source at a different feed (used by tests).
    pub fn with_feed_url<U: Into<String>, G: Into<String>>(
        feed_url: U,
        geo: G,
        max_items: usize,
        timeout: Duration,
    ) -> Result<Self, SquatWatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("squatwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SquatWatchError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            feed_url: feed_url.into(),
            geo: geo.into().to_uppercase(),
            max_items,
        })
    }
}

#[async_trait]
impl TargetSource for GoogleTrendsSource {
    fn name(&self) -> &str {
        "google-trends"
    }

    async fn fetch(&self) -> Result<Vec<TrendSignal>, SquatWatchError> {
        let response = self
            .http_client
            .get(&self.feed_url)
            .query(&[("geo", self.geo.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SquatWatchError::unavailable(
                "Google Trends",
                format!("trending feed returned HTTP {}", response.status()),
            ));
        }

        let body = response.text().await?;
        let searches = parse_trending_feed(&body)?;
        info!("Google Trends returned {} searches", searches.len());

        let signals = searches
            .into_iter()
            .take(self.max_items)
            .map(|(query, traffic)| TrendSignal::new(query, self.name(), traffic_velocity(traffic)))
            .collect();
        Ok(merge_signals(signals))
    }
}

/// Trending searches and their approximate traffic, in feed order.
///
/// A body without an RSS channel is malformed; a channel with no items is
/// just a quiet day.
pub fn parse_trending_feed(body: &str) -> Result<Vec<(String, Option<u64>)>, SquatWatchError> {
    if !body.contains("<channel") {
        return Err(SquatWatchError::malformed(
            "Google Trends",
            "response is not an RSS feed",
        ));
    }

    Ok(RSS_ITEM
        .captures_iter(body)
        .filter_map(|item| {
            let item = item.get(1)?.as_str();
            let title = RSS_TITLE.captures(item)?.get(1)?.as_str();
            let title = unescape_xml(title.trim());
            if title.is_empty() {
                return None;
            }
            let traffic = RSS_TRAFFIC.captures(item).and_then(|c| {
                let digits: String = c.get(1)?.as_str().chars().filter(|ch| *ch != ',').collect();
                let value: f64 = digits.parse().ok()?;
                let multiplier = match c.get(2).map(|m| m.as_str()) {
                    Some("K") | Some("k") => 1_000.0,
                    Some("M") | Some("m") => 1_000_000.0,
                    _ => 1.0,
                };
                Some((value * multiplier) as u64)
            });
            Some((title, traffic))
        })
        .collect())
}

/// Velocity of a trending search. Anything trending counts at least 1.0.
pub fn traffic_velocity(traffic: Option<u64>) -> f64 {
    traffic
        .map(|t| (t as f64 / TRAFFIC_PER_VELOCITY).clamp(1.0, MAX_SIGNAL_VELOCITY))
        .unwrap_or(1.0)
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Pull brand-like names out of a headline.
///
/// Picks capitalized words and short acronyms, then drops stop words and
/// anything shorter than three characters. Order of first appearance is kept.
pub fn extract_brands(title: &str) -> Vec<String> {
    let mut found: Vec<(usize, &str)> = CAPITALIZED
        .find_iter(title)
        .chain(ACRONYM.find_iter(title))
        .map(|m| (m.start(), m.as_str()))
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut seen = Vec::<String>::new();
    let mut brands = Vec::new();
    for (_, word) in found {
        let key = word.to_lowercase();
        if key.len() < MIN_BRAND_LEN || STOP_WORDS.contains(&key.as_str()) || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        brands.push(word.to_string());
    }
    brands
}

/// Merge signals case-insensitively, keeping the highest velocity.
///
/// The result is sorted by velocity, strongest first; ties keep first-seen
/// order.
pub fn merge_signals(signals: Vec<TrendSignal>) -> Vec<TrendSignal> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<TrendSignal> = Vec::new();

    for signal in signals {
        let key = signal.name.to_lowercase();
        match index.get(&key) {
            Some(&i) => {
                if signal.velocity > merged[i].velocity {
                    merged[i] = signal;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(signal);
            }
        }
    }

    merged.sort_by(|a, b| b.velocity.total_cmp(&a.velocity));
    merged
}

/// Fetch every source, skipping the ones that fail.
///
/// Returns the merged signals and the errors of sources that failed.
pub async fn collect_signals(
    sources: &[Arc<dyn TargetSource>],
) -> (Vec<TrendSignal>, Vec<(String, SquatWatchError)>) {
    let mut signals = Vec::new();
    let mut failures = Vec::new();

    for source in sources {
        match source.fetch().await {
            Ok(mut found) => {
                debug!("{} returned {} signals", source.name(), found.len());
                signals.append(&mut found);
            }
            Err(e) => {
                warn!("Target source {} failed: {}", source.name(), e);
                failures.push((source.name().to_string(), e));
            }
        }
    }

    (merge_signals(signals), failures)
}
