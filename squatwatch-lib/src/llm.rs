//! Optional language-model enrichment.
//!
//! The [`Enricher`] trait covers the places a model can help: picking which
//! trending names are worth protecting, suggesting typos the mutation
//! strategies miss, estimating what each brand is worth to squatters, and
//! rating how suspicious an unregistered lookalike is. Every call is allowed to fail; the pipeline records the failure and moves
//! on without the extra data.

use crate::error::SquatWatchError;
use crate::scoring::BrandAssessment;
use crate::types::{Candidate, Target};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model-backed helpers for the optional pipeline stages.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Extra typo labels for a target, beyond the algorithmic strategies.
    async fn suggest(&self, target: &Target) -> Result<Vec<String>, SquatWatchError>;

    /// Pick at most `max` targets worth protecting, most important first.
    async fn filter(&self, targets: &[Target], max: usize) -> Result<Vec<Target>, SquatWatchError>;

    /// Suspicion score in `0.0..=1.0`: how likely a third party registering
    /// this domain would use it against the brand.
    async fn score(&self, candidate: &Candidate) -> Result<f64, SquatWatchError>;

    /// Commercial value and enforcement history for each brand label.
    ///
    /// Brands the model has no opinion on are left out of the map.
    async fn assess(
        &self,
        brands: &[String],
    ) -> Result<HashMap<String, BrandAssessment>, SquatWatchError>;
}

/// Connection and model settings for [`OpenAiClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    /// API root, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub filter_model: String,
    pub suggest_model: String,
    pub score_model: String,
    pub temperature: f32,
    /// Per-request timeout
    pub timeout: Duration,
    /// Upper bound on typo suggestions per target
    pub max_suggestions: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            filter_model: "gpt-4o-mini".to_string(),
            suggest_model: "gpt-4o".to_string(),
            score_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(30),
            max_suggestions: 15,
        }
    }
}

/// Client for any OpenAI-compatible chat completions API.
pub struct OpenAiClient {
    http_client: reqwest::Client,
    api_key: String,
    settings: LlmSettings,
}

impl OpenAiClient {
    /// Create a client using the key in `OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the key is missing or empty.
    pub fn from_env(settings: LlmSettings) -> Result<Self, SquatWatchError> {
        match env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Self::new(key, settings),
            _ => Err(SquatWatchError::unavailable(
                "LLM",
                format!("{} is not set", API_KEY_ENV),
            )),
        }
    }

    pub fn new<K: Into<String>>(api_key: K, settings: LlmSettings) -> Result<Self, SquatWatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SquatWatchError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            settings,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Run one JSON-mode chat completion and parse the reply.
    async fn chat_json(&self, model: &str, system: &str, user: &str) -> Result<Value, SquatWatchError> {
        let body = json!({
            "model": model,
            "temperature": self.settings.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(SquatWatchError::rate_limited("LLM", "too many requests", None));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SquatWatchError::unavailable(
                "LLM",
                format!("HTTP {}: {}", status, text.chars().take(200).collect::<String>()),
            ));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| SquatWatchError::malformed("LLM", e.to_string()))?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| SquatWatchError::malformed("LLM", "reply has no message content"))?;

        parse_json_content(content)
    }
}

/// Parse a model reply, tolerating a markdown code fence around the JSON.
pub fn parse_json_content(content: &str) -> Result<Value, SquatWatchError> {
    let cleaned = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| SquatWatchError::malformed("LLM", format!("reply is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(SquatWatchError::malformed("LLM", "reply is not a JSON object"));
    }
    Ok(value)
}

const FILTER_PROMPT: &str = "You help a brand-protection team decide which names to monitor \
for typosquatting. Prefer well-known companies and products whose users log in, pay or \
download software, since lookalike domains of those are used for phishing and malware. \
Ignore generic words, people, places and events. \
Reply with JSON: {\"targets\": [{\"name\": \"...\"}]}, most important first.";

const SUGGEST_PROMPT: &str = "You help a brand-protection team anticipate lookalike domains. \
Given a brand label, list misspellings a user might plausibly type or misread: phonetic \
spellings, dropped or swapped vowels, common keyboard slips, visually confusable letters. \
Labels only, no TLDs, lowercase letters, digits and hyphens. \
Reply with JSON: {\"typos\": [{\"label\": \"...\", \"kind\": \"...\"}]}.";

const SCORE_PROMPT: &str = "You help a brand-protection team triage unregistered lookalike \
domains. Rate from 0 to 10 how likely it is that a third party registering this domain would \
use it to impersonate the brand or capture its users' traffic. Consider how easily the domain \
is confused with the brand and how attractive the brand is to attackers. \
Reply with JSON: {\"suspicion\": <0-10>, \"rationale\": \"...\"}.";

const ASSESS_PROMPT: &str = "You help a brand-protection team prioritise lookalike domains. \
For each brand estimate the typical cost per click in USD of search ads on its keywords, name \
its commercial niche, and rate from 1 to 10 how actively its owner pursues lookalike \
registrations through UDRP complaints and takedowns. \
Reply with JSON: {\"assessments\": [{\"brand\": \"...\", \"estimated_cpc\": <number>, \
\"niche\": \"...\", \"enforcement\": <1-10>}]}.";

#[async_trait]
impl Enricher for OpenAiClient {
    async fn suggest(&self, target: &Target) -> Result<Vec<String>, SquatWatchError> {
        let user = format!(
            "Brand label: {}\nGive up to {} lookalike labels.",
            target.normalized, self.settings.max_suggestions
        );
        let reply = self
            .chat_json(&self.settings.suggest_model, SUGGEST_PROMPT, &user)
            .await?;

        let labels = parse_suggestions(&reply, self.settings.max_suggestions)?;
        debug!("LLM suggested {} labels for {}", labels.len(), target.normalized);
        Ok(labels)
    }

    async fn filter(&self, targets: &[Target], max: usize) -> Result<Vec<Target>, SquatWatchError> {
        if targets.is_empty() || max == 0 {
            return Ok(Vec::new());
        }

        let names: Vec<&str> = targets.iter().map(|t| t.raw.as_str()).collect();
        let user = format!(
            "Candidate names: {}\nPick at most {}.",
            names.join(", "),
            max
        );
        let reply = self
            .chat_json(&self.settings.filter_model, FILTER_PROMPT, &user)
            .await?;

        apply_filter_reply(&reply, targets, max)
    }

    async fn score(&self, candidate: &Candidate) -> Result<f64, SquatWatchError> {
        let user = format!("Brand: {}\nDomain: {}", candidate.target, candidate.domain);
        let reply = self
            .chat_json(&self.settings.score_model, SCORE_PROMPT, &user)
            .await?;

        parse_suspicion(&reply)
    }

    async fn assess(
        &self,
        brands: &[String],
    ) -> Result<HashMap<String, BrandAssessment>, SquatWatchError> {
        if brands.is_empty() {
            return Ok(HashMap::new());
        }

        let user = format!("Brands: {}", brands.join(", "));
        let reply = self
            .chat_json(&self.settings.score_model, ASSESS_PROMPT, &user)
            .await?;

        let assessments = parse_assessments(&reply, brands)?;
        debug!("LLM assessed {} of {} brands", assessments.len(), brands.len());
        Ok(assessments)
    }
}

/// Read `{"typos": [{"label": ..}]}` into lowercase labels without spaces.
pub fn parse_suggestions(reply: &Value, max: usize) -> Result<Vec<String>, SquatWatchError> {
    let typos = reply["typos"]
        .as_array()
        .ok_or_else(|| SquatWatchError::malformed("LLM", "missing 'typos' array"))?;

    let mut labels: Vec<String> = Vec::new();
    for entry in typos {
        let label = entry["label"].as_str().or_else(|| entry.as_str());
        if let Some(label) = label {
            let label: String = label.to_lowercase().split_whitespace().collect();
            if !label.is_empty() && !labels.contains(&label) {
                labels.push(label);
            }
        }
    }

    labels.truncate(max);
    Ok(labels)
}

/// Map `{"targets": [{"name": ..}]}` back onto the supplied targets.
///
/// Names are matched case-insensitively against the raw text or the
/// normalized label; names the model invented are dropped.
pub fn apply_filter_reply(
    reply: &Value,
    targets: &[Target],
    max: usize,
) -> Result<Vec<Target>, SquatWatchError> {
    let picked = reply["targets"]
        .as_array()
        .ok_or_else(|| SquatWatchError::malformed("LLM", "missing 'targets' array"))?;

    let mut out: Vec<Target> = Vec::new();
    for entry in picked {
        let Some(name) = entry["name"].as_str().or_else(|| entry.as_str()) else {
            continue;
        };
        let name = name.trim().to_lowercase();
        let found = targets
            .iter()
            .find(|t| t.raw.to_lowercase() == name || t.normalized == name);

        if let Some(target) = found {
            if !out.iter().any(|t| t.normalized == target.normalized) {
                out.push(target.clone());
            }
        } else {
            debug!("LLM picked unknown target '{}'", name);
        }
    }

    out.truncate(max);
    Ok(out)
}

/// Read `{"suspicion": 0-10}` into `0.0..=1.0`.
pub fn parse_suspicion(reply: &Value) -> Result<f64, SquatWatchError> {
    let raw = reply["suspicion"]
        .as_f64()
        .ok_or_else(|| SquatWatchError::malformed("LLM", "missing numeric 'suspicion'"))?;
    Ok((raw / 10.0).clamp(0.0, 1.0))
}

/// Read `{"assessments": [..]}` into a map keyed by the supplied labels.
///
/// Missing numbers fall back to the neutral defaults; brands that were not
/// asked about are dropped.
pub fn parse_assessments(
    reply: &Value,
    brands: &[String],
) -> Result<HashMap<String, BrandAssessment>, SquatWatchError> {
    let entries = reply["assessments"]
        .as_array()
        .ok_or_else(|| SquatWatchError::malformed("LLM", "missing 'assessments' array"))?;

    let mut out = HashMap::new();
    for entry in entries {
        let Some(name) = entry["brand"].as_str() else {
            continue;
        };
        let key: String = name.to_lowercase().split_whitespace().collect();
        let Some(brand) = brands.iter().find(|b| b.to_lowercase() == key) else {
            debug!("LLM assessed unknown brand '{}'", name);
            continue;
        };

        let assessment = BrandAssessment {
            estimated_cpc: entry["estimated_cpc"]
                .as_f64()
                .unwrap_or(BrandAssessment::DEFAULT_CPC)
                .max(0.0),
            niche: entry["niche"]
                .as_str()
                .filter(|n| !n.trim().is_empty())
                .map(str::to_string),
            enforcement: entry["enforcement"]
                .as_f64()
                .unwrap_or(BrandAssessment::DEFAULT_ENFORCEMENT)
                .clamp(1.0, 10.0),
        };
        out.insert(brand.clone(), assessment);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyId;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: Value) -> Value {
        json!({
            "choices": [{ "message": { "role": "assistant", "content": content.to_string() } }]
        })
    }

    async fn client_for(server: &MockServer) -> OpenAiClient {
        let settings = LlmSettings {
            base_url: server.uri(),
            ..LlmSettings::default()
        };
        OpenAiClient::new("test-key", settings).unwrap()
    }

    #[test]
    fn test_parse_json_content_strips_fence() {
        let value = parse_json_content("```json\n{\"typos\": []}\n```").unwrap();
        assert!(value["typos"].is_array());

        assert!(parse_json_content("not json").unwrap_err().is_malformed());
        assert!(parse_json_content("[1, 2]").unwrap_err().is_malformed());
    }

    #[test]
    fn test_parse_suggestions() {
        let reply = json!({"typos": [
            {"label": "PayPall", "kind": "doubling"},
            {"label": "pay pal", "kind": "split"},
            {"label": "paypall", "kind": "dup"},
            "paypa1",
            {"kind": "no label"}
        ]});

        let labels = parse_suggestions(&reply, 10).unwrap();
        assert_eq!(labels, vec!["paypall", "paypal", "paypa1"]);
        assert_eq!(parse_suggestions(&reply, 1).unwrap().len(), 1);
        assert!(parse_suggestions(&json!({}), 10).is_err());
    }

    #[test]
    fn test_apply_filter_reply() {
        let targets = vec![
            Target::from_keyword("Stripe", Some("hackernews")).unwrap(),
            Target::from_keyword("Node.js", Some("hackernews")).unwrap(),
            Target::from_keyword("Rust", Some("hackernews")).unwrap(),
        ];
        let reply = json!({"targets": [
            {"name": "nodejs"}, {"name": "Invented"}, {"name": "stripe"}, {"name": "Stripe"}
        ]});

        let picked = apply_filter_reply(&reply, &targets, 5).unwrap();
        let names: Vec<&str> = picked.iter().map(|t| t.normalized.as_str()).collect();
        assert_eq!(names, vec!["nodejs", "stripe"]);

        assert_eq!(apply_filter_reply(&reply, &targets, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_suspicion_is_normalized() {
        assert_eq!(parse_suspicion(&json!({"suspicion": 7})).unwrap(), 0.7);
        assert_eq!(parse_suspicion(&json!({"suspicion": 42})).unwrap(), 1.0);
        assert!(parse_suspicion(&json!({"suspicion": "high"})).is_err());
    }

    #[test]
    fn test_parse_assessments() {
        let brands = vec!["paypal".to_string(), "stripe".to_string()];
        let reply = json!({"assessments": [
            {"brand": "PayPal", "estimated_cpc": 12.5, "niche": "payments", "enforcement": 9},
            {"brand": "stripe", "enforcement": 42},
            {"brand": "invented", "estimated_cpc": 3.0},
            {"estimated_cpc": 3.0}
        ]});

        let parsed = parse_assessments(&reply, &brands).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["paypal"].estimated_cpc, 12.5);
        assert_eq!(parsed["paypal"].niche.as_deref(), Some("payments"));
        assert_eq!(parsed["paypal"].enforcement, 9.0);
        assert_eq!(parsed["stripe"].estimated_cpc, BrandAssessment::DEFAULT_CPC);
        assert_eq!(parsed["stripe"].enforcement, 10.0);

        assert!(parse_assessments(&json!({}), &brands).unwrap_err().is_malformed());
    }

    #[tokio::test]
    async fn test_assess_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(json!({
                "assessments": [{"brand": "figma", "estimated_cpc": 4.0, "enforcement": 2}]
            }))))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let assessed = client.assess(&["figma".to_string()]).await.unwrap();
        assert_eq!(assessed["figma"].estimated_cpc, 4.0);
        assert!(client.assess(&[]).await.unwrap().is_empty());
        assert_eq!(server.received_requests().await.unwrap_or_default().len(), 1);
    }

    #[test]
    fn test_from_env_without_key_is_unavailable() {
        if env::var(API_KEY_ENV).is_ok() {
            return;
        }
        let err = OpenAiClient::from_env(LlmSettings::default())
            .err()
            .unwrap();
        assert!(matches!(err, SquatWatchError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_suggest_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({"typos": [{"label": "paypai", "kind": "visual"}]}),
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let target = Target::manual("paypal").unwrap();
        assert_eq!(client.suggest(&target).await.unwrap(), vec!["paypai"]);
    }

    #[tokio::test]
    async fn test_score_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                json!({"suspicion": 9, "rationale": "one letter off"}),
            )))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let candidate = Candidate::new("paypa", "com", "paypal", StrategyId::Omission);
        assert_eq!(client.score(&candidate).await.unwrap(), 0.9);
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let target = Target::manual("paypal").unwrap();

        let first = client.suggest(&target).await.unwrap_err();
        assert!(matches!(first, SquatWatchError::RateLimited { .. }));

        let second = client.suggest(&target).await.unwrap_err();
        assert!(matches!(second, SquatWatchError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_filter_with_no_targets_skips_request() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        assert!(client.filter(&[], 10).await.unwrap().is_empty());
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
