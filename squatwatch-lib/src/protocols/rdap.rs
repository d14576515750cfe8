//! RDAP (Registration Data Access Protocol) registry lookups.
//!
//! RDAP is the structured JSON successor to WHOIS. A 200 response means the
//! registry holds a record for the domain, 404 means it does not. Rate limits
//! surface as errors carrying the server's `Retry-After` hint so the checker
//! can decide when to try again.

use super::registry::{extract_tld, get_rdap_endpoint};
use super::{RegistryAnswer, RegistryLookup};
use crate::error::SquatWatchError;
use crate::types::DomainInfo;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// RDAP client for registry lookups.
#[derive(Clone)]
pub struct RdapClient {
    http_client: reqwest::Client,
    timeout: Duration,
    /// Whether to use IANA bootstrap for TLDs missing from the built-in map
    use_bootstrap: bool,
    /// Fixed base URL used for every TLD instead of registry discovery
    endpoint_override: Option<String>,
}

impl RdapClient {
    /// Create a new RDAP client with default settings.
    pub fn new() -> Result<Self, SquatWatchError> {
        Self::with_config(Duration::from_secs(5), cfg!(feature = "bootstrap"))
    }

    /// Create a new RDAP client with custom settings.
    pub fn with_config(timeout: Duration, use_bootstrap: bool) -> Result<Self, SquatWatchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("squatwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SquatWatchError::network_with_source(
                    "Failed to create RDAP HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            timeout,
            use_bootstrap,
            endpoint_override: None,
        })
    }

    /// Send every lookup to `base_url` (e.g. a private RDAP mirror).
    pub fn with_endpoint<S: Into<String>>(mut self, base_url: S) -> Self {
        let base = base_url.into();
        self.endpoint_override = Some(format!("{}/", base.trim_end_matches('/')));
        self
    }

    async fn endpoint_for(&self, domain: &str) -> Result<String, SquatWatchError> {
        if let Some(base) = &self.endpoint_override {
            return Ok(base.clone());
        }
        let tld = extract_tld(domain)?;
        get_rdap_endpoint(&tld, self.use_bootstrap).await
    }
}

#[async_trait]
impl RegistryLookup for RdapClient {
    async fn lookup(&self, domain: &str) -> Result<RegistryAnswer, SquatWatchError> {
        let endpoint = self.endpoint_for(domain).await?;
        let url = format!("{}{}", endpoint, domain);
        debug!("RDAP request: {}", url);

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SquatWatchError::timeout(format!("RDAP lookup for {}", domain), self.timeout)
                } else {
                    SquatWatchError::rdap(domain, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        debug!("RDAP response for {}: {}", domain, status);

        match status {
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| {
                    SquatWatchError::rdap(domain, format!("Failed to read body: {}", e))
                })?;
                let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
                    SquatWatchError::malformed("RDAP", format!("{}: {}", domain, e))
                })?;

                if !json.is_object() {
                    return Err(SquatWatchError::malformed(
                        "RDAP",
                        format!("{}: response is not a JSON object", domain),
                    ));
                }

                Ok(RegistryAnswer::Registered(Some(extract_domain_info(&json))))
            }
            StatusCode::NOT_FOUND => Ok(RegistryAnswer::NotRegistered),
            StatusCode::TOO_MANY_REQUESTS => Err(SquatWatchError::rate_limited(
                "RDAP",
                format!("HTTP 429 for {}", domain),
                parse_retry_after(response.headers()),
            )),
            code if code.is_server_error() => Err(SquatWatchError::rdap_with_status(
                domain,
                format!("RDAP server returned error: {}", code),
                code.as_u16(),
            )),
            code => Err(SquatWatchError::malformed(
                "RDAP",
                format!("{}: unexpected HTTP status {}", domain, code),
            )),
        }
    }
}

/// Read a `Retry-After` header given in seconds.
///
/// HTTP-date values are ignored and leave the decision to regular backoff.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Extract registration details from an RDAP JSON response.
pub fn extract_domain_info(json: &serde_json::Value) -> DomainInfo {
    let mut info = DomainInfo::default();

    if let Some(entities) = json.get("entities").and_then(|e| e.as_array()) {
        for entity in entities {
            let is_registrar = entity
                .get("roles")
                .and_then(|r| r.as_array())
                .is_some_and(|roles| roles.iter().any(|role| role.as_str() == Some("registrar")));

            if is_registrar {
                if let Some(name) =
                    extract_vcard_name(entity).or_else(|| extract_entity_identifier(entity))
                {
                    info.registrar = Some(name);
                    break;
                }
            }
        }
    }

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            if let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) {
                match action {
                    "registration" => info.creation_date = Some(date.to_string()),
                    "expiration" => info.expiration_date = Some(date.to_string()),
                    "last update of RDAP database" | "last changed" => {
                        info.updated_date = Some(date.to_string())
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        info.status = statuses
            .iter()
            .filter_map(|s| s.as_str())
            .map(String::from)
            .collect();
    }

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        info.nameservers = nameservers
            .iter()
            .filter_map(|ns| ns.get("ldhName").and_then(|n| n.as_str()))
            .map(|n| n.to_lowercase())
            .collect();
    }

    info
}

/// Organization name from the `fn` property of an entity's vCard.
fn extract_vcard_name(entity: &serde_json::Value) -> Option<String> {
    let items = entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|a| a.as_array())?;

    items.iter().find_map(|item| {
        let item = item.as_array()?;
        if item.len() >= 4 && item.first().and_then(|f| f.as_str()) == Some("fn") {
            item.get(3).and_then(|n| n.as_str()).map(String::from)
        } else {
            None
        }
    })
}

/// Fallback identifier: publicIds, then handle, then name.
fn extract_entity_identifier(entity: &serde_json::Value) -> Option<String> {
    entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
        .or_else(|| entity.get("handle").and_then(|h| h.as_str()))
        .or_else(|| entity.get("name").and_then(|n| n.as_str()))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> RdapClient {
        RdapClient::with_config(Duration::from_secs(2), false)
            .unwrap()
            .with_endpoint(format!("{}/domain", server.uri()))
    }

    #[test]
    fn test_extract_domain_info_basic() {
        let json = serde_json::json!({
            "events": [
                {"eventAction": "registration", "eventDate": "1999-07-15T05:32:41Z"},
                {"eventAction": "expiration", "eventDate": "2030-07-15T05:32:41Z"}
            ],
            "status": ["client delete prohibited", "client transfer prohibited"],
            "nameservers": [{"ldhName": "NS1.EXAMPLE.NET"}]
        });

        let info = extract_domain_info(&json);
        assert_eq!(info.creation_date.as_deref(), Some("1999-07-15T05:32:41Z"));
        assert_eq!(info.expiration_date.as_deref(), Some("2030-07-15T05:32:41Z"));
        assert_eq!(info.status.len(), 2);
        assert_eq!(info.nameservers, vec!["ns1.example.net"]);
    }

    #[test]
    fn test_extract_registrar_from_vcard() {
        let json = serde_json::json!({
            "entities": [{
                "roles": ["registrar"],
                "vcardArray": ["vcard", [["fn", {}, "text", "Example Registrar Inc."]]]
            }]
        });

        let info = extract_domain_info(&json);
        assert_eq!(info.registrar.as_deref(), Some("Example Registrar Inc."));
    }

    #[test]
    fn test_extract_registrar_falls_back_to_identifier() {
        let json = serde_json::json!({
            "entities": [
                {"roles": ["registrant"], "handle": "NOT-ME"},
                {"roles": ["registrar"], "publicIds": [{"type": "IANA Registrar ID", "identifier": "292"}]}
            ]
        });

        let info = extract_domain_info(&json);
        assert_eq!(info.registrar.as_deref(), Some("292"));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test]
    async fn test_lookup_registered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domain/paypal.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "objectClassName": "domain",
                "ldhName": "PAYPAL.COM",
                "status": ["active"]
            })))
            .mount(&server)
            .await;

        let answer = client_for(&server).await.lookup("paypal.com").await.unwrap();
        match answer {
            RegistryAnswer::Registered(Some(info)) => assert_eq!(info.status, vec!["active"]),
            other => panic!("unexpected answer: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_not_registered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/domain/paypa1.com"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let answer = client_for(&server).await.lookup("paypa1.com").await.unwrap();
        assert_eq!(answer, RegistryAnswer::NotRegistered);
    }

    #[tokio::test]
    async fn test_lookup_rate_limited_carries_hint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "3"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.lookup("paypa1.com").await.unwrap_err();
        assert!(matches!(err, SquatWatchError::RateLimited { .. }));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).await.lookup("paypa1.com").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_lookup_garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.lookup("paypa1.com").await.unwrap_err();
        assert!(err.is_malformed());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_lookup_unexpected_status_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).await.lookup("paypa1.com").await.unwrap_err();
        assert!(err.is_malformed());
    }
}
