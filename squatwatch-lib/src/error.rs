//! Error handling for typosquat discovery.
//!
//! One error type covers every failure mode of the library, from bad targets
//! and configuration to provider responses. Errors raised while verifying a
//! single candidate never leave the checker: they are folded into an
//! indeterminate result. Only configuration errors end a pipeline run.

use std::time::Duration;
use thiserror::Error;

/// Main error type for squatwatch operations.
#[derive(Debug, Clone, Error)]
pub enum SquatWatchError {
    /// A target string that normalizes to nothing usable
    #[error("Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Invalid domain name format
    #[error("Invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: String },

    /// Network-related errors (connection reset, refused, etc.)
    #[error("Network error: {message}{}", .detail.as_ref().map(|d| format!(" (source: {})", d)).unwrap_or_default())]
    NetworkError {
        message: String,
        detail: Option<String>,
    },

    /// Resolver failures other than "no such record"
    #[error("DNS error for '{domain}': {message}")]
    DnsError { domain: String, message: String },

    /// RDAP protocol specific errors
    #[error("RDAP error for '{domain}'{}: {message}", .status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Bootstrap registry lookup failures
    #[error("Bootstrap error for TLD '{tld}': {message}")]
    BootstrapError { tld: String, message: String },

    /// A provider returned data we could not make sense of
    #[error("Malformed response from {service}: {message}")]
    MalformedResponse { service: String, message: String },

    /// Configuration errors (no targets, no strategies, invalid settings)
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File I/O errors when reading configuration or writing reports
    #[error("File error at '{path}': {message}")]
    FileError { path: String, message: String },

    /// Timeout errors when operations take too long
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Rate limiting errors when servers reject requests
    #[error("Rate limited by {service}{}: {message}", .retry_after.map(|d| format!(" (retry after {:?})", d)).unwrap_or_default())]
    RateLimited {
        service: String,
        message: String,
        retry_after: Option<Duration>,
    },

    /// An optional collaborator (trend feed, LLM) could not be used
    #[error("{stage} unavailable: {message}")]
    Unavailable { stage: String, message: String },

    /// Generic internal errors that don't fit other categories
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SquatWatchError {
    /// Create a new invalid target error.
    pub fn invalid_target<T: Into<String>, R: Into<String>>(target: T, reason: R) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            detail: Some(source.into()),
        }
    }

    /// Create a new DNS error.
    pub fn dns<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::DnsError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    /// Create a new malformed response error.
    pub fn malformed<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::MalformedResponse {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new rate limited error.
    pub fn rate_limited<S: Into<String>, M: Into<String>>(
        service: S,
        message: M,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimited {
            service: service.into(),
            message: message.into(),
            retry_after,
        }
    }

    /// Create a new collaborator-unavailable error.
    pub fn unavailable<S: Into<String>, M: Into<String>>(stage: S, message: M) -> Self {
        Self::Unavailable {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error suggests the operation should be retried.
    ///
    /// Malformed data, bad input and configuration problems are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. }
                | Self::DnsError { .. }
                | Self::Timeout { .. }
                | Self::RateLimited { .. }
                | Self::RdapError {
                    status_code: None | Some(500..=599),
                    ..
                }
        )
    }

    /// Whether the provider answered with something unparseable.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }

    /// Whether this is a configuration problem that should abort a run.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }

    /// Provider-supplied hint for when to try again, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

// Implement From conversions for common error types
impl From<reqwest::Error> for SquatWatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else if err.is_decode() {
            Self::malformed("HTTP", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for SquatWatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed("JSON", format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for SquatWatchError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<std::io::Error> for SquatWatchError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<regex::Error> for SquatWatchError {
    fn from(err: regex::Error) -> Self {
        Self::Internal {
            message: format!("Regex error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SquatWatchError::network("reset").is_retryable());
        assert!(SquatWatchError::timeout("dns", Duration::from_secs(1)).is_retryable());
        assert!(SquatWatchError::rate_limited("rdap", "slow down", None).is_retryable());
        assert!(SquatWatchError::rdap_with_status("a.com", "bad gateway", 502).is_retryable());

        assert!(!SquatWatchError::rdap_with_status("a.com", "forbidden", 403).is_retryable());
        assert!(!SquatWatchError::malformed("rdap", "not json").is_retryable());
        assert!(!SquatWatchError::config("no targets").is_retryable());
    }

    #[test]
    fn test_retry_after_only_for_rate_limits() {
        let limited =
            SquatWatchError::rate_limited("rdap", "429", Some(Duration::from_secs(7)));
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(SquatWatchError::network("x").retry_after(), None);
    }

    #[test]
    fn test_display_includes_context() {
        let err = SquatWatchError::rdap_with_status("paypa1.com", "server error", 503);
        assert_eq!(
            err.to_string(),
            "RDAP error for 'paypa1.com' (HTTP 503): server error"
        );

        let err = SquatWatchError::rate_limited("rdap", "429", Some(Duration::from_secs(2)));
        assert_eq!(err.to_string(), "Rate limited by rdap (retry after 2s): 429");

        let err = SquatWatchError::network("reset");
        assert_eq!(err.to_string(), "Network error: reset");
    }
}
