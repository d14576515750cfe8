//! DNS existence probe backed by hickory-resolver.
//!
//! A domain "resolves" if it has any address record (A/AAAA, following
//! CNAMEs) or an MX record. A negative answer from the resolver is a result,
//! not an error.

use super::{DnsAnswer, DnsProbe};
use crate::error::SquatWatchError;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tracing::debug;

/// DNS probe using the system-independent default upstream resolvers.
#[derive(Clone)]
pub struct HickoryDnsProbe {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl HickoryDnsProbe {
    /// Create a probe with a per-query timeout.
    ///
    /// The resolver makes a single attempt per query; retries are driven by
    /// the checker so they share its backoff and rate limit.
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
            timeout,
        }
    }
}

impl Default for HickoryDnsProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl DnsProbe for HickoryDnsProbe {
    async fn resolve(&self, domain: &str) -> Result<DnsAnswer, SquatWatchError> {
        // Trailing dot keeps search domains out of the query
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        match self.resolver.lookup_ip(fqdn.as_str()).await {
            Ok(lookup) if lookup.iter().next().is_some() => {
                debug!("{} has address records", domain);
                return Ok(DnsAnswer::Resolved);
            }
            Ok(_) => {}
            Err(err) => {
                // no address records; fall through to MX
                classify_resolve_error(domain, err, self.timeout)?;
            }
        }

        match self.resolver.mx_lookup(fqdn.as_str()).await {
            Ok(mx) if mx.iter().next().is_some() => {
                debug!("{} has MX records", domain);
                Ok(DnsAnswer::Resolved)
            }
            Ok(_) => Ok(DnsAnswer::NoRecord),
            Err(err) => classify_resolve_error(domain, err, self.timeout),
        }
    }
}

/// Turn a resolver error into a probe answer or a classified error.
///
/// NXDOMAIN and empty answers mean "no record". Server failures, timeouts
/// and transport problems are transient. Other protocol errors mean the
/// answer could not be parsed.
pub fn classify_resolve_error(
    domain: &str,
    err: ResolveError,
    timeout: Duration,
) -> Result<DnsAnswer, SquatWatchError> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::ServFail | ResponseCode::Refused => Err(SquatWatchError::dns(
                domain,
                format!("resolver answered {}", response_code),
            )),
            _ => Ok(DnsAnswer::NoRecord),
        },
        ResolveErrorKind::Timeout => Err(SquatWatchError::timeout(
            format!("DNS lookup for {}", domain),
            timeout,
        )),
        ResolveErrorKind::Proto(e) => match e.kind() {
            ProtoErrorKind::Timeout => Err(SquatWatchError::timeout(
                format!("DNS lookup for {}", domain),
                timeout,
            )),
            ProtoErrorKind::Io(_) | ProtoErrorKind::Busy => {
                Err(SquatWatchError::dns(domain, e.to_string()))
            }
            _ => Err(SquatWatchError::malformed("DNS", e.to_string())),
        },
        _ => Err(SquatWatchError::dns(domain, err.to_string())),
    }
}
