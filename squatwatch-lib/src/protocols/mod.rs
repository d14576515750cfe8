//! Network providers used during verification.
//!
//! The checker talks to the outside world through two traits, one per
//! verification phase, so tests can substitute in-memory fakes.

use crate::error::SquatWatchError;
use crate::types::DomainInfo;
use async_trait::async_trait;

/// DNS existence probe (hickory-resolver)
pub mod dns;

/// RDAP registry lookups
pub mod rdap;

/// Registry mappings, presets and bootstrap discovery
pub mod registry;

pub use dns::HickoryDnsProbe;
pub use rdap::{extract_domain_info, RdapClient};
pub use registry::{extract_tld, get_rdap_endpoint, get_rdap_registry_map};

/// Answer from a DNS probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsAnswer {
    /// At least one address or mail record exists
    Resolved,
    /// The resolver affirmatively found nothing
    NoRecord,
}

/// Answer from a registry lookup.
///
/// Rate limiting is reported as `SquatWatchError::RateLimited`.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryAnswer {
    Registered(Option<DomainInfo>),
    NotRegistered,
}

/// Phase one: does the domain have DNS records?
#[async_trait]
pub trait DnsProbe: Send + Sync {
    async fn resolve(&self, domain: &str) -> Result<DnsAnswer, SquatWatchError>;
}

/// Phase two: does the registry hold a registration?
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<RegistryAnswer, SquatWatchError>;
}
