//! Two-phase availability checker.
//!
//! Each candidate moves through a small state machine:
//!
//! ```text
//! DnsPending ──resolved──────────────────────────────▶ Classified(taken)
//!     │
//!     ├─no-record──▶ RegistryPending ──registered─────▶ Classified(taken)
//!     │                    │
//!     │                    ├─not-registered───────────▶ Classified(available)
//!     │                    └─unknown──────────────────▶ Classified(indeterminate)
//!     │
//!     └─query-failed──▶ RegistryPending ──registered──▶ Classified(taken)
//!                          └─anything else────────────▶ Classified(indeterminate)
//! ```
//!
//! A candidate is only ever "available" when DNS found nothing and the
//! registry affirmatively reported no registration. Every failure mode ends
//! in "indeterminate".

use crate::concurrent::{deadline_after, would_pass, RateLimiter};
use crate::error::SquatWatchError;
use crate::protocols::{
    DnsAnswer, DnsProbe, HickoryDnsProbe, RdapClient, RegistryAnswer, RegistryLookup,
};
use crate::types::{
    Candidate, Classification, DnsOutcome, DomainInfo, OutcomeReason, RegistryOutcome,
    VerificationConfig, VerificationResult,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Verification state of one candidate.
#[derive(Debug, Clone, PartialEq)]
enum CheckState {
    DnsPending,
    RegistryPending,
    Classified(Classification, OutcomeReason),
}

/// How one phase ended.
enum PhaseResult<T> {
    Answered(T),
    Failed(SquatWatchError),
    /// `attempted` is set when an attempt failed before time ran out
    DeadlineExceeded { attempted: bool },
}

/// Checks candidate domains with a DNS probe followed by a registry lookup.
///
/// Providers sit behind traits so the checker can be driven by in-memory
/// fakes in tests.
///
/// # Example
///
/// ```rust,no_run
/// use squatwatch_lib::{AvailabilityChecker, Candidate, StrategyId, VerificationConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = AvailabilityChecker::new(VerificationConfig::default())?;
///     let candidate = Candidate::new("paypa1", "com", "paypal", StrategyId::Homoglyph);
///     let result = checker.check(candidate).await;
///     println!("{}: {}", result.candidate.domain, result.classification);
///     Ok(())
/// }
/// ```
pub struct AvailabilityChecker {
    config: VerificationConfig,
    dns: Arc<dyn DnsProbe>,
    registry: Arc<dyn RegistryLookup>,
    limiter: Arc<RateLimiter>,
}

impl AvailabilityChecker {
    /// Create a checker backed by hickory DNS and RDAP.
    pub fn new(config: VerificationConfig) -> Result<Self, SquatWatchError> {
        let dns = Arc::new(HickoryDnsProbe::new(config.dns_timeout));
        let rdap = Arc::new(RdapClient::with_config(
            config.rdap_timeout,
            config.use_bootstrap,
        )?);
        Ok(Self::with_providers(config, dns, rdap))
    }

    /// Create a checker with custom providers.
    pub fn with_providers(
        config: VerificationConfig,
        dns: Arc<dyn DnsProbe>,
        registry: Arc<dyn RegistryLookup>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.max_requests_per_second));
        Self {
            config,
            dns,
            registry,
            limiter,
        }
    }

    /// Share an existing rate limiter instead of the checker's own.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.limiter)
    }

    /// Check one candidate, applying the configured deadline from now.
    pub async fn check(&self, candidate: Candidate) -> VerificationResult {
        let deadline = deadline_after(self.config.deadline);
        self.check_until(candidate, deadline).await
    }

    /// Check one candidate against an absolute deadline.
    ///
    /// Never fails: provider errors are folded into the result.
    pub async fn check_until(
        &self,
        candidate: Candidate,
        deadline: Option<Instant>,
    ) -> VerificationResult {
        let started = Instant::now();
        let domain = candidate.domain.clone();

        let mut attempts = 0u32;
        let mut dns = DnsOutcome::NotRun;
        let mut registry = RegistryOutcome::NotRun;
        let mut info: Option<DomainInfo> = None;
        let mut state = CheckState::DnsPending;

        let (classification, reason) = loop {
            state = match state {
                CheckState::DnsPending => {
                    let phase = self
                        .run_phase("DNS", &domain, deadline, &mut attempts, || {
                            self.dns.resolve(&domain)
                        })
                        .await;

                    match phase {
                        PhaseResult::Answered(DnsAnswer::Resolved) => {
                            dns = DnsOutcome::Resolves;
                            CheckState::Classified(Classification::Taken, OutcomeReason::DnsResolved)
                        }
                        PhaseResult::Answered(DnsAnswer::NoRecord) => {
                            dns = DnsOutcome::NoRecord;
                            CheckState::RegistryPending
                        }
                        PhaseResult::Failed(err) => {
                            warn!("DNS probe failed for {}: {}", domain, err);
                            dns = DnsOutcome::QueryFailed;
                            CheckState::RegistryPending
                        }
                        PhaseResult::DeadlineExceeded { attempted } => {
                            if attempted {
                                dns = DnsOutcome::QueryFailed;
                            }
                            CheckState::Classified(
                                Classification::Indeterminate,
                                OutcomeReason::DeadlineExceeded,
                            )
                        }
                    }
                }
                CheckState::RegistryPending => {
                    let phase = self
                        .run_phase("RDAP", &domain, deadline, &mut attempts, || {
                            self.registry.lookup(&domain)
                        })
                        .await;

                    match phase {
                        PhaseResult::Answered(RegistryAnswer::Registered(details)) => {
                            registry = RegistryOutcome::Registered;
                            info = details;
                            CheckState::Classified(
                                Classification::Taken,
                                OutcomeReason::RegistryRegistered,
                            )
                        }
                        PhaseResult::Answered(RegistryAnswer::NotRegistered) => {
                            registry = RegistryOutcome::NotRegistered;
                            CheckState::Classified(
                                classify(dns, registry),
                                if dns == DnsOutcome::QueryFailed {
                                    OutcomeReason::DnsQueryFailed
                                } else {
                                    OutcomeReason::RegistryNotRegistered
                                },
                            )
                        }
                        PhaseResult::Failed(err) => {
                            warn!("Registry lookup failed for {}: {}", domain, err);
                            registry = RegistryOutcome::Unknown;
                            CheckState::Classified(
                                Classification::Indeterminate,
                                if dns == DnsOutcome::QueryFailed {
                                    OutcomeReason::DnsQueryFailed
                                } else {
                                    OutcomeReason::RegistryUnknown
                                },
                            )
                        }
                        PhaseResult::DeadlineExceeded { attempted } => {
                            if attempted {
                                registry = RegistryOutcome::Unknown;
                            }
                            CheckState::Classified(
                                Classification::Indeterminate,
                                OutcomeReason::DeadlineExceeded,
                            )
                        }
                    }
                }
                CheckState::Classified(classification, reason) => break (classification, reason),
            };
        };

        debug!(
            "{} classified {} ({}) after {} retries",
            domain, classification, reason, attempts
        );

        VerificationResult {
            candidate,
            dns,
            registry,
            classification,
            reason,
            checked_at: Utc::now(),
            attempts,
            duration: Some(started.elapsed()),
            info,
        }
    }

    /// Run one phase with rate limiting, retries and backoff.
    ///
    /// Each attempt takes a rate-limit token first. No attempt starts once
    /// the deadline has passed, and a retry whose backoff would end after the
    /// deadline is not scheduled. Malformed answers are never retried.
    async fn run_phase<T, F, Fut>(
        &self,
        service: &str,
        domain: &str,
        deadline: Option<Instant>,
        attempts: &mut u32,
        mut op: F,
    ) -> PhaseResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SquatWatchError>>,
    {
        let mut retry = 0u32;

        loop {
            let attempted = retry > 0;
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return PhaseResult::DeadlineExceeded { attempted };
            }
            if !self.limiter.acquire_before(deadline).await {
                return PhaseResult::DeadlineExceeded { attempted };
            }

            let err = match op().await {
                Ok(answer) => return PhaseResult::Answered(answer),
                Err(err) => err,
            };

            if err.is_malformed() || !err.is_retryable() {
                return PhaseResult::Failed(err);
            }

            if retry >= self.config.max_retries {
                warn!(
                    "{} retries exhausted for {} after {} attempts",
                    service,
                    domain,
                    retry + 1
                );
                return PhaseResult::Failed(err);
            }

            let delay = match &err {
                SquatWatchError::RateLimited { retry_after, .. } => {
                    self.config.rate_limit_delay(retry, *retry_after)
                }
                _ => self.config.backoff_delay(retry),
            };

            if deadline.is_some_and(|d| would_pass(d, delay)) {
                return PhaseResult::DeadlineExceeded { attempted: true };
            }

            debug!(
                "{} attempt {} for {} failed ({}), retrying in {:?}",
                service,
                retry + 1,
                domain,
                err,
                delay
            );

            retry += 1;
            *attempts += 1;
            tokio::time::sleep(delay).await;
        }
    }
}

/// Final classification from the two phase outcomes.
///
/// Only a clean DNS miss plus an affirmative registry "not registered" yields
/// available.
pub fn classify(dns: DnsOutcome, registry: RegistryOutcome) -> Classification {
    match (dns, registry) {
        (DnsOutcome::Resolves, _) | (_, RegistryOutcome::Registered) => Classification::Taken,
        (DnsOutcome::NoRecord, RegistryOutcome::NotRegistered) => Classification::Available,
        _ => Classification::Indeterminate,
    }
}
