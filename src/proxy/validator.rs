//! Validation coordinator probing candidates concurrently

use crate::proxy::models::{LiveProxy, ProbeOutcome, ProxyCandidate, ValidatedProxySet};
use crate::proxy::prober::{Prober, DEFAULT_PROBE_TIMEOUT_SECS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default number of probes in flight at once
const DEFAULT_CONCURRENCY: usize = 64;

/// Configuration for the validator
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Connect timeout for each probe
    pub timeout: Duration,
    /// Maximum number of probes in flight
    pub concurrency: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

/// Fans probes out over a bounded pool and keeps the reachable candidates
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    prober: Prober,
}

impl Validator {
    /// Create a new validator with default configuration
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a new validator with custom configuration
    pub fn with_config(config: ValidatorConfig) -> Self {
        let prober = Prober::new(config.timeout);
        Self { config, prober }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Number of probes allowed in flight for `total` candidates
    ///
    /// Never zero, never more than there are candidates, and always within
    /// what a tokio semaphore can hold.
    pub fn pool_size(&self, total: usize) -> usize {
        self.config
            .concurrency
            .min(total)
            .min(Semaphore::MAX_PERMITS)
            .max(1)
    }

    /// Probe every candidate once and return the reachable ones
    ///
    /// Does not return until every probe has finished.
    pub async fn validate(&self, candidates: Vec<ProxyCandidate>) -> ValidatedProxySet {
        self.validate_until(candidates, CancellationToken::new())
            .await
    }

    /// Like [`Validator::validate`], but stops early when `cancel` fires
    ///
    /// On cancellation no further probes are scheduled, the ones in flight are
    /// aborted and whatever was found reachable so far is returned.
    pub async fn validate_until(
        &self,
        candidates: Vec<ProxyCandidate>,
        cancel: CancellationToken,
    ) -> ValidatedProxySet {
        if candidates.is_empty() {
            debug!("No candidates to validate");
            return ValidatedProxySet::empty();
        }

        let total = candidates.len();
        let live: Arc<Mutex<Vec<LiveProxy>>> = Arc::new(Mutex::new(Vec::new()));
        let pool_size = self.pool_size(total);
        let permits = Arc::new(Semaphore::new(pool_size));
        let mut tasks = JoinSet::new();
        let mut scheduled = 0usize;

        debug!(
            candidates = total,
            concurrency = pool_size,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Validating proxy candidates"
        );

        for candidate in candidates {
            // Waiting for a permit here keeps at most `pool_size` probes alive.
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let prober = self.prober.clone();
            let live = Arc::clone(&live);
            tasks.spawn(async move {
                let _permit = permit;
                let result = prober.check(candidate).await;
                match result.outcome {
                    ProbeOutcome::Reachable => {
                        let entry =
                            LiveProxy::new(result.candidate, result.elapsed_ms.unwrap_or_default());
                        live.lock().await.push(entry);
                    }
                    ref outcome => {
                        warn!(
                            address = %result.candidate.address,
                            port = result.candidate.port,
                            kind = %outcome.kind(),
                            "Proxy probe failed: {}",
                            outcome
                        );
                    }
                }
            });
            scheduled += 1;
        }

        let mut cancelled = cancel.is_cancelled();
        while !cancelled {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => cancelled = true,
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) if e.is_panic() => error!("Probe task panicked: {}", e),
                    Some(Err(_)) => {}
                    None => break,
                },
            }
        }

        if cancelled {
            warn!(
                scheduled,
                pending = tasks.len(),
                "Validation cancelled, returning partial results"
            );
            tasks.abort_all();
        }

        let entries = std::mem::take(&mut *live.lock().await);
        info!(
            probed = scheduled,
            reachable = entries.len(),
            "Proxy validation finished"
        );

        ValidatedProxySet::new(entries, scheduled)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
