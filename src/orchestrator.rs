//! High level fetch orchestration.
//!
//! Wires the transport strategies, proxy pool, pacing policy, and challenge
//! handling into a single per-target state machine: route, attempt, fall
//! back, and report. One orchestrator is shared by all workers; the only
//! state it mutates across attempts is the proxy cursor, the counters, and
//! the deferred circuit-renewal flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::challenges::ChallengeResolver;
use crate::external_deps::solver::SolverProvider;
use crate::modules::pacing::PacingPolicy;
use crate::modules::proxy::{ProxyPool, ProxyPoolConfig};
use crate::modules::stats::{Stats, StatsSnapshot};
use crate::strategies::{
    AnonymityNetworkStrategy, FailureKind, FetchFailure, FetchResult, ImpersonatedHttpStrategy,
    RenderedBrowserStrategy, StrategyKind, TransportStrategy,
};
use crate::target::{RouteHint, Target};

/// Which transports and services this process can actually use, resolved
/// once at startup and injected as a value, never probed per call.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub http_impersonation: bool,
    pub browser_automation: bool,
    pub anonymity_network: bool,
    pub challenge_solving: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            http_impersonation: true,
            browser_automation: true,
            anonymity_network: true,
            challenge_solving: true,
        }
    }
}

/// Fluent builder for [`FetchOrchestrator`].
pub struct FetchOrchestratorBuilder {
    capabilities: Capabilities,
    proxies: Option<Arc<ProxyPool>>,
    pacing: PacingPolicy,
    stats: Option<Arc<Stats>>,
    solver: Option<Arc<dyn SolverProvider>>,
    headless: bool,
    attempt_timeout: Duration,
    strategies: Option<Vec<Arc<dyn TransportStrategy>>>,
}

impl FetchOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities::default(),
            proxies: None,
            pacing: PacingPolicy::default(),
            stats: None,
            solver: None,
            headless: true,
            attempt_timeout: Duration::from_secs(30),
            strategies: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_proxy_pool(mut self, pool: Arc<ProxyPool>) -> Self {
        self.proxies = Some(pool);
        self
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_stats(mut self, stats: Arc<Stats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn SolverProvider>) -> Self {
        self.solver = Some(solver);
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Replace the assembled strategy chain. Intended for tests; the chain
    /// is used in the order given and the anonymity-network member (matched
    /// by kind) also serves anonymity-only routing.
    pub fn with_strategies(mut self, strategies: Vec<Arc<dyn TransportStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn build(self) -> FetchOrchestrator {
        let stats = self.stats.unwrap_or_default();
        let proxies = self
            .proxies
            .unwrap_or_else(|| {
                Arc::new(ProxyPool::from_endpoints(
                    Vec::<String>::new(),
                    ProxyPoolConfig::default(),
                ))
            });

        let chain = self.strategies.unwrap_or_else(|| {
            let mut chain: Vec<Arc<dyn TransportStrategy>> = Vec::new();

            if self.capabilities.http_impersonation {
                chain.push(Arc::new(ImpersonatedHttpStrategy::new(self.attempt_timeout)));
            }

            if self.capabilities.browser_automation {
                let resolver = if self.capabilities.challenge_solving {
                    self.solver
                        .clone()
                        .map(|provider| Arc::new(ChallengeResolver::new(provider)))
                } else {
                    None
                };
                chain.push(Arc::new(RenderedBrowserStrategy::new(
                    self.pacing.clone(),
                    resolver,
                    stats.clone(),
                    self.headless,
                    self.attempt_timeout,
                )));
            }

            if self.capabilities.anonymity_network {
                chain.push(Arc::new(AnonymityNetworkStrategy::new(self.attempt_timeout)));
            }

            chain
        });

        FetchOrchestrator {
            chain,
            proxies,
            stats,
            attempt_timeout: self.attempt_timeout,
            renew_pending: AtomicBool::new(false),
        }
    }
}

impl Default for FetchOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-target fallback state machine shared across workers.
pub struct FetchOrchestrator {
    chain: Vec<Arc<dyn TransportStrategy>>,
    proxies: Arc<ProxyPool>,
    stats: Arc<Stats>,
    attempt_timeout: Duration,
    renew_pending: AtomicBool,
}

impl FetchOrchestrator {
    pub fn builder() -> FetchOrchestratorBuilder {
        FetchOrchestratorBuilder::new()
    }

    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn proxy_pool(&self) -> Arc<ProxyPool> {
        self.proxies.clone()
    }

    /// Per-attempt timeout used by the strategies; the dispatcher derives
    /// its per-target deadline from this.
    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Fetch one target: route, walk the fallback chain, stop at the first
    /// success. A target yields at most one [`FetchResult`] per call; when
    /// every strategy fails, only the last failure is reported.
    pub async fn fetch(&self, target: &Target) -> Result<FetchResult, FetchFailure> {
        match target.route() {
            RouteHint::AnonymityOnly => self.fetch_anonymity_only(target).await,
            RouteHint::Standard => self.fetch_with_fallback(target).await,
        }
    }

    /// Terminal branch: hidden-service and force-routed targets can only go
    /// through the anonymity network, so no fallback is attempted.
    async fn fetch_anonymity_only(&self, target: &Target) -> Result<FetchResult, FetchFailure> {
        let Some(strategy) = self.anonymity_strategy() else {
            return Err(FetchFailure::unattributed(FailureKind::SessionInit(
                "anonymity-network transport disabled".into(),
            )));
        };

        // Renewal deferred from an earlier failed attempt runs now, before
        // this target's attempt, never mid-attempt.
        if self.renew_pending.swap(false, Ordering::SeqCst) {
            self.renew_circuit().await;
        }

        let outcome = self.run_attempt(strategy.as_ref(), target, false).await;
        if outcome.is_err() {
            self.renew_pending.store(true, Ordering::SeqCst);
        }
        outcome
    }

    async fn fetch_with_fallback(&self, target: &Target) -> Result<FetchResult, FetchFailure> {
        let mut last_failure: Option<FetchFailure> = None;

        for strategy in &self.chain {
            if strategy.kind() == StrategyKind::AnonymityNetwork {
                // Last resort reached: start it on a fresh circuit. Renewal
                // failure degrades to the existing circuit.
                self.renew_circuit().await;
            }

            let use_pool_proxy = strategy.kind() != StrategyKind::AnonymityNetwork;
            match self.run_attempt(strategy.as_ref(), target, use_pool_proxy).await {
                Ok(result) => return Ok(result),
                Err(failure) => {
                    log::warn!("{failure} for {target}");
                    last_failure = Some(failure);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| {
            FetchFailure::unattributed(FailureKind::SessionInit(
                "no transport strategies enabled".into(),
            ))
        }))
    }

    async fn run_attempt(
        &self,
        strategy: &dyn TransportStrategy,
        target: &Target,
        use_pool_proxy: bool,
    ) -> Result<FetchResult, FetchFailure> {
        let proxy = if use_pool_proxy {
            let endpoint = self.proxies.next();
            self.stats.record_proxy_rotation();
            Some(endpoint)
        } else {
            None
        };

        self.stats.record_request();
        match strategy.fetch(target, proxy.as_ref()).await {
            Ok(result) => {
                self.stats.record_success();
                log::info!("fetched {target} via {}", result.strategy);
                Ok(result)
            }
            Err(failure) => {
                self.stats.record_failure();
                Err(failure)
            }
        }
    }

    async fn renew_circuit(&self) {
        if self.proxies.renew_identity().await {
            self.stats.record_proxy_rotation();
        } else {
            // IdentityRenewalFailed degrades gracefully: the attempt
            // proceeds on whatever circuit exists.
            log::warn!("identity renewal failed, proceeding on existing circuit");
        }
    }

    fn anonymity_strategy(&self) -> Option<&Arc<dyn TransportStrategy>> {
        self.chain
            .iter()
            .find(|strategy| strategy.kind() == StrategyKind::AnonymityNetwork)
    }
}
