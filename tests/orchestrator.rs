//! Fallback-chain and batch-dispatch behavior, exercised with scripted
//! transport strategies so no network, browser, or egress daemon is needed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::HeaderMap;

use polyfetch::dispatch::{BatchDispatcher, RunMode};
use polyfetch::modules::pacing::{PacingConfig, PacingPolicy};
use polyfetch::modules::proxy::{ProxyPool, ProxyPoolConfig};
use polyfetch::orchestrator::FetchOrchestrator;
use polyfetch::strategies::{
    FailureKind, FetchFailure, FetchResult, StrategyKind, TransportStrategy,
};
use polyfetch::target::Target;
use polyfetch::{CircuitControl, ProxyEndpoint};

/// Strategy that plays back a fixed success/failure script, one entry per
/// call, and counts how often it was invoked.
struct ScriptedStrategy {
    kind: StrategyKind,
    script: Mutex<VecDeque<bool>>,
    calls: AtomicUsize,
}

impl ScriptedStrategy {
    fn new(kind: StrategyKind, script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            kind,
            script: Mutex::new(script.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn scripted_failure(&self) -> FailureKind {
        match self.kind {
            StrategyKind::ImpersonatedHttp => FailureKind::Blocked {
                status: 403,
                body_len: 0,
            },
            StrategyKind::RenderedBrowser => FailureKind::SessionInit("scripted".into()),
            StrategyKind::AnonymityNetwork => FailureKind::Network("scripted".into()),
        }
    }
}

#[async_trait]
impl TransportStrategy for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn fetch(
        &self,
        target: &Target,
        _proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let success = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false);
        if success {
            Ok(scripted_result(target, self.kind))
        } else {
            Err(FetchFailure::new(self.kind, self.scripted_failure()))
        }
    }
}

/// Strategy that never completes; used to exercise the per-target deadline.
struct HangingStrategy;

#[async_trait]
impl TransportStrategy for HangingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImpersonatedHttp
    }

    async fn fetch(
        &self,
        _target: &Target,
        _proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        unreachable!("hanging strategy should be abandoned by the deadline")
    }
}

fn scripted_result(target: &Target, strategy: StrategyKind) -> FetchResult {
    FetchResult {
        url: target.url().clone(),
        final_url: target.url().clone(),
        strategy,
        status: 200,
        headers: HeaderMap::new(),
        body: Bytes::from_static(b"<html>scripted body</html>"),
        fetched_at: Utc::now(),
    }
}

/// Pool whose circuit renewal fails instantly (refused port, zero settle) so
/// tests never wait on a real control endpoint.
fn test_pool() -> Arc<ProxyPool> {
    Arc::new(ProxyPool::from_endpoints(
        Vec::<String>::new(),
        ProxyPoolConfig {
            renewal_settle: Duration::ZERO,
            control: CircuitControl::new("127.0.0.1:1", None),
            ..Default::default()
        },
    ))
}

fn orchestrator_with(chain: Vec<Arc<dyn TransportStrategy>>) -> Arc<FetchOrchestrator> {
    Arc::new(
        FetchOrchestrator::builder()
            .with_strategies(chain)
            .with_proxy_pool(test_pool())
            .with_pacing(PacingPolicy::new(PacingConfig::instant()))
            .build(),
    )
}

fn instant_dispatcher(orchestrator: Arc<FetchOrchestrator>) -> BatchDispatcher {
    BatchDispatcher::new(orchestrator, PacingPolicy::new(PacingConfig::instant()))
}

#[tokio::test]
async fn anonymity_only_targets_skip_the_fallback_chain() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[true]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[true]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[true]);
    let orchestrator = orchestrator_with(vec![http.clone(), browser.clone(), onion.clone()]);

    let target = Target::new("http://expyuzz4wqqyqhjn.onion/").unwrap();
    let result = orchestrator.fetch(&target).await.unwrap();

    assert_eq!(result.strategy, StrategyKind::AnonymityNetwork);
    assert_eq!(http.calls(), 0);
    assert_eq!(browser.calls(), 0);
    assert_eq!(onion.calls(), 1);
}

#[tokio::test]
async fn first_success_short_circuits_the_chain() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[true]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[true]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[true]);
    let orchestrator = orchestrator_with(vec![http.clone(), browser.clone(), onion.clone()]);

    let target = Target::new("https://example.com/").unwrap();
    let result = orchestrator.fetch(&target).await.unwrap();

    assert_eq!(result.strategy, StrategyKind::ImpersonatedHttp);
    assert_eq!(http.calls(), 1);
    assert_eq!(browser.calls(), 0);
    assert_eq!(onion.calls(), 0);
}

#[tokio::test]
async fn fallback_advances_in_fixed_order() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[false]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[true]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[true]);
    let orchestrator = orchestrator_with(vec![http.clone(), browser.clone(), onion.clone()]);

    let target = Target::new("https://example.com/").unwrap();
    let result = orchestrator.fetch(&target).await.unwrap();

    assert_eq!(result.strategy, StrategyKind::RenderedBrowser);
    assert_eq!(http.calls(), 1);
    assert_eq!(browser.calls(), 1);
    assert_eq!(onion.calls(), 0);
}

#[tokio::test]
async fn exhausted_chain_reports_only_the_last_failure() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[false]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[false]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[false]);
    let orchestrator = orchestrator_with(vec![http.clone(), browser.clone(), onion.clone()]);

    let target = Target::new("https://example.com/").unwrap();
    let failure = orchestrator.fetch(&target).await.unwrap_err();

    assert_eq!(http.calls(), 1);
    assert_eq!(browser.calls(), 1);
    assert_eq!(onion.calls(), 1);
    assert_eq!(failure.strategy, Some(StrategyKind::AnonymityNetwork));
    assert!(matches!(failure.kind, FailureKind::Network(_)));
}

#[tokio::test]
async fn anonymity_routing_without_the_strategy_fails_cleanly() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[true]);
    let orchestrator = orchestrator_with(vec![http.clone()]);

    let target = Target::new("http://expyuzz4wqqyqhjn.onion/").unwrap();
    let failure = orchestrator.fetch(&target).await.unwrap_err();

    assert_eq!(http.calls(), 0);
    assert_eq!(failure.strategy, None);
    assert!(matches!(failure.kind, FailureKind::SessionInit(_)));
}

#[tokio::test]
async fn sequential_batch_yields_one_record_per_target() {
    // A succeeds on impersonated HTTP, B falls back to the browser, C
    // exhausts all three strategies.
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[true, false, false]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[true, false]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[false]);
    let orchestrator = orchestrator_with(vec![http.clone(), browser.clone(), onion.clone()]);
    let dispatcher = instant_dispatcher(orchestrator);

    let targets = vec![
        Target::new("https://a.example.com/").unwrap(),
        Target::new("https://b.example.com/").unwrap(),
        Target::new("https://c.example.com/").unwrap(),
    ];
    let batch = dispatcher.run(targets, RunMode::Sequential).await;

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.success_count(), 2);
    assert_eq!(batch.failure_count(), 1);

    let strategies: Vec<StrategyKind> = batch.successes().map(|r| r.strategy).collect();
    assert_eq!(
        strategies,
        vec![StrategyKind::ImpersonatedHttp, StrategyKind::RenderedBrowser]
    );

    let (failed_target, failure) = batch.failures().next().unwrap();
    assert_eq!(failed_target.host(), "c.example.com");
    assert_eq!(failure.strategy, Some(StrategyKind::AnonymityNetwork));
    assert!(matches!(failure.kind, FailureKind::Network(_)));
}

#[tokio::test]
async fn concurrent_batch_preserves_input_order() {
    let http = ScriptedStrategy::new(
        StrategyKind::ImpersonatedHttp,
        &[true, true, true, true, true],
    );
    let orchestrator = orchestrator_with(vec![http.clone()]);
    let dispatcher = instant_dispatcher(orchestrator);

    let hosts = ["a", "b", "c", "d", "e"];
    let targets: Vec<Target> = hosts
        .iter()
        .map(|h| Target::new(&format!("https://{h}.example.com/")).unwrap())
        .collect();
    let batch = dispatcher
        .run(targets, RunMode::Concurrent { workers: 3 })
        .await;

    assert_eq!(batch.len(), 5);
    assert_eq!(batch.success_count(), 5);
    let ordered: Vec<String> = batch
        .outcomes
        .iter()
        .map(|record| record.target.host().to_string())
        .collect();
    let expected: Vec<String> = hosts
        .iter()
        .map(|h| format!("{h}.example.com"))
        .collect();
    assert_eq!(ordered, expected);
}

#[tokio::test]
async fn per_target_deadline_converts_hangs_into_timeouts() {
    let orchestrator = orchestrator_with(vec![Arc::new(HangingStrategy)]);
    let dispatcher = instant_dispatcher(orchestrator)
        .with_per_target_timeout(Duration::from_millis(50));

    let targets = vec![
        Target::new("https://slow.example.com/").unwrap(),
        Target::new("https://also-slow.example.com/").unwrap(),
    ];
    let batch = dispatcher
        .run(targets, RunMode::Concurrent { workers: 2 })
        .await;

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.failure_count(), 2);
    for (_, failure) in batch.failures() {
        assert_eq!(failure.strategy, None);
        assert!(matches!(failure.kind, FailureKind::Timeout(_)));
    }
}

#[tokio::test]
async fn stats_reflect_attempts_and_outcomes() {
    let http = ScriptedStrategy::new(StrategyKind::ImpersonatedHttp, &[false]);
    let browser = ScriptedStrategy::new(StrategyKind::RenderedBrowser, &[true]);
    let onion = ScriptedStrategy::new(StrategyKind::AnonymityNetwork, &[true]);
    let orchestrator = orchestrator_with(vec![http, browser, onion]);

    let target = Target::new("https://example.com/").unwrap();
    orchestrator.fetch(&target).await.unwrap();

    let snapshot = orchestrator.stats_snapshot();
    assert_eq!(snapshot.requests, 2);
    assert_eq!(snapshot.successes, 1);
    assert_eq!(snapshot.failures, 1);
}
