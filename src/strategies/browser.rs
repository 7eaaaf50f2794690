//! Rendered-browser transport.
//!
//! Drives a full browser instance for targets that defeat direct HTTP. Each
//! attempt owns its own session: fresh identity, stealth payload injected
//! before the first navigation, simulated browsing, challenge detection and
//! (when enabled) resolution, then teardown on every exit path, success or
//! failure. Sessions are never shared or handed off between attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig};
use chrono::Utc;
use futures::StreamExt;
use http::HeaderMap;
use tokio::task::JoinHandle;
use url::Url;

use super::{FailureKind, FetchFailure, FetchResult, StrategyKind, TransportStrategy};
use crate::challenges::{ChallengeDetector, ChallengeResolver};
use crate::modules::identity::SessionIdentity;
use crate::modules::pacing::PacingPolicy;
use crate::modules::proxy::ProxyEndpoint;
use crate::modules::stats::Stats;
use crate::modules::stealth::STEALTH_SCRIPT;
use crate::target::Target;

/// Full-browser strategy with challenge handling.
pub struct RenderedBrowserStrategy {
    pacing: PacingPolicy,
    detector: ChallengeDetector,
    resolver: Option<Arc<ChallengeResolver>>,
    stats: Arc<Stats>,
    headless: bool,
    timeout: Duration,
}

impl RenderedBrowserStrategy {
    pub fn new(
        pacing: PacingPolicy,
        resolver: Option<Arc<ChallengeResolver>>,
        stats: Arc<Stats>,
        headless: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            pacing,
            detector: ChallengeDetector::new(),
            resolver,
            stats,
            headless,
            timeout,
        }
    }

    fn session_init(&self, message: impl Into<String>) -> FetchFailure {
        FetchFailure::new(self.kind(), FailureKind::SessionInit(message.into()))
    }

    async fn launch(
        &self,
        identity: &SessionIdentity,
    ) -> Result<(Browser, JoinHandle<()>), FetchFailure> {
        let (width, height) = identity.viewport;
        let mut builder = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg(format!("--window-size={width},{height}"))
            .arg("--lang=en-US,en");

        if !self.headless {
            builder = builder.with_head();
        }

        // SOCKS endpoints are left to the network stack; the browser only
        // takes HTTP proxies on its command line.
        if let Some(endpoint) = &identity.proxy
            && !endpoint.is_socks()
        {
            builder = builder.arg(format!("--proxy-server={}", endpoint.address));
        }

        let config = builder.build().map_err(|err| self.session_init(err))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| self.session_init(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok((browser, handler_task))
    }

    async fn attempt(
        &self,
        browser: &Browser,
        identity: &SessionIdentity,
        target: &Target,
    ) -> Result<FetchResult, FetchFailure> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| self.session_init(err.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(identity.user_agent.clone()))
            .await
            .map_err(|err| self.session_init(err.to_string()))?;

        // Fixed countermeasure payload, applied once before navigation.
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|err| self.session_init(err.to_string()))?;

        match tokio::time::timeout(self.timeout, page.goto(target.url().as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => {
                return Err(FetchFailure::new(
                    self.kind(),
                    FailureKind::Network(err.to_string()),
                ));
            }
            Err(_) => {
                return Err(FetchFailure::new(
                    self.kind(),
                    FailureKind::Timeout(self.timeout),
                ));
            }
        }

        self.pacing.simulate_browsing(&page).await;

        let mut html = page
            .content()
            .await
            .map_err(|err| FetchFailure::new(self.kind(), FailureKind::Network(err.to_string())))?;

        if self.detector.detect_html(&html) {
            log::warn!("challenge detected on {target}");
            let resolver = self.resolver.as_ref().ok_or_else(|| {
                FetchFailure::new(self.kind(), FailureKind::ChallengeUnresolved)
            })?;

            let state = resolver.resolve(&page).await;
            if !state.solved {
                return Err(FetchFailure::new(
                    self.kind(),
                    FailureKind::ChallengeUnresolved,
                ));
            }
            self.stats.record_challenge_solved();

            html = page.content().await.map_err(|err| {
                FetchFailure::new(self.kind(), FailureKind::Network(err.to_string()))
            })?;
        }

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|raw| Url::parse(&raw).ok())
            .unwrap_or_else(|| target.url().clone());

        Ok(FetchResult {
            url: target.url().clone(),
            final_url,
            strategy: self.kind(),
            // The protocol layer does not surface the navigation status; a
            // rendered document is normalized to 200.
            status: 200,
            headers: HeaderMap::new(),
            body: Bytes::from(html),
            fetched_at: Utc::now(),
        })
    }

    async fn teardown(mut browser: Browser, handler_task: JoinHandle<()>) {
        if let Err(err) = browser.close().await {
            log::debug!("browser close failed: {err}");
        }
        let _ = browser.wait().await;
        handler_task.abort();
    }
}

#[async_trait]
impl TransportStrategy for RenderedBrowserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RenderedBrowser
    }

    async fn fetch(
        &self,
        target: &Target,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure> {
        log::info!("rendered-browser fetch: {target}");
        let identity = SessionIdentity::generate(proxy.cloned());
        let (browser, handler_task) = self.launch(&identity).await?;

        let outcome = self.attempt(&browser, &identity, target).await;
        Self::teardown(browser, handler_task).await;
        outcome
    }
}
