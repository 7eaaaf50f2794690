//! Transport strategies.
//!
//! Each strategy performs one fetch attempt against one target and returns
//! either a normalized [`FetchResult`] or a typed [`FetchFailure`], never a
//! panic across the boundary. The orchestrator owns strategy ordering; a
//! strategy knows nothing about the fallback chain it participates in.

pub mod browser;
pub mod impersonate;
pub mod onion;

pub use browser::RenderedBrowserStrategy;
pub use impersonate::ImpersonatedHttpStrategy;
pub use onion::AnonymityNetworkStrategy;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use thiserror::Error;
use url::Url;

use crate::modules::proxy::ProxyEndpoint;
use crate::target::Target;

/// Identifies which transport produced a result or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    ImpersonatedHttp,
    RenderedBrowser,
    AnonymityNetwork,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::ImpersonatedHttp => "impersonated-http",
            StrategyKind::RenderedBrowser => "rendered-browser",
            StrategyKind::AnonymityNetwork => "anonymity-network",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized successful fetch. Produced exactly once per successful attempt
/// and immutable afterwards.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL that was requested.
    pub url: Url,
    /// URL after redirects and challenge handling.
    pub final_url: Url,
    pub strategy: StrategyKind,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub fetched_at: DateTime<Utc>,
}

impl FetchResult {
    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Why a single fetch attempt did not yield a [`FetchResult`].
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("blocked response (status {status}, {body_len} byte body)")]
    Blocked { status: u16, body_len: usize },
    #[error("challenge detected but not resolved")]
    ChallengeUnresolved,
    #[error("session could not be started: {0}")]
    SessionInit(String),
    #[error("identity renewal failed")]
    IdentityRenewal,
    #[error("internal error: {0}")]
    Internal(String),
}

/// Typed failure for one attempt (or, at the dispatcher level, for one
/// target). `strategy` is `None` when the failure happened outside any
/// single strategy: a per-target deadline or an isolated internal fault.
#[derive(Debug, Error)]
#[error("{} attempt failed: {kind}", .strategy.map_or("fetch", StrategyKind::as_str))]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub strategy: Option<StrategyKind>,
}

impl FetchFailure {
    pub fn new(strategy: StrategyKind, kind: FailureKind) -> Self {
        Self {
            kind,
            strategy: Some(strategy),
        }
    }

    /// Failure not attributable to a single strategy.
    pub fn unattributed(kind: FailureKind) -> Self {
        Self {
            kind,
            strategy: None,
        }
    }
}

/// One fetch attempt against one target.
///
/// Implementations convert every library error into a [`FetchFailure`] at
/// this boundary and must release any session resources they acquired on
/// both exit paths.
#[async_trait]
pub trait TransportStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch(
        &self,
        target: &Target,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure>;
}

/// Map a reqwest error to the failure taxonomy shared by the HTTP-based
/// strategies.
pub(crate) fn classify_reqwest_error(
    strategy: StrategyKind,
    timeout: Duration,
    err: reqwest::Error,
) -> FetchFailure {
    let kind = if err.is_timeout() {
        FailureKind::Timeout(timeout)
    } else {
        FailureKind::Network(err.to_string())
    };
    FetchFailure::new(strategy, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_names_the_strategy() {
        let failure = FetchFailure::new(
            StrategyKind::AnonymityNetwork,
            FailureKind::Network("connection refused".into()),
        );
        let rendered = failure.to_string();
        assert!(rendered.contains("anonymity-network"));
        assert!(rendered.contains("connection refused"));
    }

    #[test]
    fn unattributed_failure_display_is_generic() {
        let failure = FetchFailure::unattributed(FailureKind::Timeout(Duration::from_secs(60)));
        assert!(failure.to_string().starts_with("fetch attempt failed"));
    }
}
