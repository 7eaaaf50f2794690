//! Anonymity-network transport.
//!
//! Routes through the fixed local SOCKS egress. The only strategy that can
//! reach hidden services, and the method of last resort for everything
//! else. Circuit renewal is the orchestrator's concern; this strategy only
//! performs the fetch on whatever circuit currently exists.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    FailureKind, FetchFailure, FetchResult, StrategyKind, TransportStrategy,
    classify_reqwest_error,
};
use crate::modules::identity::random_user_agent;
use crate::modules::proxy::{ANONYMITY_EGRESS, ProxyEndpoint};
use crate::target::Target;

/// Fetch through the local anonymity-network egress.
#[derive(Debug, Clone)]
pub struct AnonymityNetworkStrategy {
    egress: String,
    timeout: Duration,
}

impl AnonymityNetworkStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            egress: ANONYMITY_EGRESS.to_string(),
            timeout,
        }
    }

    pub fn with_egress(mut self, egress: impl Into<String>) -> Self {
        self.egress = egress.into();
        self
    }
}

impl Default for AnonymityNetworkStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl TransportStrategy for AnonymityNetworkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AnonymityNetwork
    }

    // The pool-supplied proxy is ignored: egress is fixed by construction.
    async fn fetch(
        &self,
        target: &Target,
        _proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure> {
        log::info!("anonymity-network fetch: {target}");

        let proxy = reqwest::Proxy::all(&self.egress).map_err(|err| {
            FetchFailure::new(self.kind(), FailureKind::Network(err.to_string()))
        })?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .user_agent(random_user_agent())
            .timeout(self.timeout)
            .build()
            .map_err(|err| FetchFailure::new(self.kind(), FailureKind::Network(err.to_string())))?;

        let response = client
            .get(target.url().clone())
            .send()
            .await
            .map_err(|err| classify_reqwest_error(self.kind(), self.timeout, err))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| classify_reqwest_error(self.kind(), self.timeout, err))?;

        if !(200..300).contains(&status) {
            return Err(FetchFailure::new(
                self.kind(),
                FailureKind::Blocked {
                    status,
                    body_len: body.len(),
                },
            ));
        }

        Ok(FetchResult {
            url: target.url().clone(),
            final_url,
            strategy: self.kind(),
            status,
            headers,
            body,
            fetched_at: Utc::now(),
        })
    }
}
