//! Impersonated-HTTP transport.
//!
//! A direct request presenting a coherent browser surface: impersonation
//! header payload, cookie jar, gzip/brotli acceptance. Fastest and cheapest
//! strategy, and the most likely to be blocked by hardened targets;
//! hence the short body check, since block pages are served as tiny 200s as
//! often as proper 403s.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{
    FailureKind, FetchFailure, FetchResult, StrategyKind, TransportStrategy,
    classify_reqwest_error,
};
use crate::modules::identity::{impersonation_headers, random_user_agent};
use crate::modules::proxy::ProxyEndpoint;
use crate::target::Target;

/// Bodies below this size are treated as block pages.
const DEFAULT_MIN_BODY_LEN: usize = 256;

/// Direct HTTP strategy with a spoofed client surface.
#[derive(Debug, Clone)]
pub struct ImpersonatedHttpStrategy {
    timeout: Duration,
    min_body_len: usize,
}

impl ImpersonatedHttpStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            min_body_len: DEFAULT_MIN_BODY_LEN,
        }
    }

    pub fn with_min_body_len(mut self, len: usize) -> Self {
        self.min_body_len = len;
        self
    }

    fn build_client(
        &self,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<reqwest::Client, FetchFailure> {
        let mut builder = reqwest::Client::builder()
            .default_headers(impersonation_headers(random_user_agent()))
            .cookie_store(true)
            .timeout(self.timeout);

        if let Some(endpoint) = proxy {
            let proxy = reqwest::Proxy::all(&endpoint.address).map_err(|err| {
                FetchFailure::new(self.kind(), FailureKind::Network(err.to_string()))
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|err| FetchFailure::new(self.kind(), FailureKind::Network(err.to_string())))
    }
}

impl Default for ImpersonatedHttpStrategy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl TransportStrategy for ImpersonatedHttpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ImpersonatedHttp
    }

    async fn fetch(
        &self,
        target: &Target,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<FetchResult, FetchFailure> {
        log::info!("impersonated-http fetch: {target}");
        let client = self.build_client(proxy)?;

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

        if !(200..300).contains(&status) || body.len() < self.min_body_len {
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
