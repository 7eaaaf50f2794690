//! TwoCaptcha adapter: submit a task, then poll until a token is ready.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::sleep;

use super::{SolverConfig, SolverError, SolverProvider, SolverResult, SolverSolution, SolverTask};

const DEFAULT_API_BASE: &str = "https://2captcha.com";
const NOT_READY: &str = "CAPCHA_NOT_READY";

/// HTTP client for the classic submit/poll solving API.
#[derive(Debug, Clone)]
pub struct TwoCaptchaClient {
    api_key: String,
    api_base: String,
    config: SolverConfig,
    http: reqwest::Client,
}

impl TwoCaptchaClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(api_key, SolverConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: SolverConfig) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn submit(&self, task: &SolverTask) -> Result<String, SolverError> {
        let response: Value = self
            .http
            .post(format!("{}/in.php", self.api_base))
            .form(&[
                ("key", self.api_key.as_str()),
                ("method", "userrecaptcha"),
                ("googlekey", task.site_key.as_str()),
                ("pageurl", task.page_url.as_str()),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if response["status"].as_i64() == Some(1) {
            match response["request"].as_str() {
                Some(id) => Ok(id.to_string()),
                None => Err(SolverError::Service("missing task id in reply".into())),
            }
        } else {
            Err(SolverError::Service(
                response["request"].as_str().unwrap_or("unknown").to_string(),
            ))
        }
    }

    async fn poll(&self, task_id: &str) -> Result<Option<String>, SolverError> {
        let response: Value = self
            .http
            .get(format!("{}/res.php", self.api_base))
            .query(&[
                ("key", self.api_key.as_str()),
                ("action", "get"),
                ("id", task_id),
                ("json", "1"),
            ])
            .send()
            .await?
            .json()
            .await?;

        if response["status"].as_i64() == Some(1) {
            match response["request"].as_str() {
                Some(token) => Ok(Some(token.to_string())),
                None => Err(SolverError::Service("missing token in reply".into())),
            }
        } else if response["request"].as_str() == Some(NOT_READY) {
            Ok(None)
        } else {
            Err(SolverError::Service(
                response["request"].as_str().unwrap_or("unknown").to_string(),
            ))
        }
    }
}

#[async_trait]
impl SolverProvider for TwoCaptchaClient {
    fn name(&self) -> &'static str {
        "twocaptcha"
    }

    async fn solve(&self, task: &SolverTask) -> SolverResult {
        if self.api_key.is_empty() {
            return Err(SolverError::Configuration("empty API key".into()));
        }

        let task_id = self.submit(task).await?;
        log::debug!("solver accepted task {task_id}");

        let deadline = Instant::now() + self.config.timeout;
        loop {
            sleep(self.config.poll_interval).await;
            if let Some(token) = self.poll(&task_id).await? {
                return Ok(SolverSolution { token });
            }
            if Instant::now() >= deadline {
                return Err(SolverError::Timeout(self.config.timeout));
            }
        }
    }
}
