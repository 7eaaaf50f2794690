//! Challenge-solving service integrations.
//!
//! These adapters provide a unified interface to third-party solving
//! services. The resolver stays agnostic of vendor-specific details while
//! still obtaining solution tokens when a target presents an interactive
//! challenge.

mod twocaptcha;

pub use twocaptcha::TwoCaptchaClient;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Controls how long a solve may take end to end.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Details describing the challenge the target presented.
#[derive(Debug, Clone)]
pub struct SolverTask {
    pub site_key: String,
    pub page_url: Url,
}

impl SolverTask {
    pub fn new(site_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
        }
    }
}

/// Solution token returned by a provider.
#[derive(Debug, Clone)]
pub struct SolverSolution {
    pub token: String,
}

pub type SolverResult = Result<SolverSolution, SolverError>;

/// Shared interface implemented by solving-service vendors.
#[async_trait]
pub trait SolverProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn solve(&self, task: &SolverTask) -> SolverResult;
}

/// Errors surfaced by solving-service providers. These never escape the
/// resolver; it converts any of them into an unsolved outcome.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver misconfigured: {0}")]
    Configuration(String),
    #[error("solver request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("solver rejected the task: {0}")]
    Service(String),
    #[error("solving timed out after {0:?}")]
    Timeout(Duration),
}
