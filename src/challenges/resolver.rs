//! Interactive-challenge resolution.
//!
//! Extracts the site key from the live document, obtains a solution token
//! from the external solving service, writes the token back into the
//! response field, and triggers the form's submit control. Resolution
//! mutates the rendered session it was given and must be invoked at most
//! once per attempt; a second call within the same attempt is a caller
//! error.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::Page;
use tokio::time::sleep;
use url::Url;

use super::ChallengeState;
use crate::external_deps::solver::{SolverProvider, SolverTask};

const SITE_KEY_SCRIPT: &str = r#"
    (() => {
        const el = document.querySelector('[data-sitekey]');
        return el ? el.getAttribute('data-sitekey') : '';
    })()
"#;

const SUBMIT_SELECTOR: &str = r#"button[type="submit"], input[type="submit"]"#;

/// How long the page gets to process a submitted token before the caller
/// re-reads the document.
const SUBMIT_SETTLE: Duration = Duration::from_secs(3);

/// Resolves a detected challenge through an external solving service.
pub struct ChallengeResolver {
    provider: Arc<dyn SolverProvider>,
}

impl ChallengeResolver {
    pub fn new(provider: Arc<dyn SolverProvider>) -> Self {
        Self { provider }
    }

    /// Attempt resolution against the live session. Returns an unresolved
    /// state (never an error) on a missing site key, a solving-service
    /// failure, or a missing submit control.
    pub async fn resolve(&self, page: &Page) -> ChallengeState {
        let site_key = match self.extract_site_key(page).await {
            Some(key) => key,
            None => {
                log::warn!("challenge present but no site key found");
                return ChallengeState::unresolved();
            }
        };

        let page_url = match self.current_url(page).await {
            Some(url) => url,
            None => {
                log::warn!("challenge page has no resolvable url");
                return ChallengeState::unresolved();
            }
        };

        let task = SolverTask::new(site_key, page_url);
        let token = match self.provider.solve(&task).await {
            Ok(solution) => solution.token,
            Err(err) => {
                log::warn!("{} could not solve challenge: {err}", self.provider.name());
                return ChallengeState::unresolved();
            }
        };

        if let Err(err) = self.inject_token(page, &token).await {
            log::warn!("token injection failed: {err}");
            return ChallengeState::unresolved();
        }

        match page.find_element(SUBMIT_SELECTOR).await {
            Ok(submit) => {
                if let Err(err) = submit.click().await {
                    log::warn!("challenge submit click failed: {err}");
                    return ChallengeState::unresolved();
                }
            }
            Err(_) => {
                log::warn!("challenge form has no submit control");
                return ChallengeState::unresolved();
            }
        }

        sleep(SUBMIT_SETTLE).await;
        ChallengeState::resolved(token)
    }

    async fn extract_site_key(&self, page: &Page) -> Option<String> {
        let value: String = page
            .evaluate(SITE_KEY_SCRIPT.to_string())
            .await
            .ok()?
            .into_value()
            .ok()?;
        (!value.is_empty()).then_some(value)
    }

    async fn current_url(&self, page: &Page) -> Option<Url> {
        let raw = page.url().await.ok()??;
        Url::parse(&raw).ok()
    }

    async fn inject_token(
        &self,
        page: &Page,
        token: &str,
    ) -> Result<(), chromiumoxide::error::CdpError> {
        // JSON-encode the token so it lands in the page as a literal.
        let encoded = serde_json::to_string(token).unwrap_or_default();
        let script = format!(
            r#"
            (() => {{
                const el = document.querySelector('[name="g-recaptcha-response"]')
                    || document.querySelector('[name="cf-turnstile-response"]');
                if (el) el.value = {encoded};
            }})()
            "#
        );
        page.evaluate(script).await?;
        Ok(())
    }
}
