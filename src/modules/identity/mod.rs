//! Per-attempt session identity.
//!
//! An identity bundles the egress proxy, a user-agent string, and randomized
//! window geometry for one browser-backed attempt. Identities are created at
//! attempt start, owned exclusively by that attempt, and dropped with it.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::modules::proxy::ProxyEndpoint;

/// Realistic desktop browser user agents.
pub static USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Pick a user agent from the fixed set.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Ephemeral identity for one browser-backed attempt. Never shared across
/// concurrent attempts.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub proxy: Option<ProxyEndpoint>,
    pub user_agent: String,
    /// Window geometry in pixels.
    pub viewport: (u32, u32),
}

impl SessionIdentity {
    pub fn generate(proxy: Option<ProxyEndpoint>) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            proxy,
            user_agent: random_user_agent().to_string(),
            viewport: (rng.gen_range(1800..=1920), rng.gen_range(900..=1080)),
        }
    }
}

/// Fixed browser-impersonation header payload for the direct HTTP strategy.
/// The orchestrator treats this as opaque; it only matters that every
/// request presents the same coherent browser surface.
pub fn impersonation_headers(user_agent: &str) -> HeaderMap {
    let pairs: &[(&str, &str)] = &[
        ("user-agent", user_agent),
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("accept-language", "en-US,en;q=0.9"),
        (
            "sec-ch-ua",
            "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\"",
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
        ("upgrade-insecure-requests", "1"),
    ];

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identity_stays_in_window_envelope() {
        let identity = SessionIdentity::generate(None);
        let (width, height) = identity.viewport;
        assert!((1800..=1920).contains(&width));
        assert!((900..=1080).contains(&height));
        assert!(USER_AGENTS.contains(&identity.user_agent.as_str()));
    }

    #[test]
    fn impersonation_payload_carries_client_hints() {
        let headers = impersonation_headers(USER_AGENTS[0]);
        assert_eq!(headers["user-agent"], USER_AGENTS[0]);
        assert!(headers.contains_key("sec-ch-ua"));
        assert!(headers.contains_key("upgrade-insecure-requests"));
    }
}
