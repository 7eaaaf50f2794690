//! Fetch targets and routing hints.
//!
//! A [`Target`] is a validated URL plus a routing decision derived once at
//! construction. Hidden-service hosts can only be reached through the
//! anonymity network, so they bypass the normal fallback chain entirely.

use thiserror::Error;
use url::Url;

/// How the orchestrator is allowed to route a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteHint {
    /// Normal fallback chain: impersonated HTTP, then browser, then the
    /// anonymity network as last resort.
    Standard,
    /// Anonymity-network egress only; no other transport can reach the host.
    AnonymityOnly,
}

/// Errors raised while constructing a [`Target`].
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
}

/// A single URL to fetch. Immutable once created.
#[derive(Debug, Clone)]
pub struct Target {
    url: Url,
    route: RouteHint,
}

impl Target {
    /// Parse a URL and derive its routing hint.
    pub fn new(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TargetError::UnsupportedScheme(other.to_string())),
        }

        let route = if is_hidden_service(&url) {
            RouteHint::AnonymityOnly
        } else {
            RouteHint::Standard
        };

        Ok(Self { url, route })
    }

    /// Parse a URL and force anonymity-network routing regardless of host.
    pub fn new_anonymity_routed(raw: &str) -> Result<Self, TargetError> {
        let mut target = Self::new(raw)?;
        target.route = RouteHint::AnonymityOnly;
        Ok(target)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn route(&self) -> RouteHint {
        self.route
    }

    /// Host portion used for output naming and logging.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}

fn is_hidden_service(url: &Url) -> bool {
    url.host_str().is_some_and(|host| host.ends_with(".onion"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onion_hosts_route_through_anonymity_network() {
        let target = Target::new("http://expyuzz4wqqyqhjn.onion/about").unwrap();
        assert_eq!(target.route(), RouteHint::AnonymityOnly);
    }

    #[test]
    fn clearnet_hosts_use_standard_routing() {
        let target = Target::new("https://example.com/page").unwrap();
        assert_eq!(target.route(), RouteHint::Standard);
    }

    #[test]
    fn forced_routing_overrides_host_derivation() {
        let target = Target::new_anonymity_routed("https://example.com/").unwrap();
        assert_eq!(target.route(), RouteHint::AnonymityOnly);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(matches!(
            Target::new("ftp://example.com/file"),
            Err(TargetError::UnsupportedScheme(_))
        ));
    }
}
