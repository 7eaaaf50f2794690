//! Proxy pool: rotating egress endpoints plus circuit renewal.
//!
//! The pool owns an immutable endpoint list loaded once at startup; rotation
//! only advances a shared cursor. When no usable endpoints exist the pool
//! degrades to a single anonymity-network sentinel so the process always has
//! some egress path.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::external_deps::tor::CircuitControl;

/// Default local anonymity-network SOCKS egress. The `socks5h` scheme keeps
/// DNS resolution inside the network, which hidden services require.
pub const ANONYMITY_EGRESS: &str = "socks5h://127.0.0.1:9050";

/// Category of a proxy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Residential,
    Mobile,
    Datacenter,
    AnonymityNetwork,
}

impl ProxyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxyKind::Residential => "residential",
            ProxyKind::Mobile => "mobile",
            ProxyKind::Datacenter => "datacenter",
            ProxyKind::AnonymityNetwork => "anonymity-network",
        }
    }
}

/// One egress endpoint. Never mutated after the pool is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub address: String,
    pub kind: ProxyKind,
}

impl ProxyEndpoint {
    pub fn new(address: impl Into<String>, kind: ProxyKind) -> Self {
        Self {
            address: address.into(),
            kind,
        }
    }

    /// The always-available anonymity-network egress.
    pub fn sentinel() -> Self {
        Self::new(ANONYMITY_EGRESS, ProxyKind::AnonymityNetwork)
    }

    pub fn is_socks(&self) -> bool {
        self.address.starts_with("socks")
    }
}

/// Pool construction and renewal settings.
#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    pub kind: ProxyKind,
    pub rotate: bool,
    /// How long a fresh circuit needs before it is usable.
    pub renewal_settle: Duration,
    pub control: CircuitControl,
}

impl Default for ProxyPoolConfig {
    fn default() -> Self {
        Self {
            kind: ProxyKind::Residential,
            rotate: true,
            renewal_settle: Duration::from_secs(10),
            control: CircuitControl::default(),
        }
    }
}

/// Snapshot of the pool for banners and logs.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub endpoints: usize,
    pub kind: ProxyKind,
    pub degraded_to_sentinel: bool,
}

/// Rotating set of egress proxies shared by concurrent workers.
#[derive(Debug)]
pub struct ProxyPool {
    endpoints: Vec<ProxyEndpoint>,
    cursor: Mutex<usize>,
    rotate: bool,
    degraded: bool,
    renewal_settle: Duration,
    control: CircuitControl,
}

impl ProxyPool {
    /// Build a pool from explicit endpoint addresses. An empty list degrades
    /// to the sentinel.
    pub fn from_endpoints<I, S>(addresses: I, config: ProxyPoolConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<ProxyEndpoint> = addresses
            .into_iter()
            .map(|addr| ProxyEndpoint::new(addr, config.kind))
            .collect();
        Self::build(endpoints, config)
    }

    /// Load `host:port` lines from a file. Lines starting with `#` and blank
    /// lines are skipped; a missing or empty file degrades to the sentinel.
    pub fn from_file(path: &Path, config: ProxyPoolConfig) -> Self {
        let endpoints = match std::fs::read_to_string(path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(|line| ProxyEndpoint::new(line, config.kind))
                .collect(),
            Err(err) => {
                log::warn!("proxy list {} unavailable: {err}", path.display());
                Vec::new()
            }
        };
        Self::build(endpoints, config)
    }

    fn build(mut endpoints: Vec<ProxyEndpoint>, config: ProxyPoolConfig) -> Self {
        let degraded = endpoints.is_empty();
        if degraded {
            log::warn!("proxy pool empty, degrading to anonymity-network sentinel");
            endpoints.push(ProxyEndpoint::sentinel());
        }
        Self {
            endpoints,
            cursor: Mutex::new(0),
            rotate: config.rotate,
            degraded,
            renewal_settle: config.renewal_settle,
            control: config.control,
        }
    }

    /// Current endpoint; advances the rotation cursor when enabled. The
    /// cursor update is the whole critical section; no I/O under the lock.
    pub fn next(&self) -> ProxyEndpoint {
        let mut cursor = self.cursor.lock().expect("proxy cursor poisoned");
        let endpoint = self.endpoints[*cursor % self.endpoints.len()].clone();
        if self.rotate {
            *cursor = (*cursor + 1) % self.endpoints.len();
        }
        endpoint
    }

    /// Request a fresh anonymity-network circuit and wait for it to settle.
    /// Reports failure instead of raising; callers degrade gracefully.
    pub async fn renew_identity(&self) -> bool {
        match self.control.request_new_circuit().await {
            Ok(()) => {
                tokio::time::sleep(self.renewal_settle).await;
                log::info!("new anonymity-network circuit established");
                true
            }
            Err(err) => {
                log::warn!("circuit renewal failed: {err}");
                false
            }
        }
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            endpoints: self.endpoints.len(),
            kind: self.endpoints[0].kind,
            degraded_to_sentinel: self.degraded,
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }
}
