//! Cross-cutting services module
//!
//! Shared resources and policies the transport strategies lean on: proxy
//! rotation, request pacing, session identity, the stealth payload, and the
//! process-wide counters.

pub mod identity;
pub mod pacing;
pub mod proxy;
pub mod stats;
pub mod stealth;

// Re-export commonly used types
pub use identity::SessionIdentity;
pub use pacing::{PacingConfig, PacingPolicy};
pub use proxy::{ANONYMITY_EGRESS, PoolStatus, ProxyEndpoint, ProxyKind, ProxyPool, ProxyPoolConfig};
pub use stats::{Stats, StatsSnapshot};
pub use stealth::STEALTH_SCRIPT;
