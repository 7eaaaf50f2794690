//! # polyfetch
//!
//! Adaptive multi-strategy fetch orchestrator for targets that actively try
//! to tell automated clients from humans, and block the former.
//!
//! One fetch is one target URL. The orchestrator picks a transport strategy
//! per target, detects in-band failure signals (block pages, interactive
//! challenges), and falls back along a fixed chain of increasingly expensive
//! strategies until one succeeds or all are exhausted.
//!
//! ## Features
//!
//! - Three interchangeable transports: impersonated HTTP, rendered browser,
//!   anonymity network
//! - Fixed fallback ordering with first-success short-circuit
//! - Rotating proxy pool with anonymity-network sentinel degradation
//! - Circuit renewal over the local control endpoint
//! - Structural challenge detection and external solving-service resolution
//! - Human-plausible pacing and scroll/dwell simulation
//! - Sequential or bounded-concurrent batch dispatch with per-target
//!   failure isolation
//!
//! ## Example
//!
//! ```no_run
//! use polyfetch::orchestrator::FetchOrchestrator;
//! use polyfetch::target::Target;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = FetchOrchestrator::builder().build();
//!     let target = Target::new("https://example.com")?;
//!     let result = orchestrator.fetch(&target).await?;
//!     println!("fetched via {}: {} bytes", result.strategy, result.body.len());
//!     Ok(())
//! }
//! ```

pub mod challenges;
pub mod dispatch;
pub mod external_deps;
pub mod modules;
pub mod orchestrator;
pub mod output;
pub mod strategies;
pub mod target;

pub use crate::orchestrator::{Capabilities, FetchOrchestrator, FetchOrchestratorBuilder};

pub use crate::dispatch::{BatchDispatcher, BatchResult, RunMode, TargetOutcome};

pub use crate::strategies::{
    AnonymityNetworkStrategy,
    FailureKind,
    FetchFailure,
    FetchResult,
    ImpersonatedHttpStrategy,
    RenderedBrowserStrategy,
    StrategyKind,
    TransportStrategy,
};

pub use crate::target::{RouteHint, Target, TargetError};

pub use crate::challenges::{ChallengeDetector, ChallengeResolver, ChallengeState};

pub use crate::external_deps::solver::{
    SolverConfig,
    SolverError,
    SolverProvider,
    SolverResult,
    SolverSolution,
    SolverTask,
    TwoCaptchaClient,
};

pub use crate::external_deps::tor::{CircuitControl, ControlError};

pub use crate::modules::{
    PacingConfig,
    PacingPolicy,
    PoolStatus,
    ProxyEndpoint,
    ProxyKind,
    ProxyPool,
    ProxyPoolConfig,
    SessionIdentity,
    Stats,
    StatsSnapshot,
};

pub use crate::output::OutputSink;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
