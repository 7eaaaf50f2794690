// Aggregates interactive-challenge detection and resolution for rendered sessions.

pub mod detector;
pub mod resolver;

pub use detector::ChallengeDetector;
pub use resolver::ChallengeResolver;

/// Transient state attached to one in-flight browser attempt. Never
/// persisted beyond the attempt that created it.
#[derive(Debug, Clone, Default)]
pub struct ChallengeState {
    pub detected: bool,
    pub solved: bool,
    pub token: Option<String>,
}

impl ChallengeState {
    /// State for an attempt where a challenge was detected but resolution
    /// did not complete.
    pub fn unresolved() -> Self {
        Self {
            detected: true,
            solved: false,
            token: None,
        }
    }

    pub fn resolved(token: impl Into<String>) -> Self {
        Self {
            detected: true,
            solved: true,
            token: Some(token.into()),
        }
    }
}
