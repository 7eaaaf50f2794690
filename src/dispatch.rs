//! Batch dispatch over the orchestrator.
//!
//! Runs a list of targets either sequentially (rate-paced) or under a
//! bounded worker pool. One target's failure (including a panicking worker)
//! never aborts the batch or other in-flight targets; the result always
//! carries exactly one outcome record per input target, in input order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::modules::pacing::PacingPolicy;
use crate::orchestrator::FetchOrchestrator;
use crate::strategies::{FailureKind, FetchFailure, FetchResult};
use crate::target::Target;

/// Worst-case wait per target, as a multiple of the strategy timeout.
const PER_TARGET_TIMEOUT_MULTIPLIER: u32 = 2;

/// How a batch is executed.
#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    /// One target at a time with pacing delays in between.
    Sequential,
    /// Up to `workers` targets in flight at once.
    Concurrent { workers: usize },
}

/// Terminal outcome for one target.
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: Target,
    pub outcome: Result<FetchResult, FetchFailure>,
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Aggregated outcomes of one batch run.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub outcomes: Vec<TargetOutcome>,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    pub fn successes(&self) -> impl Iterator<Item = &FetchResult> {
        self.outcomes
            .iter()
            .filter_map(|record| record.outcome.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Target, &FetchFailure)> {
        self.outcomes.iter().filter_map(|record| {
            record
                .outcome
                .as_ref()
                .err()
                .map(|failure| (&record.target, failure))
        })
    }
}

/// Runs the orchestrator over many targets.
pub struct BatchDispatcher {
    orchestrator: Arc<FetchOrchestrator>,
    pacing: PacingPolicy,
    per_target_timeout: Duration,
}

impl BatchDispatcher {
    pub fn new(orchestrator: Arc<FetchOrchestrator>, pacing: PacingPolicy) -> Self {
        let per_target_timeout = orchestrator.attempt_timeout() * PER_TARGET_TIMEOUT_MULTIPLIER;
        Self {
            orchestrator,
            pacing,
            per_target_timeout,
        }
    }

    pub fn with_per_target_timeout(mut self, deadline: Duration) -> Self {
        self.per_target_timeout = deadline;
        self
    }

    pub async fn run(&self, targets: Vec<Target>, mode: RunMode) -> BatchResult {
        log::info!("dispatching batch of {} targets", targets.len());
        match mode {
            RunMode::Sequential => self.run_sequential(targets).await,
            RunMode::Concurrent { workers } => self.run_concurrent(targets, workers.max(1)).await,
        }
    }

    async fn run_sequential(&self, targets: Vec<Target>) -> BatchResult {
        let total = targets.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, target) in targets.into_iter().enumerate() {
            let outcome = self.isolated_fetch(&target).await;
            outcomes.push(TargetOutcome { target, outcome });
            if index + 1 < total {
                self.pacing.pause_between_targets().await;
            }
        }

        BatchResult { outcomes }
    }

    async fn run_concurrent(&self, targets: Vec<Target>, workers: usize) -> BatchResult {
        let total = targets.len();
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut join_set = JoinSet::new();

        for (index, target) in targets.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let orchestrator = self.orchestrator.clone();
            let deadline = self.per_target_timeout;
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("dispatcher semaphore closed");
                let outcome = fetch_bounded(&orchestrator, &target, deadline).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<FetchResult, FetchFailure>>> =
            (0..total).map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(err) => log::error!("batch worker failed: {err}"),
            }
        }

        // A slot left empty lost its worker to a panic or abort; record it
        // as an isolated failure rather than dropping the target.
        let outcomes = targets
            .into_iter()
            .zip(slots)
            .map(|(target, slot)| TargetOutcome {
                target,
                outcome: slot.unwrap_or_else(|| {
                    Err(FetchFailure::unattributed(FailureKind::Internal(
                        "batch worker aborted".into(),
                    )))
                }),
            })
            .collect();

        BatchResult { outcomes }
    }

    /// Run one orchestrator call on its own task so a panic is contained to
    /// this target.
    async fn isolated_fetch(&self, target: &Target) -> Result<FetchResult, FetchFailure> {
        let orchestrator = self.orchestrator.clone();
        let target = target.clone();
        let deadline = self.per_target_timeout;
        match tokio::spawn(async move { fetch_bounded(&orchestrator, &target, deadline).await })
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => Err(FetchFailure::unattributed(FailureKind::Internal(format!(
                "fetch task failed: {err}"
            )))),
        }
    }
}

async fn fetch_bounded(
    orchestrator: &FetchOrchestrator,
    target: &Target,
    deadline: Duration,
) -> Result<FetchResult, FetchFailure> {
    match timeout(deadline, orchestrator.fetch(target)).await {
        Ok(outcome) => outcome,
        // The in-flight attempt is abandoned; its session tears itself down
        // best-effort when the task is dropped.
        Err(_) => Err(FetchFailure::unattributed(FailureKind::Timeout(deadline))),
    }
}
