//! Per-operation progress: `Idle -> InFlight -> {Succeeded | Failed}`.
//!
//! Each asynchronous user action owns one tracker. A second submission while
//! the first is still in flight is refused, which is what lets a front end
//! disable the button instead of queueing duplicate gateway calls.

use std::fmt;
use tokio::sync::watch;

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MealEnrichment,
    Recommendation,
    RecipeRecommendation,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::MealEnrichment => "meal enrichment",
            Operation::Recommendation => "recommendation",
            Operation::RecipeRecommendation => "recipe recommendation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl OperationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationState::InFlight)
    }
}

#[derive(Debug)]
pub struct OperationTracker {
    operation: Operation,
    state: watch::Sender<OperationState>,
}

impl OperationTracker {
    pub fn new(operation: Operation) -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        Self { operation, state }
    }

    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.borrow().is_in_flight()
    }

    /// Change notifications for a front end that redraws on progress.
    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    /// Moves to `InFlight`, or refuses if the operation is already running.
    pub fn begin(&self) -> Result<InFlight<'_>, TrackerError> {
        let started = self.state.send_if_modified(|state| {
            if state.is_in_flight() {
                return false;
            }
            *state = OperationState::InFlight;
            true
        });
        if !started {
            return Err(TrackerError::OperationInFlight(self.operation));
        }
        Ok(InFlight {
            tracker: self,
            settled: false,
        })
    }

    fn settle(&self, outcome: OperationState) {
        self.state.send_replace(outcome);
    }
}

/// Proof that an operation is running. Settling consumes it; dropping it
/// unsettled (the caller's future was dropped) records a failure so the
/// tracker never stays stuck in `InFlight`.
#[derive(Debug)]
pub struct InFlight<'a> {
    tracker: &'a OperationTracker,
    settled: bool,
}

impl InFlight<'_> {
    pub fn succeed(mut self) {
        self.settled = true;
        self.tracker.settle(OperationState::Succeeded);
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.settled = true;
        self.tracker.settle(OperationState::Failed(reason.into()));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker
                .settle(OperationState::Failed("abandoned before completion".to_string()));
        }
    }
}
