//! Run state machine for one mass edit at a time

use crate::core::error::Error;
use crate::core::types::Result;
use crate::ops::{self, Operation, OperationContext, OperationReport};
use crate::provider::OperationTarget;

use super::outcome::RunOutcome;

/// Where a mass edit is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    /// Waiting on the user's answer to the confirmation prompt
    Confirming,
    Running,
    Completed,
    PartialFailure,
    Cancelled,
}

impl RunState {
    pub fn name(self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Confirming => "Confirming",
            RunState::Running => "Running",
            RunState::Completed => "Completed",
            RunState::PartialFailure => "PartialFailure",
            RunState::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::PartialFailure | RunState::Cancelled)
    }

    fn from_outcome(outcome: &RunOutcome) -> Self {
        match outcome {
            RunOutcome::Success => RunState::Completed,
            RunOutcome::PartialFailure { .. } => RunState::PartialFailure,
            RunOutcome::Cancelled { .. } => RunState::Cancelled,
        }
    }
}

/// Drives `Idle -> Confirming -> Running -> {Completed | PartialFailure | Cancelled}`.
///
/// A finished run is never resumed; proposing again starts over.
#[derive(Debug, Default)]
pub struct MassEditSession {
    state: RunState,
    pending: Option<(Operation, OperationTarget)>,
    last_report: Option<OperationReport>,
}

impl MassEditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Report of the most recent run that got as far as running
    pub fn last_report(&self) -> Option<&OperationReport> {
        self.last_report.as_ref()
    }

    /// Stage an operation and return the prompt to show the user
    pub fn propose(&mut self, op: Operation, target: OperationTarget) -> Result<String> {
        if !(self.state == RunState::Idle || self.state.is_terminal()) {
            return Err(self.invalid(RunState::Confirming));
        }
        op.validate()?;
        let prompt = op.confirmation_message(&target);
        self.pending = Some((op, target));
        self.transition(RunState::Confirming);
        Ok(prompt)
    }

    /// The user said no
    pub fn decline(&mut self) -> Result<()> {
        if self.state != RunState::Confirming {
            return Err(self.invalid(RunState::Idle));
        }
        self.pending = None;
        self.transition(RunState::Idle);
        Ok(())
    }

    /// The user said yes: run the staged operation to completion.
    ///
    /// A run-level error returns the session to `Idle`.
    pub fn confirm(&mut self, ctx: &mut OperationContext<'_>) -> Result<&OperationReport> {
        if self.state != RunState::Confirming {
            return Err(self.invalid(RunState::Running));
        }
        let Some((op, target)) = self.pending.take() else {
            return Err(self.invalid(RunState::Running));
        };

        self.transition(RunState::Running);
        match ops::execute(&op, &target, true, ctx) {
            Ok(report) => {
                self.transition(RunState::from_outcome(&report.outcome()));
                Ok(self.last_report.insert(report))
            }
            Err(e) => {
                log::error!("{} did not run: {}", op.name(), e);
                self.transition(RunState::Idle);
                Err(e)
            }
        }
    }

    fn transition(&mut self, to: RunState) {
        log::debug!("Mass edit: {} -> {}", self.state.name(), to.name());
        self.state = to;
    }

    fn invalid(&self, to: RunState) -> Error {
        Error::InvalidTransition { from: self.state.name(), to: to.name() }
    }
}
