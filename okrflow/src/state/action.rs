//! Tagged actions and the reducer that applies them.

use super::PipelineRun;
use crate::core::{InvocationOutcome, StageId, StageStatus};
use crate::errors::{OkrflowError, PreconditionError, StageError, TransitionError};
use crate::input::StageInput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failure reason recorded when a call is dropped mid-flight.
pub const CANCELLED_REASON: &str = "the call was cancelled";

/// A state transition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineAction {
    /// Replace the stage-1 draft text.
    EditDraft {
        /// New draft text.
        text: String,
    },
    /// Mark a stage as in flight.
    Start {
        /// Stage being invoked.
        stage: StageId,
    },
    /// Apply the result of an invocation.
    Complete {
        /// Run the invocation was started in.
        run_id: Uuid,
        /// The input that was sent.
        input: StageInput,
        /// What the invoker returned.
        outcome: InvocationOutcome,
    },
    /// Close out an invocation that was dropped before it returned.
    Abandon {
        /// Run the invocation was started in.
        run_id: Uuid,
        /// Stage whose call was dropped.
        stage: StageId,
    },
    /// Record a missing prerequisite.
    Block {
        /// The stage that could not start.
        stage: StageId,
        /// Message to show.
        message: String,
    },
    /// Clear the live error and its retry action.
    DismissError,
    /// Discard all progress and start a new run.
    Reset,
}

impl PipelineAction {
    /// Short action name for logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::EditDraft { .. } => "edit_draft",
            Self::Start { .. } => "start",
            Self::Complete { .. } => "complete",
            Self::Abandon { .. } => "abandon",
            Self::Block { .. } => "block",
            Self::DismissError => "dismiss_error",
            Self::Reset => "reset",
        }
    }

    /// Builds a block action from a precondition error.
    #[must_use]
    pub fn block(err: &PreconditionError) -> Self {
        Self::Block {
            stage: err.stage,
            message: err.message.clone(),
        }
    }
}

/// Applies `action` to `run`.
///
/// This is the only place pipeline state changes. Rejected actions leave
/// `run` untouched.
pub fn reduce(run: &mut PipelineRun, action: PipelineAction) -> Result<(), OkrflowError> {
    match action {
        PipelineAction::EditDraft { text } => {
            run.draft_logs = text;
            Ok(())
        }
        PipelineAction::Start { stage } => start(run, stage),
        PipelineAction::Complete {
            run_id,
            input,
            outcome,
        } => complete(run, run_id, input, outcome),
        PipelineAction::Abandon { run_id, stage } => abandon(run, run_id, stage),
        PipelineAction::Block { stage, message } => {
            if let Some(pending) = run.pending_stage {
                return Err(OkrflowError::Busy { pending });
            }
            run.last_error = Some(StageError::precondition(&PreconditionError { stage, message }));
            Ok(())
        }
        PipelineAction::DismissError => {
            run.last_error = None;
            Ok(())
        }
        PipelineAction::Reset => {
            *run = PipelineRun::new();
            Ok(())
        }
    }
}

fn start(run: &mut PipelineRun, stage: StageId) -> Result<(), OkrflowError> {
    if let Some(pending) = run.pending_stage {
        return Err(OkrflowError::Busy { pending });
    }
    if let Some(previous) = stage.predecessor() {
        if run.stage_output(previous).is_none() {
            return Err(PreconditionError::missing_input(stage).into());
        }
    }

    let slot = stage.slot();
    run.pending_stage = Some(stage);
    run.stage_status[slot] = StageStatus::Pending;
    run.attempts[slot] += 1;
    Ok(())
}

fn complete(
    run: &mut PipelineRun,
    run_id: Uuid,
    input: StageInput,
    outcome: InvocationOutcome,
) -> Result<(), OkrflowError> {
    let stage = input.stage();
    ensure_in_flight(run, "complete", run_id, stage)?;

    let slot = stage.slot();
    run.pending_stage = None;
    match outcome {
        InvocationOutcome::Success { output } => {
            run.stage_outputs[slot] = Some(output);
            run.stage_status[slot] = StageStatus::Succeeded;
            run.last_error = None;
            let next = stage.successor().unwrap_or(StageId::LAST);
            run.unlocked_stage = run.unlocked_stage.max(next);
            if let StageInput::Logs { logs } = input {
                run.submitted_logs = Some(logs);
            }
        }
        InvocationOutcome::Failure { reason } => {
            run.stage_status[slot] = StageStatus::Failed;
            run.last_error = Some(StageError::invocation(stage, &reason));
        }
    }
    Ok(())
}

fn abandon(run: &mut PipelineRun, run_id: Uuid, stage: StageId) -> Result<(), OkrflowError> {
    ensure_in_flight(run, "abandon", run_id, stage)?;

    run.pending_stage = None;
    run.stage_status[stage.slot()] = StageStatus::Failed;
    run.last_error = Some(StageError::invocation(stage, CANCELLED_REASON));
    Ok(())
}

fn ensure_in_flight(
    run: &PipelineRun,
    action: &str,
    run_id: Uuid,
    stage: StageId,
) -> Result<(), OkrflowError> {
    if run_id != run.run_id {
        return Err(TransitionError::new(
            action,
            format!("stage {} belongs to a previous run", stage.index()),
        )
        .into());
    }
    if run.pending_stage != Some(stage) {
        return Err(TransitionError::new(
            action,
            format!("stage {} is not pending", stage.index()),
        )
        .into());
    }
    Ok(())
}
