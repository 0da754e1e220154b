//! Stage sequencing over a single pipeline run.
//!
//! The [`Orchestrator`] owns the run and the five stage invokers. Every stage
//! procedure follows the same shape: refuse while another stage is in
//! flight, derive the input from the live state, mark the stage pending,
//! call the invoker with the lock released, then apply the outcome through
//! the reducer. Problems end up in the run's error slot and in the returned
//! [`StageRunOutcome`]; stage procedures never return `Err`.
//!
//! Dropping a stage future mid-call (a timeout, `select!`, an aborted task)
//! fails the stage with a retryable error instead of leaving it pending.

mod view;

pub use view::StageView;

use crate::core::{InvocationOutcome, StageId, StageStatus};
use crate::errors::{OkrflowError, StageError};
use crate::events::{
    EventSink, NoOpEventSink, PIPELINE_ERROR_DISMISSED, PIPELINE_EXPORTED, PIPELINE_RESET,
    STAGE_BLOCKED, STAGE_COMPLETED, STAGE_DISCARDED, STAGE_FAILED, STAGE_REJECTED, STAGE_STARTED,
};
use crate::export::ExportArtifact;
use crate::input::{derive_input, StageInput, SAMPLE_LOGS};
use crate::invoker::{StageInvoker, StageInvokers};
use crate::observability::StageTimer;
use crate::state::{reduce, PipelineAction, PipelineRun, CANCELLED_REASON};
use crate::utils::iso_timestamp;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of asking the orchestrator to run a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRunOutcome {
    /// The stage ran and its output was stored.
    Succeeded {
        /// The stage that ran.
        stage: StageId,
    },
    /// The remote call failed; a retryable error is live.
    Failed {
        /// The stage that ran.
        stage: StageId,
        /// The live error message.
        message: String,
    },
    /// Required input was missing; no call was made.
    PreconditionFailed {
        /// The stage that could not start.
        stage: StageId,
        /// The live error message.
        message: String,
    },
    /// Another stage was in flight; nothing changed.
    Rejected {
        /// The stage that was asked for.
        stage: StageId,
        /// The stage in flight.
        pending: StageId,
    },
    /// The run was reset while the call was in flight; its result was dropped.
    Discarded {
        /// The stage that ran.
        stage: StageId,
    },
    /// Retry was requested but no retryable error is live.
    NothingToRetry,
}

impl StageRunOutcome {
    /// Returns true if the stage's output was stored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// The stage this outcome concerns, if any.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        match self {
            Self::Succeeded { stage }
            | Self::Failed { stage, .. }
            | Self::PreconditionFailed { stage, .. }
            | Self::Rejected { stage, .. }
            | Self::Discarded { stage } => Some(*stage),
            Self::NothingToRetry => None,
        }
    }
}

impl fmt::Display for StageRunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded { stage } => {
                write!(f, "Step {} ({}) completed", stage.index(), stage.title())
            }
            Self::Failed { message, .. } | Self::PreconditionFailed { message, .. } => {
                f.write_str(message)
            }
            Self::Rejected { pending, .. } => {
                write!(f, "Step {} is still running", pending.index())
            }
            Self::Discarded { stage } => write!(
                f,
                "Step {} finished after a reset; its result was discarded",
                stage.index()
            ),
            Self::NothingToRetry => f.write_str("Nothing to retry"),
        }
    }
}

/// What a caller asked to run.
#[derive(Debug, Clone, Copy)]
enum Request {
    Stage(StageId),
    Retry,
}

/// A stage that has been marked pending and is ready to call out.
struct Ticket {
    stage: StageId,
    run_id: Uuid,
    input: StageInput,
    attempt: u32,
}

/// Fails the pending stage if the call future is dropped before it returns.
struct InFlight<'a> {
    orchestrator: &'a Orchestrator,
    stage: StageId,
    run_id: Uuid,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.abandon(self.stage, self.run_id);
        }
    }
}

/// Drives the five-stage pipeline over one owned [`PipelineRun`].
///
/// Methods take `&self`; the run sits behind a mutex that is never held
/// across an invocation, so the orchestrator can be shared between tasks.
pub struct Orchestrator {
    run: Mutex<PipelineRun>,
    invokers: StageInvokers,
    events: Arc<dyn EventSink>,
}

impl Orchestrator {
    /// Creates an orchestrator over a fresh run.
    #[must_use]
    pub fn new(invokers: StageInvokers) -> Self {
        Self {
            run: Mutex::new(PipelineRun::new()),
            invokers,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Runs `stage` against the current state.
    pub async fn run_stage(&self, stage: StageId) -> StageRunOutcome {
        self.execute(Request::Stage(stage)).await
    }

    /// Runs stage 1 (aggregate logs).
    pub async fn run_stage1(&self) -> StageRunOutcome {
        self.run_stage(StageId::Aggregate).await
    }

    /// Runs stage 2 (infer intent).
    pub async fn run_stage2(&self) -> StageRunOutcome {
        self.run_stage(StageId::InferIntent).await
    }

    /// Runs stage 3 (map knowledge graph).
    pub async fn run_stage3(&self) -> StageRunOutcome {
        self.run_stage(StageId::MapGraph).await
    }

    /// Runs stage 4 (generate outcomes).
    pub async fn run_stage4(&self) -> StageRunOutcome {
        self.run_stage(StageId::GenerateOutcomes).await
    }

    /// Runs stage 5 (generate OKRs).
    pub async fn run_stage5(&self) -> StageRunOutcome {
        self.run_stage(StageId::GenerateOkr).await
    }

    /// Re-runs the stage named by the live error's retry action.
    ///
    /// The input is derived again from the state as it is now.
    pub async fn retry_last_failure(&self) -> StageRunOutcome {
        self.execute(Request::Retry).await
    }

    /// Discards all progress and starts a new run.
    ///
    /// A stage still in flight keeps running; its result is discarded.
    pub fn reset(&self) {
        let (abandoned, reached, run_id) = {
            let mut run = self.run.lock();
            let abandoned = run.pending_stage();
            let reached = run.last_succeeded_stage();
            apply(&mut run, PipelineAction::Reset);
            (abandoned, reached, run.run_id())
        };

        info!(
            run_id = %run_id,
            abandoned = ?abandoned,
            last_completed = ?reached,
            "Pipeline reset"
        );
        self.events.try_emit(
            PIPELINE_RESET,
            Some(json!({
                "run_id": run_id,
                "abandoned_stage": abandoned.map(StageId::index),
            })),
        );
    }

    /// Clears the live error without retrying.
    pub fn dismiss_error(&self) {
        let dismissed = {
            let mut run = self.run.lock();
            let dismissed = run.last_error().cloned();
            apply(&mut run, PipelineAction::DismissError);
            dismissed
        };

        if let Some(err) = dismissed {
            debug!(stage = %err.stage, "Error dismissed");
            self.events.try_emit(
                PIPELINE_ERROR_DISMISSED,
                Some(json!(err.to_dict())),
            );
        }
    }

    /// Replaces the stage-1 draft text.
    pub fn set_draft_logs(&self, text: impl Into<String>) {
        apply(
            &mut self.run.lock(),
            PipelineAction::EditDraft { text: text.into() },
        );
    }

    /// Fills the draft with the built-in sample logs.
    pub fn load_sample_logs(&self) {
        self.set_draft_logs(SAMPLE_LOGS);
    }

    /// Clone of the current run.
    #[must_use]
    pub fn snapshot(&self) -> PipelineRun {
        self.run.lock().clone()
    }

    /// Highest stage the user may act on.
    #[must_use]
    pub fn unlocked_stage(&self) -> StageId {
        self.run.lock().unlocked_stage()
    }

    /// Output of `stage`, if it has succeeded in this run.
    #[must_use]
    pub fn stage_output(&self, stage: StageId) -> Option<Value> {
        self.run.lock().stage_output(stage).cloned()
    }

    /// The stage in flight.
    #[must_use]
    pub fn pending_stage(&self) -> Option<StageId> {
        self.run.lock().pending_stage()
    }

    /// The live error.
    #[must_use]
    pub fn last_error(&self) -> Option<StageError> {
        self.run.lock().last_error().cloned()
    }

    /// Current draft text.
    #[must_use]
    pub fn draft_logs(&self) -> String {
        self.run.lock().draft_logs().to_string()
    }

    /// Navigation entries for every stage.
    #[must_use]
    pub fn stage_views(&self) -> Vec<StageView> {
        StageView::all(&self.run.lock())
    }

    /// Progress text for the stage in flight.
    #[must_use]
    pub fn loading_message(&self) -> Option<&'static str> {
        self.pending_stage().map(StageId::loading_message)
    }

    /// Status tracked by `stage`'s invoker itself.
    #[must_use]
    pub fn invoker_status(&self, stage: StageId) -> StageStatus {
        self.invokers.status(stage)
    }

    /// Captures the run's results for download.
    pub fn export_current_state(&self) -> ExportArtifact {
        let (artifact, available) = {
            let run = self.run.lock();
            let available = StageId::ALL
                .into_iter()
                .filter(|stage| run.stage_output(*stage).is_some())
                .count();
            (ExportArtifact::from_run(&run), available)
        };

        info!(
            run_id = %artifact.pipeline_run_id,
            completed_at = %iso_timestamp(&artifact.workflow_completion_date),
            stages = available,
            "Exported pipeline results"
        );
        self.events.try_emit(
            PIPELINE_EXPORTED,
            Some(json!({
                "run_id": artifact.pipeline_run_id,
                "stages_with_output": available,
            })),
        );
        artifact
    }

    /// Exports and writes the results into `dir`.
    pub async fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, OkrflowError> {
        let artifact = self.export_current_state();
        let path = artifact.write_to_dir(dir).await?;
        info!(path = %path.display(), "Wrote export");
        Ok(path)
    }

    async fn execute(&self, request: Request) -> StageRunOutcome {
        let started = {
            let mut run = self.run.lock();
            begin(&mut run, request)
        };
        let ticket = match started {
            Ok(ticket) => ticket,
            Err(refused) => {
                self.report_refusal(&refused);
                return refused;
            }
        };
        let stage = ticket.stage;
        let retrying = matches!(request, Request::Retry);

        info!(
            stage = %stage,
            index = stage.index(),
            run_id = %ticket.run_id,
            attempt = ticket.attempt,
            retrying,
            "Stage started"
        );
        self.events.try_emit(
            STAGE_STARTED,
            Some(json!({
                "stage": stage.index(),
                "name": stage.name(),
                "run_id": ticket.run_id,
                "attempt": ticket.attempt,
            })),
        );

        let in_flight = InFlight {
            orchestrator: self,
            stage,
            run_id: ticket.run_id,
            armed: true,
        };
        let timer = StageTimer::start(stage);
        let outcome = self.invokers.get(stage).invoke(&ticket.input).await;
        let duration_ms = timer.finish();
        in_flight.disarm();

        self.complete(stage, ticket, outcome, duration_ms)
    }

    /// Closes out a stage whose call was dropped mid-flight.
    fn abandon(&self, stage: StageId, run_id: Uuid) {
        let applied = reduce(
            &mut self.run.lock(),
            PipelineAction::Abandon { run_id, stage },
        );

        match applied {
            Ok(()) => {
                let message = StageError::invocation(stage, CANCELLED_REASON).message;
                warn!(stage = %stage, run_id = %run_id, "Stage call dropped before it finished");
                self.events.try_emit(
                    STAGE_FAILED,
                    Some(json!({
                        "stage": stage.index(),
                        "error": message,
                        "cancelled": true,
                    })),
                );
            }
            Err(err) => {
                debug!(stage = %stage, run_id = %run_id, error = %err, "Dropped call belonged to a previous run");
            }
        }
    }

    fn complete(
        &self,
        stage: StageId,
        ticket: Ticket,
        outcome: InvocationOutcome,
        duration_ms: f64,
    ) -> StageRunOutcome {
        let reason = outcome.reason().map(ToString::to_string);
        let applied = {
            let mut run = self.run.lock();
            reduce(
                &mut run,
                PipelineAction::Complete {
                    run_id: ticket.run_id,
                    input: ticket.input,
                    outcome,
                },
            )
            .map(|()| (run.last_error().cloned(), run.unlocked_stage()))
        };

        match applied {
            Err(err) => {
                warn!(stage = %stage, run_id = %ticket.run_id, error = %err, "Discarding stale completion");
                self.events.try_emit(
                    STAGE_DISCARDED,
                    Some(json!({ "stage": stage.index(), "run_id": ticket.run_id })),
                );
                StageRunOutcome::Discarded { stage }
            }
            Ok((_, unlocked)) if reason.is_none() => {
                info!(stage = %stage, duration_ms, unlocked = unlocked.index(), "Stage completed");
                self.events.try_emit(
                    STAGE_COMPLETED,
                    Some(json!({
                        "stage": stage.index(),
                        "duration_ms": duration_ms,
                        "unlocked_stage": unlocked.index(),
                    })),
                );
                StageRunOutcome::Succeeded { stage }
            }
            Ok((live, _)) => {
                let message = live.map_or_else(
                    || StageError::invocation(stage, reason.as_deref().unwrap_or_default()).message,
                    |err| err.message,
                );
                warn!(stage = %stage, duration_ms, error = %message, "Stage failed");
                self.events.try_emit(
                    STAGE_FAILED,
                    Some(json!({
                        "stage": stage.index(),
                        "duration_ms": duration_ms,
                        "error": message,
                    })),
                );
                StageRunOutcome::Failed { stage, message }
            }
        }
    }

    fn report_refusal(&self, refused: &StageRunOutcome) {
        match refused {
            StageRunOutcome::Rejected { stage, pending } => {
                warn!(stage = %stage, pending = %pending, "Stage rejected while another is in flight");
                self.events.try_emit(
                    STAGE_REJECTED,
                    Some(json!({ "stage": stage.index(), "pending": pending.index() })),
                );
            }
            StageRunOutcome::PreconditionFailed { stage, message } => {
                info!(stage = %stage, reason = %message, "Stage blocked");
                self.events.try_emit(
                    STAGE_BLOCKED,
                    Some(json!({ "stage": stage.index(), "message": message })),
                );
            }
            StageRunOutcome::NothingToRetry => debug!("Retry requested with no retryable error"),
            _ => {}
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("run", &*self.run.lock())
            .field("invokers", &self.invokers)
            .finish_non_exhaustive()
    }
}

/// Resolves the stage, checks, derives and marks it pending under one lock.
fn begin(run: &mut PipelineRun, request: Request) -> Result<Ticket, StageRunOutcome> {
    let stage = match request {
        Request::Stage(stage) => stage,
        Request::Retry => run.retry_stage().ok_or(StageRunOutcome::NothingToRetry)?,
    };
    if let Some(pending) = run.pending_stage() {
        return Err(StageRunOutcome::Rejected { stage, pending });
    }
    if matches!(request, Request::Retry) {
        apply(run, PipelineAction::DismissError);
    }

    let input = match derive_input(stage, run) {
        Ok(input) => input,
        Err(err) => {
            apply(run, PipelineAction::block(&err));
            return Err(StageRunOutcome::PreconditionFailed {
                stage,
                message: err.message,
            });
        }
    };

    reduce(run, PipelineAction::Start { stage }).map_err(|err| match err {
        OkrflowError::Busy { pending } => StageRunOutcome::Rejected { stage, pending },
        other => StageRunOutcome::PreconditionFailed {
            stage,
            message: other.to_string(),
        },
    })?;

    Ok(Ticket {
        stage,
        run_id: run.run_id(),
        input,
        attempt: run.attempts(stage),
    })
}

/// Applies an action the reducer accepts in every state.
fn apply(run: &mut PipelineRun, action: PipelineAction) {
    let name = action.name();
    if let Err(err) = reduce(run, action) {
        warn!(action = name, error = %err, "Action rejected");
    }
}
