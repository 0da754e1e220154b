//! Read-only projections of pipeline state for presentation layers.

use crate::core::{StageId, StageStatus};
use crate::state::PipelineRun;
use serde::Serialize;

/// Navigation entry for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageView {
    /// The stage.
    pub stage: StageId,
    /// 1-based position.
    pub index: usize,
    /// Navigation title.
    pub title: &'static str,
    /// Short description.
    pub description: &'static str,
    /// The user may open this stage.
    pub accessible: bool,
    /// The pipeline has moved past this stage.
    pub completed: bool,
    /// This is the highest unlocked stage.
    pub active: bool,
    /// A call for this stage is in flight.
    pub pending: bool,
    /// Status of the most recent call.
    pub status: StageStatus,
    /// Output is available to display.
    pub has_output: bool,
}

impl StageView {
    /// Projects `stage` out of `run`.
    #[must_use]
    pub fn of(run: &PipelineRun, stage: StageId) -> Self {
        let unlocked = run.unlocked_stage();
        Self {
            stage,
            index: stage.index(),
            title: stage.title(),
            description: stage.description(),
            accessible: stage <= unlocked,
            completed: stage < unlocked,
            active: stage == unlocked,
            pending: run.pending_stage() == Some(stage),
            status: run.stage_status(stage),
            has_output: run.stage_output(stage).is_some(),
        }
    }

    /// Views for every stage, in order.
    #[must_use]
    pub fn all(run: &PipelineRun) -> Vec<Self> {
        StageId::ALL.into_iter().map(|stage| Self::of(run, stage)).collect()
    }
}
