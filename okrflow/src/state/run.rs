//! The in-memory record of one pipeline run.

use crate::core::{StageId, StageStatus, STAGE_COUNT};
use crate::errors::StageError;
use crate::utils::{generate_uuid, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Complete state of one workflow execution.
///
/// Fields are read through accessors; every mutation goes through
/// [`reduce`](super::reduce).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub(crate) run_id: Uuid,
    pub(crate) started_at: Timestamp,
    pub(crate) unlocked_stage: StageId,
    pub(crate) stage_outputs: [Option<serde_json::Value>; STAGE_COUNT],
    pub(crate) stage_status: [StageStatus; STAGE_COUNT],
    pub(crate) attempts: [u32; STAGE_COUNT],
    pub(crate) pending_stage: Option<StageId>,
    pub(crate) last_error: Option<StageError>,
    pub(crate) draft_logs: String,
    pub(crate) submitted_logs: Option<Vec<String>>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    /// Creates a fresh run with every stage idle and only stage 1 unlocked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: generate_uuid(),
            started_at: now_utc(),
            unlocked_stage: StageId::FIRST,
            stage_outputs: Default::default(),
            stage_status: [StageStatus::Idle; STAGE_COUNT],
            attempts: [0; STAGE_COUNT],
            pending_stage: None,
            last_error: None,
            draft_logs: String::new(),
            submitted_logs: None,
        }
    }

    /// Identifier of this run; changes on every reset.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When this run was created.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Highest stage the user may view or act on.
    #[must_use]
    pub fn unlocked_stage(&self) -> StageId {
        self.unlocked_stage
    }

    /// Raw output of a stage, if it has succeeded in this run.
    #[must_use]
    pub fn stage_output(&self, stage: StageId) -> Option<&serde_json::Value> {
        self.stage_outputs[stage.slot()].as_ref()
    }

    /// Status of a stage's most recent invocation.
    #[must_use]
    pub fn stage_status(&self, stage: StageId) -> StageStatus {
        self.stage_status[stage.slot()]
    }

    /// Number of invocations started for a stage in this run.
    #[must_use]
    pub fn attempts(&self, stage: StageId) -> u32 {
        self.attempts[stage.slot()]
    }

    /// The stage currently in flight.
    #[must_use]
    pub fn pending_stage(&self) -> Option<StageId> {
        self.pending_stage
    }

    /// Returns true if any stage is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending_stage.is_some()
    }

    /// The live error, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&StageError> {
        self.last_error.as_ref()
    }

    /// Stage the retry action would re-run.
    #[must_use]
    pub fn retry_stage(&self) -> Option<StageId> {
        self.last_error.as_ref().and_then(|err| err.retry)
    }

    /// User-entered log text for stage 1.
    #[must_use]
    pub fn draft_logs(&self) -> &str {
        &self.draft_logs
    }

    /// Log lines sent by the last successful stage-1 call.
    #[must_use]
    pub fn submitted_logs(&self) -> Option<&[String]> {
        self.submitted_logs.as_deref()
    }

    /// Highest stage with an output, if any.
    #[must_use]
    pub fn last_succeeded_stage(&self) -> Option<StageId> {
        StageId::ALL
            .into_iter()
            .rev()
            .find(|stage| self.stage_output(*stage).is_some())
    }

    /// Returns true once every stage has produced output.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage_outputs.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_run_defaults() {
        let run = PipelineRun::new();
        assert_eq!(run.unlocked_stage(), StageId::Aggregate);
        assert!(StageId::ALL.iter().all(|s| run.stage_output(*s).is_none()));
        assert!(StageId::ALL
            .iter()
            .all(|s| run.stage_status(*s) == StageStatus::Idle));
        assert_eq!(run.pending_stage(), None);
        assert!(run.last_error().is_none());
        assert_eq!(run.retry_stage(), None);
        assert_eq!(run.draft_logs(), "");
        assert!(!run.is_complete());
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        assert_ne!(PipelineRun::new().run_id(), PipelineRun::new().run_id());
    }

    #[test]
    fn test_last_succeeded_stage() {
        let mut run = PipelineRun::new();
        assert_eq!(run.last_succeeded_stage(), None);

        run.stage_outputs[0] = Some(serde_json::json!({}));
        run.stage_outputs[1] = Some(serde_json::json!({}));
        assert_eq!(run.last_succeeded_stage(), Some(StageId::InferIntent));
    }

    #[test]
    fn test_snapshot_serializes() {
        let run = PipelineRun::new();
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["unlocked_stage"], serde_json::json!("aggregate"));
        assert_eq!(json["stage_outputs"].as_array().unwrap().len(), STAGE_COUNT);
    }
}
