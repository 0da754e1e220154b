//! Assertions over pipeline state.

use crate::core::{StageId, StageStatus};
use crate::errors::StageErrorKind;
use crate::state::PipelineRun;

/// Asserts the highest unlocked stage.
pub fn assert_unlocked(run: &PipelineRun, expected: StageId) {
    assert_eq!(
        run.unlocked_stage(),
        expected,
        "Expected stage {} unlocked, got {}",
        expected.index(),
        run.unlocked_stage().index()
    );
}

/// Asserts a stage's status.
pub fn assert_stage_status(run: &PipelineRun, stage: StageId, expected: StageStatus) {
    assert_eq!(
        run.stage_status(stage),
        expected,
        "Expected stage {} to be {expected}, got {}",
        stage.index(),
        run.stage_status(stage)
    );
}

/// Asserts that a stage has stored output.
pub fn assert_has_output(run: &PipelineRun, stage: StageId) {
    assert!(
        run.stage_output(stage).is_some(),
        "Expected output for stage {}, found none",
        stage.index()
    );
}

/// Asserts that a stage has no stored output.
pub fn assert_no_output(run: &PipelineRun, stage: StageId) {
    assert!(
        run.stage_output(stage).is_none(),
        "Expected no output for stage {}, found {:?}",
        stage.index(),
        run.stage_output(stage)
    );
}

/// Asserts that no error is live.
pub fn assert_no_error(run: &PipelineRun) {
    assert!(
        run.last_error().is_none(),
        "Expected no error, got {:?}",
        run.last_error()
    );
}

/// Asserts that the live error's message contains `needle`.
pub fn assert_last_error_contains(run: &PipelineRun, needle: &str) {
    let Some(err) = run.last_error() else {
        panic!("Expected an error containing '{needle}', found none");
    };
    assert!(
        err.message.contains(needle),
        "Expected error containing '{needle}', got '{}'",
        err.message
    );
}

/// Asserts the live error is a precondition error without a retry action.
pub fn assert_blocked(run: &PipelineRun, stage: StageId) {
    let Some(err) = run.last_error() else {
        panic!("Expected stage {} to be blocked, found no error", stage.index());
    };
    assert_eq!(err.kind, StageErrorKind::Precondition);
    assert_eq!(err.stage, stage);
    assert_eq!(err.retry, None, "Precondition errors carry no retry action");
}

/// Asserts the retry action points at `stage`.
pub fn assert_retry_targets(run: &PipelineRun, stage: StageId) {
    assert_eq!(
        run.retry_stage(),
        Some(stage),
        "Expected retry of stage {}, got {:?}",
        stage.index(),
        run.retry_stage()
    );
}

/// Asserts that every stage is idle and only stage 1 is unlocked.
pub fn assert_pristine(run: &PipelineRun) {
    assert_unlocked(run, StageId::FIRST);
    assert_eq!(run.pending_stage(), None);
    assert_no_error(run);
    for stage in StageId::ALL {
        assert_no_output(run, stage);
        assert_stage_status(run, stage, StageStatus::Idle);
    }
}
