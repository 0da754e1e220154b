//! Testing utilities for okrflow pipelines.
//!
//! This module provides:
//! - Scripted and gated stage invokers
//! - Sample logs and stage outputs
//! - Assertions over pipeline state

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_blocked, assert_has_output, assert_last_error_contains, assert_no_error,
    assert_no_output, assert_pristine, assert_retry_targets, assert_stage_status,
    assert_unlocked,
};
pub use fixtures::{sample_output, sample_success, scripted_invokers, ScriptedStages, SAMPLE_LOGS};
pub use mocks::{GatedInvoker, ScriptedInvoker};
