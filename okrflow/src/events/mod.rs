//! Lifecycle events emitted by the orchestrator.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A stage invocation started.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage invocation succeeded.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage invocation failed.
pub const STAGE_FAILED: &str = "stage.failed";
/// A stage could not start because its input is missing.
pub const STAGE_BLOCKED: &str = "stage.blocked";
/// A stage was not started because another one is in flight.
pub const STAGE_REJECTED: &str = "stage.rejected";
/// A completion arrived for a run that was reset meanwhile.
pub const STAGE_DISCARDED: &str = "stage.discarded";
/// The run was reset.
pub const PIPELINE_RESET: &str = "pipeline.reset";
/// The live error was dismissed.
pub const PIPELINE_ERROR_DISMISSED: &str = "pipeline.error_dismissed";
/// Results were exported.
pub const PIPELINE_EXPORTED: &str = "pipeline.exported";
