//! Per-call status tracking for an invoker.

use super::StageInvoker;
use crate::core::{InvocationOutcome, StageId, StageStatus};
use crate::input::StageInput;
use crate::observability::StageTimer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Snapshot of an invoker's own call history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallRecord {
    /// Status of the most recent call.
    pub status: StageStatus,
    /// Calls started through this invoker.
    pub calls: u64,
    /// Duration of the most recent finished call.
    pub last_duration_ms: Option<f64>,
}

impl Default for CallRecord {
    fn default() -> Self {
        Self {
            status: StageStatus::Idle,
            calls: 0,
            last_duration_ms: None,
        }
    }
}

/// Wraps an invoker and tracks pending/success/failure of its calls.
///
/// Tracking is local to the invoker; it does not read or write pipeline
/// state.
pub struct TrackedInvoker {
    inner: Arc<dyn StageInvoker>,
    record: Mutex<CallRecord>,
}

impl TrackedInvoker {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn StageInvoker>) -> Self {
        Self {
            inner,
            record: Mutex::new(CallRecord::default()),
        }
    }

    /// Status of the most recent call.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        self.record.lock().status
    }

    /// Returns true while a call is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status() == StageStatus::Pending
    }

    /// Snapshot of the call history.
    #[must_use]
    pub fn record(&self) -> CallRecord {
        *self.record.lock()
    }
}

#[async_trait]
impl StageInvoker for TrackedInvoker {
    fn stage(&self) -> StageId {
        self.inner.stage()
    }

    async fn invoke(&self, input: &StageInput) -> InvocationOutcome {
        {
            let mut record = self.record.lock();
            record.status = StageStatus::Pending;
            record.calls += 1;
        }
        let call = CallInFlight {
            record: &self.record,
            timer: Some(StageTimer::start(self.stage())),
        };

        let outcome = self.inner.invoke(input).await;

        call.settle(if outcome.is_success() {
            StageStatus::Succeeded
        } else {
            StageStatus::Failed
        });
        outcome
    }
}

/// Marks the call failed if the invoke future is dropped before it returns.
struct CallInFlight<'a> {
    record: &'a Mutex<CallRecord>,
    timer: Option<StageTimer>,
}

impl CallInFlight<'_> {
    fn settle(mut self, status: StageStatus) {
        self.finish(status);
    }

    fn finish(&mut self, status: StageStatus) {
        if let Some(timer) = self.timer.take() {
            let mut record = self.record.lock();
            record.status = status;
            record.last_duration_ms = Some(timer.finish());
        }
    }
}

impl Drop for CallInFlight<'_> {
    fn drop(&mut self) {
        self.finish(StageStatus::Failed);
    }
}

impl fmt::Debug for TrackedInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedInvoker")
            .field("stage", &self.stage())
            .field("record", &self.record())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GatedInvoker, ScriptedInvoker};
    use serde_json::json;
    use std::time::Duration;

    fn logs() -> StageInput {
        StageInput::Logs {
            logs: vec!["a".to_string()],
        }
    }

    #[test]
    fn test_starts_idle() {
        let tracked = TrackedInvoker::new(Arc::new(ScriptedInvoker::new(StageId::Aggregate)));
        assert_eq!(tracked.record(), CallRecord::default());
        assert!(!tracked.is_pending());
    }

    #[test]
    fn test_tracks_success_then_failure() {
        let scripted = Arc::new(
            ScriptedInvoker::new(StageId::Aggregate)
                .then(InvocationOutcome::success(json!({"activities": []})))
                .then(InvocationOutcome::failure("boom")),
        );
        let tracked = TrackedInvoker::new(scripted);

        let first = tokio_test::block_on(tracked.invoke(&logs()));
        assert!(first.is_success());
        assert_eq!(tracked.status(), StageStatus::Succeeded);

        let second = tokio_test::block_on(tracked.invoke(&logs()));
        assert_eq!(second.reason(), Some("boom"));

        let record = tracked.record();
        assert_eq!(record.status, StageStatus::Failed);
        assert_eq!(record.calls, 2);
        assert!(record.last_duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_dropped_call_is_recorded_as_failed() {
        let gated = Arc::new(GatedInvoker::new(Arc::new(ScriptedInvoker::new(
            StageId::Aggregate,
        ))));
        let tracked = TrackedInvoker::new(gated);

        let timed_out = tokio::time::timeout(Duration::from_millis(20), tracked.invoke(&logs())).await;
        assert!(timed_out.is_err());

        let record = tracked.record();
        assert_eq!(record.status, StageStatus::Failed);
        assert_eq!(record.calls, 1);
        assert!(record.last_duration_ms.is_some());
    }
}
