//! Mock invokers for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::core::{InvocationOutcome, StageId};
use crate::input::StageInput;
use crate::invoker::StageInvoker;

/// An invoker that replays queued outcomes and records every input.
///
/// Once the queue is empty it keeps returning the fallback outcome, which
/// defaults to a success echoing the stage name.
#[derive(Debug)]
pub struct ScriptedInvoker {
    stage: StageId,
    script: Mutex<VecDeque<InvocationOutcome>>,
    fallback: Mutex<InvocationOutcome>,
    inputs: Mutex<Vec<StageInput>>,
}

impl ScriptedInvoker {
    /// Creates a scripted invoker for `stage`.
    #[must_use]
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(InvocationOutcome::success(
                serde_json::json!({ stage.output_key(): { "output": stage.name() } }),
            )),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Queues an outcome for the next unscripted call.
    #[must_use]
    pub fn then(self, outcome: InvocationOutcome) -> Self {
        self.push(outcome);
        self
    }

    /// Queues an outcome on a shared invoker.
    pub fn push(&self, outcome: InvocationOutcome) {
        self.script.lock().push_back(outcome);
    }

    /// Sets the outcome returned once the script runs out.
    pub fn set_fallback(&self, outcome: InvocationOutcome) {
        *self.fallback.lock() = outcome;
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inputs.lock().len()
    }

    /// Returns every input received, oldest first.
    #[must_use]
    pub fn recorded_inputs(&self) -> Vec<StageInput> {
        self.inputs.lock().clone()
    }

    /// Returns the most recent input.
    #[must_use]
    pub fn last_input(&self) -> Option<StageInput> {
        self.inputs.lock().last().cloned()
    }
}

#[async_trait]
impl StageInvoker for ScriptedInvoker {
    fn stage(&self) -> StageId {
        self.stage
    }

    async fn invoke(&self, input: &StageInput) -> InvocationOutcome {
        self.inputs.lock().push(input.clone());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.lock().clone())
    }
}

/// An invoker that holds every call until [`GatedInvoker::open`] is called.
///
/// Used to observe the pipeline while a call is in flight.
#[derive(Debug)]
pub struct GatedInvoker {
    inner: Arc<ScriptedInvoker>,
    gate: Notify,
    entered: Notify,
}

impl GatedInvoker {
    /// Wraps a scripted invoker.
    #[must_use]
    pub fn new(inner: Arc<ScriptedInvoker>) -> Self {
        Self {
            inner,
            gate: Notify::new(),
            entered: Notify::new(),
        }
    }

    /// Lets one waiting call proceed.
    pub fn open(&self) {
        self.gate.notify_one();
    }

    /// Waits until a call has reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl StageInvoker for GatedInvoker {
    fn stage(&self) -> StageId {
        self.inner.stage()
    }

    async fn invoke(&self, input: &StageInput) -> InvocationOutcome {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.invoke(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_then_fallback() {
        let invoker = ScriptedInvoker::new(StageId::InferIntent)
            .then(InvocationOutcome::failure("first"));
        let input = StageInput::Activities { activities: json!({}) };

        assert_eq!(invoker.invoke(&input).await.reason(), Some("first"));
        let second = invoker.invoke(&input).await;
        assert_eq!(second.output(), Some(&json!({"themes": {"output": "infer_intent"}})));
        assert_eq!(invoker.call_count(), 2);
        assert_eq!(invoker.last_input(), Some(input));
    }

    #[tokio::test]
    async fn test_gated_invoker_waits_for_open() {
        let gated = Arc::new(GatedInvoker::new(Arc::new(ScriptedInvoker::new(StageId::Aggregate))));
        let call = {
            let gated = Arc::clone(&gated);
            tokio::spawn(async move {
                gated
                    .invoke(&StageInput::Logs { logs: vec!["a".to_string()] })
                    .await
            })
        };

        gated.wait_entered().await;
        assert!(!call.is_finished());
        gated.open();
        assert!(call.await.unwrap().is_success());
    }
}
