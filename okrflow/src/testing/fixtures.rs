//! Sample data and pre-wired invoker sets.

use serde_json::{json, Value};
use std::sync::Arc;

use super::mocks::ScriptedInvoker;
use crate::core::{InvocationOutcome, StageId, STAGE_COUNT};
use crate::invoker::{StageInvoker, StageInvokers};

pub use crate::input::SAMPLE_LOGS;

/// A realistic response body for `stage`.
///
/// Shaped like the transformation service's replies: the result sits under
/// the stage's output key as `{"input": ..., "output": ...}`, with the output
/// text carrying a fenced JSON block.
#[must_use]
pub fn sample_output(stage: StageId) -> Value {
    let (input, body) = match stage {
        StageId::Aggregate => (
            json!(["Read 'Clean Code' chapters 1-3"]),
            json!([{"title": "Clean Code", "type": "reading", "topic": "software craftsmanship"}]),
        ),
        StageId::InferIntent => (
            json!([{"title": "Clean Code"}]),
            json!({"themes": ["code quality"], "intent": "write maintainable software"}),
        ),
        StageId::MapGraph => (
            json!({"themes": ["code quality"]}),
            json!({"nodes": ["code quality", "refactoring"], "edges": [["code quality", "refactoring"]]}),
        ),
        StageId::GenerateOutcomes => (
            json!({"nodes": ["code quality"]}),
            json!(["Can refactor a module without changing behaviour"]),
        ),
        StageId::GenerateOkr => (
            json!({"outcomes": []}),
            json!([{"objective": "Write cleaner code", "key_results": ["Refactor 3 modules"]}]),
        ),
    };
    json!({
        stage.output_key(): {
            "input": input,
            "output": format!("```json\n{body}\n```"),
        }
    })
}

/// A successful outcome carrying [`sample_output`].
#[must_use]
pub fn sample_success(stage: StageId) -> InvocationOutcome {
    InvocationOutcome::success(sample_output(stage))
}

/// Five scripted invokers, one per stage, kept reachable after wiring.
#[derive(Debug, Clone)]
pub struct ScriptedStages {
    invokers: [Arc<ScriptedInvoker>; STAGE_COUNT],
}

impl ScriptedStages {
    /// Creates invokers that answer every call with [`sample_output`].
    #[must_use]
    pub fn new() -> Self {
        let invokers = StageId::ALL.map(|stage| {
            let invoker = ScriptedInvoker::new(stage);
            invoker.set_fallback(sample_success(stage));
            Arc::new(invoker)
        });
        Self { invokers }
    }

    /// The scripted invoker for `stage`.
    #[must_use]
    pub fn get(&self, stage: StageId) -> &Arc<ScriptedInvoker> {
        &self.invokers[stage.slot()]
    }

    /// Total calls across all stages.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.invokers.iter().map(|invoker| invoker.call_count()).sum()
    }

    /// Wires the invokers into a [`StageInvokers`] set.
    #[must_use]
    pub fn invokers(&self) -> StageInvokers {
        StageInvokers::from_fn(|stage| Arc::clone(&self.invokers[stage.slot()]) as Arc<dyn StageInvoker>)
    }
}

impl Default for ScriptedStages {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a scripted stage set and its wired [`StageInvokers`].
#[must_use]
pub fn scripted_invokers() -> (StageInvokers, ScriptedStages) {
    let stages = ScriptedStages::new();
    (stages.invokers(), stages)
}
