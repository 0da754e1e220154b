//! Result of a single remote transformation call.

use serde::{Deserialize, Serialize};

/// What a stage invoker reports back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The call succeeded with the collaborator's raw output.
    Success {
        /// Opaque structured output.
        output: serde_json::Value,
    },
    /// The call failed; the reason is shown to the user verbatim.
    Failure {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl InvocationOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(output: serde_json::Value) -> Self {
        Self::Success { output }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Returns true if the call succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the output of a successful call.
    #[must_use]
    pub fn output(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success { output } => Some(output),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the reason of a failed call.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }
}

impl<E: std::fmt::Display> From<Result<serde_json::Value, E>> for InvocationOutcome {
    fn from(result: Result<serde_json::Value, E>) -> Self {
        match result {
            Ok(output) => Self::success(output),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}
