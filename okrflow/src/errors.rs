//! Error types for the okrflow pipeline.
//!
//! Two layers live here. [`StageError`] is the value held in the pipeline's
//! single error slot and shown to the user; it is data, never propagated with
//! `?`. [`OkrflowError`] covers the fallible APIs around the state machine
//! (configuration, export, reducer dispatch).

use crate::core::StageId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for okrflow operations.
#[derive(Debug, Error)]
pub enum OkrflowError {
    /// A stage was started before its prerequisite was satisfied.
    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    /// The reducer refused an action.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// Another stage invocation is still in flight.
    #[error("Stage {} is still in flight", pending.index())]
    Busy {
        /// The stage currently pending.
        pending: StageId,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OkrflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised when a stage's required input is missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PreconditionError {
    /// The stage that could not start.
    pub stage: StageId,
    /// Human-readable message.
    pub message: String,
}

impl PreconditionError {
    /// Creates a precondition error with the stage's standard message.
    #[must_use]
    pub fn missing_input(stage: StageId) -> Self {
        Self {
            stage,
            message: stage.missing_input_message().to_string(),
        }
    }
}

/// Error raised when the reducer rejects an action for the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot apply '{action}': {reason}")]
pub struct TransitionError {
    /// Name of the rejected action.
    pub action: String,
    /// Why it was rejected.
    pub reason: String,
}

impl TransitionError {
    /// Creates a new transition error.
    #[must_use]
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Category of a stage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageErrorKind {
    /// Missing prerequisite; fixed by completing an earlier step.
    Precondition,
    /// The remote transformation failed.
    Invocation,
}

/// The live error of a pipeline run.
///
/// The retry action is the stage to re-run, stored next to the message so the
/// two are always set and cleared together. Retrying re-derives the input
/// from the state at retry time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    /// Message suitable for direct display.
    pub message: String,
    /// Error category.
    pub kind: StageErrorKind,
    /// The stage the error came from.
    pub stage: StageId,
    /// Stage to re-run when the user retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<StageId>,
}

impl StageError {
    /// Creates a non-retryable precondition error.
    #[must_use]
    pub fn precondition(err: &PreconditionError) -> Self {
        Self {
            message: err.message.clone(),
            kind: StageErrorKind::Precondition,
            stage: err.stage,
            retry: None,
        }
    }

    /// Creates a retryable invocation error labeled for the stage.
    #[must_use]
    pub fn invocation(stage: StageId, reason: &str) -> Self {
        Self {
            message: format!("Failed to {}: {reason}", stage.failure_label()),
            kind: StageErrorKind::Invocation,
            stage,
            retry: Some(stage),
        }
    }

    /// Returns true if a retry action is attached.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retry.is_some()
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        map.insert(
            "kind".to_string(),
            serde_json::to_value(self.kind).unwrap_or(serde_json::Value::Null),
        );
        map.insert("stage".to_string(), serde_json::json!(self.stage.index()));
        map.insert(
            "retryable".to_string(),
            serde_json::Value::Bool(self.is_retryable()),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_message() {
        let err = StageError::invocation(StageId::Aggregate, "network timeout");
        assert_eq!(err.message, "Failed to aggregate logs: network timeout");
        assert_eq!(err.retry, Some(StageId::Aggregate));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invocation_labels() {
        let cases = [
            (StageId::InferIntent, "Failed to infer intent: x"),
            (StageId::MapGraph, "Failed to map knowledge graph: x"),
            (StageId::GenerateOutcomes, "Failed to generate outcomes: x"),
            (StageId::GenerateOkr, "Failed to generate OKRs: x"),
        ];
        for (stage, expected) in cases {
            assert_eq!(StageError::invocation(stage, "x").message, expected);
        }
    }

    #[test]
    fn test_precondition_error_has_no_retry() {
        let err = StageError::precondition(&PreconditionError::missing_input(StageId::InferIntent));
        assert_eq!(err.message, "No activities data available. Complete Step 1 first.");
        assert_eq!(err.kind, StageErrorKind::Precondition);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_busy_display() {
        let err = OkrflowError::Busy {
            pending: StageId::MapGraph,
        };
        assert_eq!(err.to_string(), "Stage 3 is still in flight");
    }

    #[test]
    fn test_stage_error_to_dict() {
        let dict = StageError::invocation(StageId::GenerateOkr, "boom").to_dict();
        assert_eq!(dict["stage"], serde_json::json!(5));
        assert_eq!(dict["kind"], serde_json::json!("invocation"));
        assert_eq!(dict["retryable"], serde_json::json!(true));
    }
}
