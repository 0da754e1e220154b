//! Per-stage execution status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a stage sits in its `Idle → Pending → {Succeeded | Failed}` cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not invoked in this run.
    Idle,
    /// Invocation in flight.
    Pending,
    /// Last invocation succeeded.
    Succeeded,
    /// Last invocation failed.
    Failed,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pending => write!(f, "pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Idle.to_string(), "idle");
        assert_eq!(StageStatus::Pending.to_string(), "pending");
        assert_eq!(StageStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_stage_status_predicates() {
        assert!(StageStatus::Succeeded.is_success());
        assert!(StageStatus::Failed.is_failure());
        assert!(!StageStatus::Pending.is_success());
        assert!(!StageStatus::Idle.is_failure());
        assert_eq!(StageStatus::default(), StageStatus::Idle);
    }

    #[test]
    fn test_stage_status_serialize() {
        let json = serde_json::to_string(&StageStatus::Succeeded).unwrap();
        assert_eq!(json, r#""succeeded""#);

        let deserialized: StageStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, StageStatus::Succeeded);
    }
}
