//! Stage identities and their static metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of stages in the pipeline.
pub const STAGE_COUNT: usize = 5;

/// One of the five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Aggregate raw logs into activities.
    Aggregate,
    /// Infer themes and intent from activities.
    InferIntent,
    /// Map themes into a knowledge graph.
    MapGraph,
    /// Generate learning outcomes.
    GenerateOutcomes,
    /// Generate retrospective OKRs.
    GenerateOkr,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::Aggregate,
        Self::InferIntent,
        Self::MapGraph,
        Self::GenerateOutcomes,
        Self::GenerateOkr,
    ];

    /// The first stage.
    pub const FIRST: Self = Self::Aggregate;

    /// The last stage.
    pub const LAST: Self = Self::GenerateOkr;

    /// Returns the 1-based stage index.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Aggregate => 1,
            Self::InferIntent => 2,
            Self::MapGraph => 3,
            Self::GenerateOutcomes => 4,
            Self::GenerateOkr => 5,
        }
    }

    /// Looks up a stage by its 1-based index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        index
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Returns the stage feeding this one, if any.
    #[must_use]
    pub fn predecessor(self) -> Option<Self> {
        Self::from_index(self.index() - 1)
    }

    /// Returns the stage after this one, if any.
    #[must_use]
    pub fn successor(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    /// Machine name used in logs and events.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::InferIntent => "infer_intent",
            Self::MapGraph => "map_graph",
            Self::GenerateOutcomes => "generate_outcomes",
            Self::GenerateOkr => "generate_okr",
        }
    }

    /// Navigation title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Aggregate => "Log Aggregation",
            Self::InferIntent => "Intent Inference",
            Self::MapGraph => "Knowledge Graph",
            Self::GenerateOutcomes => "Outcome Generation",
            Self::GenerateOkr => "OKR Generation",
        }
    }

    /// Short navigation description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Aggregate => "Parse raw logs",
            Self::InferIntent => "Identify themes",
            Self::MapGraph => "Map relationships",
            Self::GenerateOutcomes => "Create outcomes",
            Self::GenerateOkr => "Generate OKRs",
        }
    }

    /// Path of the remote transformation, relative to the service base URL.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate",
            Self::InferIntent => "infer-intent",
            Self::MapGraph => "map-graph",
            Self::GenerateOutcomes => "generate-outcomes",
            Self::GenerateOkr => "generate-okr",
        }
    }

    /// Key of this stage's output in exported results.
    #[must_use]
    pub const fn output_key(self) -> &'static str {
        match self {
            Self::Aggregate => "activities",
            Self::InferIntent => "themes",
            Self::MapGraph => "knowledgeGraph",
            Self::GenerateOutcomes => "outcomes",
            Self::GenerateOkr => "okrs",
        }
    }

    /// Verb phrase completing "Failed to ..." when the remote call fails.
    #[must_use]
    pub const fn failure_label(self) -> &'static str {
        match self {
            Self::Aggregate => "aggregate logs",
            Self::InferIntent => "infer intent",
            Self::MapGraph => "map knowledge graph",
            Self::GenerateOutcomes => "generate outcomes",
            Self::GenerateOkr => "generate OKRs",
        }
    }

    /// Message shown when this stage is started without its input.
    #[must_use]
    pub const fn missing_input_message(self) -> &'static str {
        match self {
            Self::Aggregate => "Please enter some learning logs.",
            Self::InferIntent => "No activities data available. Complete Step 1 first.",
            Self::MapGraph => "No themes data available. Complete Step 2 first.",
            Self::GenerateOutcomes => "No knowledge graph data available. Complete Step 3 first.",
            Self::GenerateOkr => "No outcomes data available. Complete Step 4 first.",
        }
    }

    /// Progress text while this stage is in flight.
    #[must_use]
    pub const fn loading_message(self) -> &'static str {
        match self {
            Self::Aggregate => "Aggregating exploration logs...",
            Self::InferIntent => "Inferring themes and intent...",
            Self::MapGraph => "Mapping knowledge graph...",
            Self::GenerateOutcomes => "Generating learning outcomes...",
            Self::GenerateOkr => "Generating retrospective OKRs...",
        }
    }

    pub(crate) const fn slot(self) -> usize {
        self.index() - 1
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for stage in StageId::ALL {
            assert_eq!(StageId::from_index(stage.index()), Some(stage));
        }
        assert_eq!(StageId::from_index(0), None);
        assert_eq!(StageId::from_index(6), None);
    }

    #[test]
    fn test_neighbours() {
        assert_eq!(StageId::Aggregate.predecessor(), None);
        assert_eq!(StageId::MapGraph.predecessor(), Some(StageId::InferIntent));
        assert_eq!(StageId::GenerateOutcomes.successor(), Some(StageId::GenerateOkr));
        assert_eq!(StageId::GenerateOkr.successor(), None);
    }

    #[test]
    fn test_ordering_follows_index() {
        assert!(StageId::Aggregate < StageId::InferIntent);
        assert!(StageId::GenerateOutcomes < StageId::GenerateOkr);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(StageId::InferIntent.to_string(), "infer_intent");
        let json = serde_json::to_string(&StageId::GenerateOkr).unwrap();
        assert_eq!(json, r#""generate_okr""#);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(StageId::Aggregate.endpoint(), "aggregate");
        assert_eq!(StageId::GenerateOkr.endpoint(), "generate-okr");
    }
}
