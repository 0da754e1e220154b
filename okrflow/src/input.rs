//! Input derivation for each stage.
//!
//! Inputs are always built from the live [`PipelineRun`], never cached, so a
//! retry after upstream data changed sees the current values.

use crate::core::StageId;
use crate::errors::PreconditionError;
use crate::state::PipelineRun;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The payload a stage invoker receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageInput {
    /// Stage 1: non-empty log lines.
    Logs {
        /// Parsed log entries.
        logs: Vec<String>,
    },
    /// Stage 2: the full stage-1 output.
    Activities {
        /// Aggregated activities.
        activities: Value,
    },
    /// Stage 3: themes extracted from the stage-2 output.
    Themes {
        /// Canonical themes value.
        themes: Value,
    },
    /// Stage 4: graph plus originating themes.
    GraphWithThemes {
        /// Stage-3 output.
        knowledge_graph: Value,
        /// Stage-2 output.
        themes: Value,
    },
    /// Stage 5: outcomes plus graph.
    OutcomesWithGraph {
        /// Stage-4 output.
        outcomes: Value,
        /// Stage-3 output.
        graph: Value,
    },
}

impl StageInput {
    /// The stage this input belongs to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::Logs { .. } => StageId::Aggregate,
            Self::Activities { .. } => StageId::InferIntent,
            Self::Themes { .. } => StageId::MapGraph,
            Self::GraphWithThemes { .. } => StageId::GenerateOutcomes,
            Self::OutcomesWithGraph { .. } => StageId::GenerateOkr,
        }
    }

    /// Request body expected by the remote transformation.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Logs { logs } => json!({ "logs": logs }),
            Self::Activities { activities } => json!({ "input": activities }),
            Self::Themes { themes } => json!({ "input": themes }),
            Self::GraphWithThemes {
                knowledge_graph,
                themes,
            } => json!({
                "input": {
                    "knowledge_graph": knowledge_graph,
                    "themes": themes,
                }
            }),
            Self::OutcomesWithGraph { outcomes, graph } => json!({
                "input": {
                    "outcomes": outcomes,
                    "graph": graph,
                }
            }),
        }
    }
}

/// Built-in example logs: a tutorial video, a repository, a design file, a
/// book and a course.
pub const SAMPLE_LOGS: &str = "https://www.youtube.com/watch?v=dD2EISBDjWM - React Tutorial
https://github.com/streamlit/streamlit - Data viz library
https://www.figma.com/file/abcd1234/UI-Mockups - UI Design
Read 'Clean Code' chapters 1-3
Completed Python pandas course";

/// Splits free text into log entries.
///
/// Entries are newline-delimited and trimmed; blank lines are dropped.
#[must_use]
pub fn parse_logs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Returns the themes value stage 3 consumes.
///
/// Collaborators nest their result as `{"themes": {"output": ...}}`, but not
/// always; when that path is missing or holds an empty value (null, false,
/// zero or an empty string) the whole value is used.
#[must_use]
pub fn canonical_themes(stage2_output: &Value) -> &Value {
    stage2_output
        .get("themes")
        .and_then(|themes| themes.get("output"))
        .filter(|output| !is_empty_value(output))
        .unwrap_or(stage2_output)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Builds the input for `stage` from the current state.
pub fn derive_input(stage: StageId, run: &PipelineRun) -> Result<StageInput, PreconditionError> {
    let require = |needed: StageId| {
        run.stage_output(needed)
            .cloned()
            .ok_or_else(|| PreconditionError::missing_input(stage))
    };
    // Outputs two steps back are always present when the predecessor is,
    // since a reset clears every stage together.
    let earlier = |needed: StageId| run.stage_output(needed).cloned().unwrap_or(Value::Null);

    match stage {
        StageId::Aggregate => {
            let logs = parse_logs(run.draft_logs());
            if logs.is_empty() {
                return Err(PreconditionError::missing_input(stage));
            }
            Ok(StageInput::Logs { logs })
        }
        StageId::InferIntent => Ok(StageInput::Activities {
            activities: require(StageId::Aggregate)?,
        }),
        StageId::MapGraph => {
            let themes = require(StageId::InferIntent)?;
            Ok(StageInput::Themes {
                themes: canonical_themes(&themes).clone(),
            })
        }
        StageId::GenerateOutcomes => Ok(StageInput::GraphWithThemes {
            knowledge_graph: require(StageId::MapGraph)?,
            themes: earlier(StageId::InferIntent),
        }),
        StageId::GenerateOkr => Ok(StageInput::OutcomesWithGraph {
            outcomes: require(StageId::GenerateOutcomes)?,
            graph: earlier(StageId::MapGraph),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run_with(outputs: &[(StageId, Value)]) -> PipelineRun {
        let mut run = PipelineRun::new();
        for (stage, value) in outputs {
            run.stage_outputs[stage.slot()] = Some(value.clone());
        }
        run
    }

    #[test]
    fn test_parse_logs_discards_blank_lines() {
        assert_eq!(parse_logs("a\nb\n"), vec!["a", "b"]);
        assert_eq!(parse_logs("a\n\n   \nb\r\n"), vec!["a", "b"]);
        assert_eq!(parse_logs("  padded entry  "), vec!["padded entry"]);
    }

    #[test]
    fn test_parse_logs_empty() {
        assert!(parse_logs("").is_empty());
        assert!(parse_logs("  \n\t\n").is_empty());
    }

    #[test]
    fn test_stage1_requires_logs() {
        let mut run = PipelineRun::new();
        run.draft_logs = "   \n".to_string();
        let err = derive_input(StageId::Aggregate, &run).unwrap_err();
        assert_eq!(err.message, "Please enter some learning logs.");

        run.draft_logs = "a\nb\n".to_string();
        let input = derive_input(StageId::Aggregate, &run).unwrap();
        assert_eq!(
            input,
            StageInput::Logs {
                logs: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_predecessor_for_every_later_stage() {
        let run = PipelineRun::new();
        for stage in &StageId::ALL[1..] {
            let err = derive_input(*stage, &run).unwrap_err();
            assert_eq!(err.stage, *stage);
            assert_eq!(err.message, stage.missing_input_message());
        }
    }

    #[test]
    fn test_stage2_takes_full_activities() {
        let activities = json!({"activities": {"output": "x"}});
        let run = run_with(&[(StageId::Aggregate, activities.clone())]);
        assert_eq!(
            derive_input(StageId::InferIntent, &run).unwrap(),
            StageInput::Activities { activities }
        );
    }

    #[test]
    fn test_stage3_uses_nested_themes_output() {
        let themes = json!({"themes": {"output": ["learning", "design"]}});
        let run = run_with(&[
            (StageId::Aggregate, json!({})),
            (StageId::InferIntent, themes),
        ]);
        assert_eq!(
            derive_input(StageId::MapGraph, &run).unwrap(),
            StageInput::Themes {
                themes: json!(["learning", "design"])
            }
        );
    }

    #[test]
    fn test_stage3_falls_back_to_whole_output() {
        let flat = json!({"topics": ["rust"]});
        assert_eq!(canonical_themes(&flat), &flat);

        let null_output = json!({"themes": {"output": null}});
        assert_eq!(canonical_themes(&null_output), &null_output);

        let not_object = json!("plain");
        assert_eq!(canonical_themes(&not_object), &not_object);
    }

    #[test]
    fn test_stage3_falls_back_on_empty_nested_output() {
        for empty in [json!(""), json!(false), json!(0), json!(0.0)] {
            let value = json!({"themes": {"output": empty}});
            assert_eq!(canonical_themes(&value), &value);
        }

        // empty containers still count as a result
        let nested_list = json!({"themes": {"output": []}});
        assert_eq!(canonical_themes(&nested_list), &json!([]));
        let nested_true = json!({"themes": {"output": true}});
        assert_eq!(canonical_themes(&nested_true), &json!(true));
    }

    #[test]
    fn test_stage4_and_stage5_combine_outputs() {
        let run = run_with(&[
            (StageId::Aggregate, json!("a")),
            (StageId::InferIntent, json!("t")),
            (StageId::MapGraph, json!("g")),
            (StageId::GenerateOutcomes, json!("o")),
        ]);

        let stage4 = derive_input(StageId::GenerateOutcomes, &run).unwrap();
        assert_eq!(
            stage4.to_payload(),
            json!({"input": {"knowledge_graph": "g", "themes": "t"}})
        );

        let stage5 = derive_input(StageId::GenerateOkr, &run).unwrap();
        assert_eq!(
            stage5.to_payload(),
            json!({"input": {"outcomes": "o", "graph": "g"}})
        );
    }

    #[test]
    fn test_payloads_and_stage_mapping() {
        let logs = StageInput::Logs {
            logs: vec!["a".to_string()],
        };
        assert_eq!(logs.stage(), StageId::Aggregate);
        assert_eq!(logs.to_payload(), json!({"logs": ["a"]}));

        let themes = StageInput::Themes { themes: json!([1]) };
        assert_eq!(themes.stage(), StageId::MapGraph);
        assert_eq!(themes.to_payload(), json!({"input": [1]}));
    }
}
