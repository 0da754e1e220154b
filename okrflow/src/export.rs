//! Export of a run's results as a JSON document.

use crate::core::StageId;
use crate::errors::OkrflowError;
use crate::state::PipelineRun;
use crate::utils::{date_stamp, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix of exported file names.
pub const EXPORT_FILE_PREFIX: &str = "learning_analytics_results_";

/// Per-stage results of a run; stages that never succeeded are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResults {
    /// Log lines of the last successful stage-1 call.
    pub logs: Option<Vec<String>>,
    /// Stage-1 output.
    pub activities: Option<Value>,
    /// Stage-2 output.
    pub themes: Option<Value>,
    /// Stage-3 output.
    #[serde(rename = "knowledgeGraph")]
    pub knowledge_graph: Option<Value>,
    /// Stage-4 output.
    pub outcomes: Option<Value>,
    /// Stage-5 output.
    pub okrs: Option<Value>,
}

/// The exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportArtifact {
    /// When the export was taken.
    pub workflow_completion_date: Timestamp,
    /// Run the results belong to.
    pub pipeline_run_id: Uuid,
    /// Stage results.
    pub pipeline_results: PipelineResults,
}

impl ExportArtifact {
    /// Captures `run` as of now.
    #[must_use]
    pub fn from_run(run: &PipelineRun) -> Self {
        Self::from_run_at(run, now_utc())
    }

    /// Captures `run` with an explicit export time.
    #[must_use]
    pub fn from_run_at(run: &PipelineRun, at: Timestamp) -> Self {
        let output = |stage: StageId| run.stage_output(stage).cloned();
        Self {
            workflow_completion_date: at,
            pipeline_run_id: run.run_id(),
            pipeline_results: PipelineResults {
                logs: run.submitted_logs().map(<[String]>::to_vec),
                activities: output(StageId::Aggregate),
                themes: output(StageId::InferIntent),
                knowledge_graph: output(StageId::MapGraph),
                outcomes: output(StageId::GenerateOutcomes),
                okrs: output(StageId::GenerateOkr),
            },
        }
    }

    /// Suggested file name, dated by the export time.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{EXPORT_FILE_PREFIX}{}.json",
            date_stamp(&self.workflow_completion_date)
        )
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, OkrflowError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document into `dir` under [`Self::file_name`].
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, OkrflowError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, self.to_json_pretty()?).await?;
        Ok(path)
    }
}
