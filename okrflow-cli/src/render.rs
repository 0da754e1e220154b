//! Plain-text rendering of pipeline state.

use okrflow::core::StageId;
use okrflow::envelope::decode_envelope;
use okrflow::input::parse_logs;
use okrflow::orchestrator::StageView;
use okrflow::state::PipelineRun;
use serde_json::Value;
use std::fmt::Write;

/// Lists the draft's log entries.
pub fn draft(text: &str) -> String {
    let entries = parse_logs(text);
    let mut out = format!("Draft has {} log entries", entries.len());
    for entry in entries {
        let _ = write!(out, "\n  - {entry}");
    }
    out
}

/// Navigation panel plus the live error and progress.
pub fn status(run: &PipelineRun, views: &[StageView]) -> String {
    let mut out = String::new();
    for view in views {
        let marker = if view.pending {
            "..."
        } else if view.status.is_failure() {
            " x "
        } else if view.completed {
            " ✓ "
        } else if view.active {
            " > "
        } else {
            "   "
        };
        let lock = if view.accessible { "" } else { " (locked)" };
        let _ = writeln!(
            out,
            "[{marker}] {}. {} - {}{lock}",
            view.index, view.title, view.description
        );
    }

    if let Some(stage) = run.pending_stage() {
        let _ = writeln!(out, "{}", stage.loading_message());
    }
    if let Some(err) = run.last_error() {
        let hint = if err.is_retryable() { " (retry available)" } else { "" };
        let _ = writeln!(out, "Error: {}{hint}", err.message);
    }
    out.trim_end().to_string()
}

/// A stage's output with model-text envelopes decoded.
pub fn output(stage: StageId, value: Option<&Value>) -> String {
    match value {
        None => format!("No output yet for step {} ({})", stage.index(), stage.title()),
        Some(value) => {
            let decoded = decode_envelope(value);
            serde_json::to_string_pretty(&decoded).unwrap_or_else(|_| decoded.to_string())
        }
    }
}
