//! Pipeline state and its reducer.
//!
//! [`PipelineRun`] is plain data. [`reduce`] applies tagged
//! [`PipelineAction`]s to it and is where the run's invariants hold:
//! a single pending stage, outputs only from successful calls of the same
//! stage, and a monotonic unlocked-stage watermark.

mod action;
mod run;

pub use action::{reduce, PipelineAction, CANCELLED_REASON};
pub use run::PipelineRun;
