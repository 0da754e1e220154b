//! Core types shared across the pipeline.

mod outcome;
mod stage;
mod status;

pub use outcome::InvocationOutcome;
pub use stage::{StageId, STAGE_COUNT};
pub use status::StageStatus;
