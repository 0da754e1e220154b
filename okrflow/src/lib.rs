//! # Okrflow
//!
//! Orchestration core for a five-stage learning analytics pipeline.
//!
//! A user submits free-text learning logs and each stage hands its output to a
//! remote transformation for the next step:
//!
//! 1. **Aggregate** raw logs into activities
//! 2. **Infer intent** and themes from the activities
//! 3. **Map** the themes into a knowledge graph
//! 4. **Generate outcomes** from the graph and themes
//! 5. **Generate OKRs** from the outcomes and graph
//!
//! The crate owns the state machine that decides how far the user may
//! proceed, what input each stage needs, and what happens on failure:
//!
//! - **Pipeline state**: a single [`state::PipelineRun`] mutated only through
//!   tagged [`state::PipelineAction`]s
//! - **Stage invokers**: one [`invoker::StageInvoker`] per remote
//!   transformation, with an HTTP implementation behind the `http` feature
//! - **Orchestrator**: sequencing, input derivation, and user-initiated retry
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use okrflow::prelude::*;
//!
//! let config = PipelineConfig::from_env()?;
//! let orchestrator = Orchestrator::new(StageInvokers::http(&config)?);
//!
//! orchestrator.set_draft_logs("Completed Python pandas course");
//! orchestrator.run_stage1().await;
//! orchestrator.run_stage2().await;
//!
//! println!("unlocked: {}", orchestrator.unlocked_stage());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod export;
pub mod input;
pub mod invoker;
pub mod observability;
pub mod orchestrator;
pub mod state;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LoggingConfig, PipelineConfig};
    pub use crate::core::{InvocationOutcome, StageId, StageStatus};
    pub use crate::envelope::decode_envelope;
    pub use crate::errors::{
        OkrflowError, PreconditionError, StageError, StageErrorKind, TransitionError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::export::ExportArtifact;
    pub use crate::input::{derive_input, parse_logs, StageInput, SAMPLE_LOGS};
    pub use crate::invoker::{StageInvoker, StageInvokers, TrackedInvoker};
    #[cfg(feature = "http")]
    pub use crate::invoker::HttpStageInvoker;
    pub use crate::orchestrator::{Orchestrator, StageRunOutcome, StageView};
    pub use crate::state::{reduce, PipelineAction, PipelineRun};
}
