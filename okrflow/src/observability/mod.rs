//! Observability utilities.

mod logging;
mod timer;

pub use logging::{build_subscriber, init_logging};
pub use timer::StageTimer;
