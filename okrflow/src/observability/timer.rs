//! Wall-clock timing for stage invocations.

use crate::core::StageId;
use std::time::Instant;

/// Measures how long one stage invocation takes.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
    stage: StageId,
}

impl StageTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(stage: StageId) -> Self {
        Self {
            start: Instant::now(),
            stage,
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the timed stage.
    #[must_use]
    pub fn stage(&self) -> StageId {
        self.stage
    }

    /// Stops the timer and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = StageTimer::start(StageId::MapGraph);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(timer.stage(), StageId::MapGraph);
        assert!(timer.finish() >= 5.0);
    }
}
