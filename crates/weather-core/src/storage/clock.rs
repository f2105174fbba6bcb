//! Source of the timestamp stamped onto every journal record.

use thiserror::Error;

use crate::domain::RtcTime;

#[derive(Debug, Error)]
pub enum ClockError {
    /// The clock chip did not answer.
    #[error("clock unavailable: {0}")]
    Unavailable(String),

    /// The current time cannot be represented in the clock encoding.
    #[error("clock time out of range: {0}")]
    OutOfRange(String),
}

/// Reads the current time in the clock chip's packed encoding.
pub trait Clock {
    fn now(&mut self) -> Result<RtcTime, ClockError>;
}

/// A clock that returns whatever time it was last set to.
///
/// Used by tests and by bench harnesses that need deterministic timestamps.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: RtcTime,
    fail: bool,
}

impl ManualClock {
    pub fn new(time: RtcTime) -> Self {
        Self { time, fail: false }
    }

    pub fn set(&mut self, time: RtcTime) {
        self.time = time;
    }

    /// Makes every subsequent `now()` fail until cleared.
    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Result<RtcTime, ClockError> {
        if self.fail {
            return Err(ClockError::Unavailable("manual clock set to fail".to_string()));
        }
        Ok(self.time)
    }
}
