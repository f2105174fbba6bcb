//! The host's wall clock, presented in the RTC chip's packed BCD encoding.

use std::time::{SystemTime, UNIX_EPOCH};

use weather_core::{CalendarTime, Clock, ClockError, RtcTime};

/// Reads UTC from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&mut self) -> Result<RtcTime, ClockError> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClockError::Unavailable(format!("system clock before 1970: {e}")))?;
        CalendarTime::from_unix_secs(since_epoch.as_secs())
            .encode()
            .map_err(|e| ClockError::OutOfRange(e.to_string()))
    }
}
