//! A single journal entry as read back from storage.

use super::sample::{Sample, SAMPLE_WIDTH};
use super::time::RtcTime;

/// A fixed-width payload paired with the clock reading taken when it was
/// appended.
///
/// `W` is the payload width chosen when the log was built; the station uses
/// [`SAMPLE_WIDTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord<const W: usize> {
    pub payload: [u8; W],
    pub timestamp: RtcTime,
}

impl LogRecord<SAMPLE_WIDTH> {
    /// Interprets the payload as a sensor [`Sample`].
    pub fn sample(&self) -> Sample {
        Sample::from_bytes(self.payload)
    }
}
