//! Domain records shared by the sampling path and the network path.
//!
//! Nothing in here performs I/O.  The types describe what a journal entry
//! *is*; the `storage` module decides where its bytes live.

pub mod record;
pub mod sample;
pub mod time;

pub use record::LogRecord;
pub use sample::{Sample, SAMPLE_WIDTH};
pub use time::{Bcd, CalendarTime, RtcTime, TimeError, RTC_TIME_WIDTH};
