//! # weather-core
//!
//! Shared library for the weather station containing the domain records, the
//! I/O-free half of the AT-command modem protocol, and the circular log that
//! journals samples into byte-addressable non-volatile memory.
//!
//! This crate has zero dependencies on sockets, serial ports, async runtimes,
//! or the host file system.  Everything that touches real I/O lives in the
//! `weather-station` crate and reaches this one through narrow traits.
//!
//! # Architecture overview
//!
//! - **`domain`** – Plain data: a sensor [`Sample`], the clock chip's packed
//!   BCD [`RtcTime`] and its decoded [`CalendarTime`], and the [`LogRecord`]
//!   pairing the two.
//!
//! - **`at`** – The modem's textual protocol: command builders, the bounded
//!   receive buffer, the `OK`/`ERROR` response classifier, and the parser for
//!   inbound connection notifications (`+IPD`, `CONNECT`, `CLOSED`).
//!
//! - **`storage`** – The [`CircularLog`] ring of fixed-width timestamped
//!   records, written through the [`NvMemory`] trait and stamped through the
//!   [`Clock`] trait.

pub mod at;
pub mod domain;
pub mod storage;

pub use at::{
    classify, parse_notification, AtCommand, ConnectionFrame, DropReason, LinkEventKind,
    ModemResponse, Notification, RequestHandler, RxBuffer, RxFrame,
};
pub use domain::{Bcd, CalendarTime, LogRecord, RtcTime, Sample, TimeError, SAMPLE_WIDTH};
pub use storage::{
    CircularLog, Clock, ClockError, LogGeometry, ManualClock, MemoryEeprom, NvError, NvMemory,
    StorageError,
};
