//! Persistent journal storage.
//!
//! [`CircularLog`] owns both of its collaborators: an [`NvMemory`] for the
//! bytes and a [`Clock`] for the timestamps.  Real hardware-backed
//! implementations live in the application crate; this module ships the
//! in-memory [`MemoryEeprom`] and [`ManualClock`] used by tests.

pub mod clock;
pub mod log;
pub mod medium;

pub use clock::{Clock, ClockError, ManualClock};
pub use log::{CircularLog, LogGeometry, StorageError, METADATA_WIDTH};
pub use medium::{check_bounds, MemoryEeprom, NvError, NvMemory, ERASED_BYTE};
