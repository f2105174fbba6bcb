//! Fixed-capacity ring of timestamped records in non-volatile memory.
//!
//! # Layout
//!
//! ```text
//! base_address
//! │
//! ▼
//! ┌──────────────┬─────────────┬──────────────┬─────────────┬─────┐   ┌────────┬───────┐
//! │ payload (W)  │ rtc time (7)│ payload (W)  │ rtc time (7)│ ... │   │cursor  │count  │
//! └──────────────┴─────────────┴──────────────┴─────────────┴─────┘   │u16 LE  │u16 LE │
//!  slot 0                       slot 1                                └────────┴───────┘
//!                                                                     metadata_address
//! ```
//!
//! Capacity is `region_size / (W + 7)`.  The cursor is the next slot to write
//! and the count saturates at capacity.  Before the ring first fills, logical
//! index `i` is slot `i`; afterwards the oldest record sits at the cursor and
//! logical index `i` is slot `(cursor + i) % capacity`.
//!
//! Each append writes the payload, then the timestamp, then the metadata.
//! The three writes are not atomic with respect to power loss.

use thiserror::Error;
use tracing::{debug, warn};

use super::clock::{Clock, ClockError};
use super::medium::{NvError, NvMemory};
use crate::domain::{LogRecord, RtcTime, RTC_TIME_WIDTH};

/// Bytes occupied by the persisted cursor and count.
pub const METADATA_WIDTH: usize = 4;

/// Errors returned by [`CircularLog`] operations.
///
/// None of these leave a partially applied append behind in memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("log not initialised; call init() first")]
    NotInitialised,

    #[error("index {index} out of range for capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("payload is {actual} bytes, record width is {expected}")]
    PayloadWidth { expected: usize, actual: usize },

    #[error("storage medium error: {0}")]
    Medium(#[from] NvError),

    #[error("clock read failed: {0}")]
    Clock(#[from] ClockError),

    #[error("invalid log geometry: {0}")]
    Geometry(String),
}

/// Where the log lives on the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogGeometry {
    /// First byte of slot 0.
    pub base_address: usize,
    /// Bytes reserved for record slots.
    pub region_size: usize,
    /// First byte of the cursor/count metadata.
    pub metadata_address: usize,
}

impl LogGeometry {
    /// Records fill the medium from address 0 with the metadata in the last
    /// four bytes.
    pub fn for_medium(medium_size: usize) -> Self {
        let region_size = medium_size.saturating_sub(METADATA_WIDTH);
        Self {
            base_address: 0,
            region_size,
            metadata_address: region_size,
        }
    }

    fn validate(&self, medium_size: usize, stride: usize) -> Result<usize, StorageError> {
        let capacity = self.region_size / stride;
        if capacity == 0 {
            return Err(StorageError::Geometry(format!(
                "region of {} bytes holds no {stride}-byte record",
                self.region_size
            )));
        }
        if capacity > usize::from(u16::MAX) {
            return Err(StorageError::Geometry(format!(
                "capacity {capacity} does not fit the 16-bit cursor"
            )));
        }

        let region_end = self
            .base_address
            .checked_add(self.region_size)
            .filter(|&end| end <= medium_size)
            .ok_or_else(|| {
                StorageError::Geometry(format!(
                    "record region 0x{:04X}+{} exceeds medium of {medium_size} bytes",
                    self.base_address, self.region_size
                ))
            })?;
        let meta_end = self
            .metadata_address
            .checked_add(METADATA_WIDTH)
            .filter(|&end| end <= medium_size)
            .ok_or_else(|| {
                StorageError::Geometry(format!(
                    "metadata at 0x{:04X} exceeds medium of {medium_size} bytes",
                    self.metadata_address
                ))
            })?;

        if self.metadata_address < region_end && self.base_address < meta_end {
            return Err(StorageError::Geometry(
                "metadata overlaps the record region".to_string(),
            ));
        }
        Ok(capacity)
    }
}

/// The ring itself.  `W` is the payload width of every record.
pub struct CircularLog<M, C, const W: usize> {
    memory: M,
    clock: C,
    geometry: LogGeometry,
    capacity: usize,
    cursor: usize,
    stored: usize,
    initialised: bool,
}

impl<M: NvMemory, C: Clock, const W: usize> CircularLog<M, C, W> {
    const STRIDE: usize = W + RTC_TIME_WIDTH;

    /// Builds a log over `memory`.  [`init`](Self::init) must be called
    /// before use.
    ///
    /// # Errors
    ///
    /// [`StorageError::Geometry`] if the geometry does not fit the medium.
    pub fn new(memory: M, clock: C, geometry: LogGeometry) -> Result<Self, StorageError> {
        let capacity = geometry.validate(memory.capacity(), Self::STRIDE)?;
        Ok(Self {
            memory,
            clock,
            geometry,
            capacity,
            cursor: 0,
            stored: 0,
            initialised: false,
        })
    }

    /// Loads the persisted cursor and count.
    ///
    /// Erased or inconsistent metadata resets the log to empty.
    ///
    /// # Errors
    ///
    /// Only if the medium itself cannot be read or written.
    pub fn init(&mut self) -> Result<(), StorageError> {
        let mut raw = [0u8; METADATA_WIDTH];
        self.memory.read(self.geometry.metadata_address, &mut raw)?;

        let cursor = usize::from(u16::from_le_bytes([raw[0], raw[1]]));
        let stored = usize::from(u16::from_le_bytes([raw[2], raw[3]]));

        if raw == [0xFF; METADATA_WIDTH] {
            warn!("log metadata is erased, starting with an empty log");
            self.reset()?;
        } else if !self.consistent(cursor, stored) {
            warn!(
                cursor,
                stored,
                capacity = self.capacity,
                "log metadata is inconsistent, starting with an empty log"
            );
            self.reset()?;
        } else {
            self.cursor = cursor;
            self.stored = stored;
        }

        self.initialised = true;
        debug!(
            capacity = self.capacity,
            cursor = self.cursor,
            stored = self.stored,
            "circular log initialised"
        );
        Ok(())
    }

    /// Appends one record stamped with the current clock time.
    ///
    /// # Errors
    ///
    /// - [`StorageError::PayloadWidth`] if `payload` is not `W` bytes.
    /// - [`StorageError::Clock`] if the clock fails; nothing is written.
    /// - [`StorageError::Medium`] if a write fails.
    pub fn append(&mut self, payload: &[u8]) -> Result<(), StorageError> {
        self.ensure_initialised()?;
        if payload.len() != W {
            return Err(StorageError::PayloadWidth {
                expected: W,
                actual: payload.len(),
            });
        }

        let timestamp = self.clock.now()?;

        let address = self.slot_address(self.cursor);
        self.memory.write(address, payload)?;
        self.memory.write(address + W, &timestamp.to_bytes())?;

        let cursor = (self.cursor + 1) % self.capacity;
        let stored = (self.stored + 1).min(self.capacity);
        self.persist(cursor, stored)?;

        if stored == self.capacity && self.stored < self.capacity {
            warn!(
                capacity = self.capacity,
                "circular log is full, oldest records will be overwritten"
            );
        }
        self.cursor = cursor;
        self.stored = stored;
        Ok(())
    }

    /// Reads the record at logical index `index`, oldest first.
    ///
    /// Only `index >= capacity` is rejected.  An index between
    /// [`len`](Self::len) and capacity returns whatever the slot holds,
    /// which for a fresh medium is erased bytes.
    pub fn read_by_index(&self, index: usize) -> Result<LogRecord<W>, StorageError> {
        self.ensure_initialised()?;
        if index >= self.capacity {
            return Err(StorageError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }

        let slot = if self.stored < self.capacity {
            index
        } else {
            (self.cursor + index) % self.capacity
        };
        let address = self.slot_address(slot);

        let mut payload = [0u8; W];
        self.memory.read(address, &mut payload)?;
        let mut time = [0u8; RTC_TIME_WIDTH];
        self.memory.read(address + W, &mut time)?;

        Ok(LogRecord {
            payload,
            timestamp: RtcTime::from_bytes(time),
        })
    }

    /// Number of readable records, never more than capacity.
    pub fn len(&self) -> usize {
        self.stored.min(self.capacity)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot the next append will write.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ensure_initialised(&self) -> Result<(), StorageError> {
        if self.initialised {
            Ok(())
        } else {
            Err(StorageError::NotInitialised)
        }
    }

    fn consistent(&self, cursor: usize, stored: usize) -> bool {
        cursor < self.capacity
            && stored <= self.capacity
            && (stored == self.capacity || cursor == stored)
    }

    fn slot_address(&self, slot: usize) -> usize {
        self.geometry.base_address + slot * Self::STRIDE
    }

    fn reset(&mut self) -> Result<(), StorageError> {
        self.persist(0, 0)?;
        self.cursor = 0;
        self.stored = 0;
        Ok(())
    }

    fn persist(&mut self, cursor: usize, stored: usize) -> Result<(), StorageError> {
        // Both values are bounded by capacity, which `validate` keeps <= u16::MAX.
        let cursor = u16::try_from(cursor).unwrap_or(u16::MAX);
        let stored = u16::try_from(stored).unwrap_or(u16::MAX);
        let mut raw = [0u8; METADATA_WIDTH];
        raw[..2].copy_from_slice(&cursor.to_le_bytes());
        raw[2..].copy_from_slice(&stored.to_le_bytes());
        self.memory.write(self.geometry.metadata_address, &raw)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bcd;
    use crate::storage::clock::ManualClock;
    use crate::storage::medium::MemoryEeprom;

    const W: usize = 3;
    const STRIDE: usize = W + RTC_TIME_WIDTH;

    /// A log of exactly `capacity` slots with metadata right after them.
    fn make_log(capacity: usize) -> CircularLog<MemoryEeprom, ManualClock, W> {
        let region = capacity * STRIDE;
        let memory = MemoryEeprom::new(region + METADATA_WIDTH);
        let geometry = LogGeometry {
            base_address: 0,
            region_size: region,
            metadata_address: region,
        };
        let mut log = CircularLog::new(memory, ManualClock::default(), geometry).unwrap();
        log.init().unwrap();
        log
    }

    fn stamp(second: u8) -> RtcTime {
        RtcTime {
            seconds: Bcd::encode(second).unwrap(),
            minutes: Bcd::encode(15).unwrap(),
            hours: Bcd::encode(9).unwrap(),
            day_of_week: Bcd::encode(2).unwrap(),
            day_of_month: Bcd::encode(14).unwrap(),
            month: Bcd::encode(5).unwrap(),
            year: Bcd::encode(24).unwrap(),
        }
    }

    /// Appends record number `n` with payload `[n, n, n]` at second `n`.
    fn append_numbered(log: &mut CircularLog<MemoryEeprom, ManualClock, W>, n: u8) {
        log.clock_mut().set(stamp(n));
        log.append(&[n, n, n]).unwrap();
    }

    #[test]
    fn test_fresh_log_is_empty() {
        let log = make_log(5);

        assert_eq!(log.len(), 0);
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 5);
    }

    #[test]
    fn test_init_on_erased_medium_persists_empty_metadata() {
        let log = make_log(5);

        let meta = &log.memory().as_bytes()[5 * STRIDE..];

        assert_eq!(meta, &[0, 0, 0, 0]);
    }

    #[test]
    fn test_capacity_is_region_divided_by_stride() {
        let memory = MemoryEeprom::new(1024);
        let log: CircularLog<_, _, W> =
            CircularLog::new(memory, ManualClock::default(), LogGeometry::for_medium(1024))
                .unwrap();

        assert_eq!(log.capacity(), 1020 / 10);
    }

    #[test]
    fn test_append_then_read_returns_payload_and_timestamp() {
        // Arrange
        let mut log = make_log(5);
        log.clock_mut().set(stamp(30));

        // Act
        log.append(&[21, 55, 80]).unwrap();
        let record = log.read_by_index(0).unwrap();

        // Assert
        assert_eq!(log.len(), 1);
        assert_eq!(record.payload, [21, 55, 80]);
        assert_eq!(record.timestamp, stamp(30));
    }

    #[test]
    fn test_append_before_wrap_reads_in_order() {
        let mut log = make_log(5);
        for n in 1..=3 {
            append_numbered(&mut log, n);
        }

        for i in 0..3 {
            let record = log.read_by_index(i).unwrap();
            assert_eq!(record.payload, [i as u8 + 1; 3]);
        }
        assert_eq!(log.cursor(), 3);
    }

    #[test]
    fn test_seven_appends_into_capacity_five_keeps_newest_five() {
        // Arrange – capacity 5, records numbered 1..=7
        let mut log = make_log(5);

        // Act
        for n in 1..=7 {
            append_numbered(&mut log, n);
        }

        // Assert
        assert_eq!(log.len(), 5);
        // 7 % 5 == 2: the cursor sits on slot 2, which holds the oldest
        // surviving record, the 3rd appended.
        assert_eq!(log.cursor(), 2);
        let oldest = log.read_by_index(0).unwrap();
        assert_eq!(oldest.payload, [3, 3, 3]);
        assert_eq!(oldest.timestamp, stamp(3));
        // Logical index 4 maps to slot (2 + 4) % 5 == 1, the 7th appended.
        let newest = log.read_by_index(4).unwrap();
        assert_eq!(newest.payload, [7, 7, 7]);
        assert_eq!(newest.timestamp, stamp(7));
    }

    #[test]
    fn test_every_logical_index_after_wrap_is_in_append_order() {
        let mut log = make_log(4);
        for n in 1..=10 {
            append_numbered(&mut log, n);
        }

        let payloads: Vec<u8> = (0..log.len())
            .map(|i| log.read_by_index(i).unwrap().payload[0])
            .collect();

        assert_eq!(payloads, vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_read_index_at_capacity_is_out_of_range() {
        let log = make_log(5);

        let result = log.read_by_index(5);

        assert!(matches!(
            result,
            Err(StorageError::IndexOutOfRange { index: 5, capacity: 5 })
        ));
    }

    #[test]
    fn test_read_unwritten_slot_returns_erased_bytes() {
        let log = make_log(5);

        let record = log.read_by_index(3).unwrap();

        assert_eq!(record.payload, [0xFF; 3]);
        assert_eq!(record.timestamp.to_bytes(), [0xFF; RTC_TIME_WIDTH]);
    }

    #[test]
    fn test_wrong_payload_width_is_rejected() {
        let mut log = make_log(5);

        let result = log.append(&[1, 2]);

        assert!(matches!(
            result,
            Err(StorageError::PayloadWidth { expected: 3, actual: 2 })
        ));
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_clock_failure_writes_nothing() {
        // Arrange
        let mut log = make_log(5);
        let before = log.memory().as_bytes().to_vec();
        log.clock_mut().set_failing(true);

        // Act
        let result = log.append(&[1, 2, 3]);

        // Assert
        assert!(matches!(result, Err(StorageError::Clock(_))));
        assert_eq!(log.len(), 0);
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.memory().as_bytes(), before.as_slice());
    }

    #[test]
    fn test_operations_before_init_fail() {
        let memory = MemoryEeprom::new(64);
        let mut log: CircularLog<_, _, W> =
            CircularLog::new(memory, ManualClock::default(), LogGeometry::for_medium(64))
                .unwrap();

        assert!(matches!(log.append(&[1, 2, 3]), Err(StorageError::NotInitialised)));
        assert!(matches!(log.read_by_index(0), Err(StorageError::NotInitialised)));
    }

    #[test]
    fn test_reinit_restores_cursor_and_count() {
        // Arrange – fill past wrap, then rebuild over the same bytes
        let mut log = make_log(5);
        for n in 1..=7 {
            append_numbered(&mut log, n);
        }
        let image = log.memory().clone();
        let geometry = LogGeometry {
            base_address: 0,
            region_size: 5 * STRIDE,
            metadata_address: 5 * STRIDE,
        };

        // Act
        let mut reopened: CircularLog<_, _, W> =
            CircularLog::new(image, ManualClock::default(), geometry).unwrap();
        reopened.init().unwrap();

        // Assert
        assert_eq!(reopened.len(), 5);
        assert_eq!(reopened.cursor(), 2);
        assert_eq!(reopened.read_by_index(0).unwrap().payload, [3, 3, 3]);
    }

    #[test]
    fn test_inconsistent_metadata_resets_to_empty() {
        // Arrange – cursor 1 with count 3 cannot happen before wrap
        let region = 5 * STRIDE;
        let mut memory = MemoryEeprom::new(region + METADATA_WIDTH);
        memory.write(region, &[1, 0, 3, 0]).unwrap();
        let geometry = LogGeometry {
            base_address: 0,
            region_size: region,
            metadata_address: region,
        };
        let mut log: CircularLog<_, _, W> =
            CircularLog::new(memory, ManualClock::default(), geometry).unwrap();

        // Act
        log.init().unwrap();

        // Assert
        assert_eq!(log.len(), 0);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn test_geometry_overlapping_metadata_is_rejected() {
        let memory = MemoryEeprom::new(100);
        let geometry = LogGeometry {
            base_address: 0,
            region_size: 50,
            metadata_address: 48,
        };

        let result: Result<CircularLog<_, _, W>, _> =
            CircularLog::new(memory, ManualClock::default(), geometry);

        assert!(matches!(result, Err(StorageError::Geometry(_))));
    }

    #[test]
    fn test_geometry_exceeding_medium_is_rejected() {
        let memory = MemoryEeprom::new(40);
        let geometry = LogGeometry {
            base_address: 0,
            region_size: 50,
            metadata_address: 0,
        };

        let result: Result<CircularLog<_, _, W>, _> =
            CircularLog::new(memory, ManualClock::default(), geometry);

        assert!(matches!(result, Err(StorageError::Geometry(_))));
    }

    #[test]
    fn test_region_too_small_for_one_record_is_rejected() {
        let memory = MemoryEeprom::new(64);
        let geometry = LogGeometry {
            base_address: 0,
            region_size: STRIDE - 1,
            metadata_address: 32,
        };

        let result: Result<CircularLog<_, _, W>, _> =
            CircularLog::new(memory, ManualClock::default(), geometry);

        assert!(matches!(result, Err(StorageError::Geometry(_))));
    }
}
