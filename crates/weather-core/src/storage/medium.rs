//! Byte-addressable non-volatile memory.

use thiserror::Error;

/// Value of a byte that has never been written.
pub const ERASED_BYTE: u8 = 0xFF;

/// Errors reported by a non-volatile memory implementation.
#[derive(Debug, Error)]
pub enum NvError {
    /// The access extends past the end of the medium.
    #[error("access of {len} bytes at 0x{address:04X} exceeds capacity {capacity}")]
    OutOfBounds {
        address: usize,
        len: usize,
        capacity: usize,
    },

    /// The medium did not respond.
    #[error("storage medium unreachable: {0}")]
    Unreachable(String),
}

/// A fixed-size, byte-addressable store such as an I2C EEPROM.
pub trait NvMemory {
    /// Total addressable bytes.
    fn capacity(&self) -> usize;

    /// Fills `buf` from `address`.
    fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), NvError>;

    /// Writes `data` starting at `address`.
    fn write(&mut self, address: usize, data: &[u8]) -> Result<(), NvError>;
}

/// Checks that `[address, address + len)` fits in `capacity`.
pub fn check_bounds(address: usize, len: usize, capacity: usize) -> Result<(), NvError> {
    match address.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(NvError::OutOfBounds {
            address,
            len,
            capacity,
        }),
    }
}

/// An in-memory EEPROM that starts fully erased.
#[derive(Debug, Clone)]
pub struct MemoryEeprom {
    cells: Vec<u8>,
}

impl MemoryEeprom {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![ERASED_BYTE; capacity],
        }
    }

    /// Raw view of every cell, for inspection in tests.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

impl NvMemory for MemoryEeprom {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read(&self, address: usize, buf: &mut [u8]) -> Result<(), NvError> {
        check_bounds(address, buf.len(), self.cells.len())?;
        buf.copy_from_slice(&self.cells[address..address + buf.len()]);
        Ok(())
    }

    fn write(&mut self, address: usize, data: &[u8]) -> Result<(), NvError> {
        check_bounds(address, data.len(), self.cells.len())?;
        self.cells[address..address + data.len()].copy_from_slice(data);
        Ok(())
    }
}
