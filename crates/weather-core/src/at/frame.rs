//! Bounded receive buffer and the frame snapshot it produces.
//!
//! The modem has no framing of its own: a "frame" is whatever arrived on the
//! serial line before the line went quiet for one inter-byte timeout.  The
//! async reader in `weather-station` drives an [`RxBuffer`] byte by byte and
//! calls [`RxBuffer::finish`] when the timeout fires.
//!
//! If the buffer fills before the line goes quiet, the frame is marked
//! overflowed.  An overflowed frame's contents are not meaningful and every
//! consumer must discard it.

/// Result of pushing one byte into an [`RxBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The byte was stored and there is room for more.
    Accepted,
    /// The buffer reached capacity; the frame must end as overflowed.
    Full,
}

/// Accumulates bytes for one frame, up to a fixed capacity.
#[derive(Debug)]
pub struct RxBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl RxBuffer {
    /// Creates an empty buffer.  A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Appends one byte.
    pub fn push(&mut self, byte: u8) -> Fill {
        self.bytes.push(byte);
        if self.bytes.len() >= self.capacity {
            Fill::Full
        } else {
            Fill::Accepted
        }
    }

    /// Ends the frame normally (line went quiet) and resets the buffer.
    pub fn finish(&mut self) -> RxFrame {
        RxFrame::complete(std::mem::take(&mut self.bytes))
    }

    /// Ends the frame as overflowed and resets the buffer.
    ///
    /// The kept bytes are truncated to `capacity - 1`, leaving room for the
    /// terminator a fixed C buffer would carry.
    pub fn finish_overflowed(&mut self) -> RxFrame {
        let mut bytes = std::mem::take(&mut self.bytes);
        bytes.truncate(self.capacity - 1);
        RxFrame::overflowed(bytes)
    }
}

/// One received frame: its bytes and whether the buffer overflowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RxFrame {
    bytes: Vec<u8>,
    overflowed: bool,
}

impl RxFrame {
    pub fn complete(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            overflowed: false,
        }
    }

    pub fn overflowed(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            overflowed: true,
        }
    }

    /// A frame that timed out before its first byte.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
