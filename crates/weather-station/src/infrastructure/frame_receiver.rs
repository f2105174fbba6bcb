//! Turning the modem's serial byte stream into frames.
//!
//! The modem never says where a response ends.  A frame is every byte that
//! arrives before the line stays quiet for one `byte_timeout`, capped at the
//! receive buffer's capacity.
//!
//! [`spawn_frame_reader`] runs a [`FrameReceiver`] on its own task and pushes
//! each non-empty frame onto a bounded channel.  The [`AtSession`] owns the
//! only receiver, so frames are handled strictly one at a time.
//!
//! Reads are one byte at a time; wrap a socket in `tokio::io::BufReader`
//! before handing it over.
//!
//! [`AtSession`]: super::at_session::AtSession

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use weather_core::{at::Fill, RxBuffer, RxFrame};

pub struct FrameReceiver<R> {
    reader: R,
    buffer: RxBuffer,
    byte_timeout: Duration,
    eof: bool,
}

impl<R: AsyncRead + Unpin> FrameReceiver<R> {
    pub fn new(reader: R, capacity: usize, byte_timeout: Duration) -> Self {
        Self {
            reader,
            buffer: RxBuffer::new(capacity),
            byte_timeout,
            eof: false,
        }
    }

    /// Reads one frame.
    ///
    /// The inter-byte timeout also covers the first byte, so a quiet line
    /// yields an empty frame after one `byte_timeout`.  Reaching end of
    /// stream ends the frame like a timeout would.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying reader.
    pub async fn receive_frame(&mut self) -> io::Result<RxFrame> {
        if self.eof {
            return Ok(RxFrame::empty());
        }

        let mut byte = [0u8; 1];
        loop {
            // `read` is cancel-safe: a timed-out read never consumes a byte.
            match timeout(self.byte_timeout, self.reader.read(&mut byte)).await {
                Err(_) => return Ok(self.buffer.finish()),
                Ok(Ok(0)) => {
                    self.eof = true;
                    return Ok(self.buffer.finish());
                }
                Ok(Ok(_)) => {
                    if self.buffer.push(byte[0]) == Fill::Full {
                        let frame = self.buffer.finish_overflowed();
                        debug!(
                            capacity = self.buffer.capacity(),
                            "receive buffer overflowed"
                        );
                        return Ok(frame);
                    }
                }
                Ok(Err(e)) => return Err(e),
            }
        }
    }

    /// Waits for the next non-empty frame.
    ///
    /// Returns `None` once the stream has ended and nothing is left.
    pub async fn next_frame(&mut self) -> io::Result<Option<RxFrame>> {
        loop {
            let frame = self.receive_frame().await?;
            if !frame.is_empty() || frame.is_overflowed() {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }
        }
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }
}

/// Spawns the reader task for the modem's receive line.
///
/// The task ends, dropping its sender, on end of stream, on a read error, or
/// once the receiver is gone.  The session sees that as a closed link.
pub fn spawn_frame_reader<R>(
    reader: R,
    capacity: usize,
    byte_timeout: Duration,
    queue_depth: usize,
) -> (mpsc::Receiver<RxFrame>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(queue_depth.max(1));
    let mut receiver = FrameReceiver::new(reader, capacity, byte_timeout);

    let handle = tokio::spawn(async move {
        loop {
            match receiver.next_frame().await {
                Ok(Some(frame)) => {
                    if tx.send(frame).await.is_err() {
                        debug!("frame consumer gone; stopping reader");
                        break;
                    }
                }
                Ok(None) => {
                    info!("modem serial link closed (EOF)");
                    break;
                }
                Err(e) => {
                    warn!("modem serial read failed: {e}");
                    break;
                }
            }
        }
    });

    (rx, handle)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    const QUIET: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_receive_frame_ends_on_silence() {
        // Arrange
        let (mut modem, station) = tokio::io::duplex(256);
        let mut receiver = FrameReceiver::new(station, 200, QUIET);
        modem.write_all(b"AT+CIPMUX=1\r\r\nOK\r\n").await.unwrap();

        // Act
        let frame = receiver.receive_frame().await.unwrap();

        // Assert
        assert_eq!(frame.as_bytes(), b"AT+CIPMUX=1\r\r\nOK\r\n");
        assert!(!frame.is_overflowed());
    }

    #[tokio::test]
    async fn test_receive_frame_on_quiet_line_is_empty() {
        let (_modem, station) = tokio::io::duplex(64);
        let mut receiver = FrameReceiver::new(station, 200, QUIET);

        let frame = receiver.receive_frame().await.unwrap();

        assert!(frame.is_empty());
        assert!(!frame.is_overflowed());
    }

    #[tokio::test]
    async fn test_receive_frame_flags_overflow_at_capacity() {
        // Arrange – 20 bytes into a 16-byte buffer
        let (mut modem, station) = tokio::io::duplex(256);
        let mut receiver = FrameReceiver::new(station, 16, QUIET);
        modem.write_all(&[b'z'; 20]).await.unwrap();

        // Act
        let frame = receiver.receive_frame().await.unwrap();

        // Assert
        assert!(frame.is_overflowed());
        assert_eq!(frame.as_bytes().len(), 15);
    }

    #[tokio::test]
    async fn test_frames_separated_by_silence_are_distinct() {
        let (mut modem, station) = tokio::io::duplex(256);
        let mut receiver = FrameReceiver::new(station, 200, QUIET);

        modem.write_all(b"0,CONNECT\r\n").await.unwrap();
        let first = receiver.next_frame().await.unwrap().unwrap();
        modem.write_all(b"0,CLOSED\r\n").await.unwrap();
        let second = receiver.next_frame().await.unwrap().unwrap();

        assert_eq!(first.as_bytes(), b"0,CONNECT\r\n");
        assert_eq!(second.as_bytes(), b"0,CLOSED\r\n");
    }

    #[tokio::test]
    async fn test_next_frame_returns_none_after_eof() {
        let (mut modem, station) = tokio::io::duplex(64);
        let mut receiver = FrameReceiver::new(station, 200, QUIET);
        modem.write_all(b"bye").await.unwrap();
        drop(modem);

        let last = receiver.next_frame().await.unwrap();
        let after = receiver.next_frame().await.unwrap();

        assert_eq!(last.unwrap().as_bytes(), b"bye");
        assert!(after.is_none());
        assert!(receiver.is_eof());
    }

    #[tokio::test]
    async fn test_reader_task_forwards_frames_and_closes_channel_on_eof() {
        // Arrange
        let (mut modem, station) = tokio::io::duplex(256);
        let (mut frames, handle) = spawn_frame_reader(station, 200, QUIET, 4);

        // Act
        modem.write_all(b"\r\n+IPD,0,2:hi").await.unwrap();
        let frame = frames.recv().await.unwrap();
        drop(modem);
        let closed = frames.recv().await;

        // Assert
        assert_eq!(frame.as_bytes(), b"\r\n+IPD,0,2:hi");
        assert!(closed.is_none());
        handle.await.unwrap();
    }
}
