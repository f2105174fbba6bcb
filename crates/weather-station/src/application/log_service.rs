//! Serving journal entries to WiFi clients.
//!
//! [`LogRequestHandler`] is the [`RequestHandler`] the modem session calls for
//! every inbound payload.  It parses `{"index": N}`, reads the entry under the
//! log lock, and answers with the decoded JSON reply.
//!
//! A payload that is not a valid request gets no reply at all, matching the
//! network path's "drop malformed input" rule.  An index at or past
//! [`CircularLog::len`] gets an explicit error reply rather than the erased
//! bytes of an unwritten slot.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error, warn};
use weather_core::{CircularLog, Clock, NvMemory, RequestHandler, StorageError, SAMPLE_WIDTH};

use crate::domain::{ErrorReply, LogEntryReply, LogReply, LogRequest};

/// The sample log shared between the sampler and the request handler.
///
/// A `std` mutex is enough: no caller holds it across an `.await`.
pub type SharedLog<M, C> = Arc<Mutex<CircularLog<M, C, SAMPLE_WIDTH>>>;

/// Wraps a freshly initialised log for sharing.
pub fn share_log<M, C>(log: CircularLog<M, C, SAMPLE_WIDTH>) -> SharedLog<M, C> {
    Arc::new(Mutex::new(log))
}

/// Why a well-formed request could not be answered.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("log lock poisoned by a panicked writer")]
    Poisoned,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct LogRequestHandler<M, C> {
    log: SharedLog<M, C>,
}

impl<M: NvMemory, C: Clock> LogRequestHandler<M, C> {
    pub fn new(log: SharedLog<M, C>) -> Self {
        Self { log }
    }

    /// Looks up one entry by logical index.
    ///
    /// # Errors
    ///
    /// [`LookupError::Storage`] if the read fails, [`LookupError::Poisoned`]
    /// if a writer panicked while holding the lock.
    pub fn lookup(&self, request: LogRequest) -> Result<LogReply, LookupError> {
        let log = self.log.lock().map_err(|_| LookupError::Poisoned)?;

        let length = log.len();
        if request.index >= length {
            return Ok(LogReply::OutOfRange(ErrorReply::index_out_of_range(length)));
        }
        let record = log.read_by_index(request.index)?;
        drop(log);

        Ok(LogReply::Entry(LogEntryReply {
            timestamp: record.timestamp.decode(),
            data: record.sample(),
        }))
    }
}

impl<M, C> RequestHandler for LogRequestHandler<M, C>
where
    M: NvMemory + Send,
    C: Clock + Send,
{
    fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        let parsed: LogRequest = match serde_json::from_slice(request) {
            Ok(req) => req,
            Err(e) => {
                warn!(
                    "ignoring malformed request ({e}): {:?}",
                    String::from_utf8_lossy(request)
                );
                return Vec::new();
            }
        };

        let reply = match self.lookup(parsed) {
            Ok(reply) => reply,
            Err(e) => {
                error!("failed to read log entry {}: {e}", parsed.index);
                return Vec::new();
            }
        };

        match serde_json::to_vec(&reply) {
            Ok(bytes) => {
                debug!(index = parsed.index, len = bytes.len(), "serving log entry");
                bytes
            }
            Err(e) => {
                error!("failed to encode reply: {e}");
                Vec::new()
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use weather_core::{CalendarTime, LogGeometry, ManualClock, MemoryEeprom, Sample};

    fn clock_at(cal: CalendarTime) -> ManualClock {
        ManualClock::new(cal.encode().unwrap())
    }

    fn noon() -> CalendarTime {
        CalendarTime {
            hour: 12,
            minute: 0,
            second: 5,
            day_of_month: 3,
            month: 7,
            year: 24,
            day_of_week: 4,
        }
    }

    fn make_handler(
        samples: &[Sample],
    ) -> LogRequestHandler<MemoryEeprom, ManualClock> {
        let mut log = CircularLog::new(
            MemoryEeprom::new(1024),
            clock_at(noon()),
            LogGeometry::for_medium(1024),
        )
        .unwrap();
        log.init().unwrap();
        for s in samples {
            log.append(&s.to_bytes()).unwrap();
        }
        LogRequestHandler::new(share_log(log))
    }

    #[test]
    fn test_respond_returns_decoded_entry_json() {
        // Arrange
        let mut handler = make_handler(&[Sample::new(21, 55, 80)]);

        // Act
        let reply = handler.respond(br#"{"index": 0}"#);

        // Assert
        let json: serde_json::Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(json["data"]["temperature"], 21);
        assert_eq!(json["data"]["humidity"], 55);
        assert_eq!(json["data"]["light"], 80);
        assert_eq!(json["timestamp"]["hour"], 12);
        assert_eq!(json["timestamp"]["second"], 5);
        assert_eq!(json["timestamp"]["dayOfMonth"], 3);
        assert_eq!(json["timestamp"]["dayOfWeek"], 4);
        assert_eq!(json["timestamp"]["year"], 24);
    }

    #[test]
    fn test_respond_serves_oldest_first() {
        let mut handler = make_handler(&[Sample::new(1, 1, 1), Sample::new(2, 2, 2)]);

        let reply = handler.respond(br#"{"index":1}"#);

        let json: serde_json::Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(json["data"]["temperature"], 2);
    }

    #[test]
    fn test_index_past_length_gets_error_reply() {
        // Arrange – one entry, capacity far larger
        let mut handler = make_handler(&[Sample::new(21, 55, 80)]);

        // Act
        let reply = handler.respond(br#"{"index": 1}"#);

        // Assert
        assert_eq!(reply, br#"{"error":"index out of range","length":1}"#.to_vec());
    }

    #[test]
    fn test_malformed_request_gets_empty_reply() {
        let mut handler = make_handler(&[Sample::new(21, 55, 80)]);

        assert!(handler.respond(b"GET / HTTP/1.1").is_empty());
        assert!(handler.respond(br#"{"idx": 0}"#).is_empty());
    }

    #[test]
    fn test_lookup_on_empty_log_is_out_of_range() {
        let handler = make_handler(&[]);

        let reply = handler.lookup(LogRequest { index: 0 }).unwrap();

        assert_eq!(reply, LogReply::OutOfRange(ErrorReply::index_out_of_range(0)));
    }
}
