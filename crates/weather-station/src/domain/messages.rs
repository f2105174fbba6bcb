//! JSON exchanged with WiFi clients.
//!
//! Request:
//! ```json
//! {"index": 0}
//! ```
//!
//! Reply:
//! ```json
//! {"timestamp":{"hour":9,"minute":15,"second":30,"dayOfMonth":14,"month":5,"year":24,"dayOfWeek":3},
//!  "data":{"temperature":21,"humidity":55,"light":80}}
//! ```
//!
//! Requests for an index past the end of the log get an [`ErrorReply`]
//! instead.  [`LogReply`] is either shape and serializes without a tag.

use serde::{Deserialize, Serialize};
use weather_core::{CalendarTime, Sample};

/// A client asking for the log entry at `index`, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRequest {
    pub index: usize,
}

/// One journal entry with its timestamp decoded to plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntryReply {
    pub timestamp: CalendarTime,
    pub data: Sample,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    /// Number of entries currently readable.
    pub length: usize,
}

impl ErrorReply {
    pub fn index_out_of_range(length: usize) -> Self {
        Self {
            error: "index out of range".to_string(),
            length,
        }
    }
}

/// Whatever a [`LogRequest`] is answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LogReply {
    Entry(LogEntryReply),
    OutOfRange(ErrorReply),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_from_spaced_json() {
        let req: LogRequest = serde_json::from_str("{\"index\": 7}").unwrap();
        assert_eq!(req, LogRequest { index: 7 });
    }

    #[test]
    fn test_negative_index_is_rejected() {
        let result: Result<LogRequest, _> = serde_json::from_str("{\"index\": -1}");
        assert!(result.is_err());
    }

    #[test]
    fn test_reply_serializes_with_firmware_key_order() {
        // Arrange
        let reply = LogEntryReply {
            timestamp: CalendarTime {
                hour: 9,
                minute: 15,
                second: 30,
                day_of_month: 14,
                month: 5,
                year: 24,
                day_of_week: 3,
            },
            data: Sample::new(21, 55, 80),
        };

        // Act
        let json = serde_json::to_string(&reply).unwrap();

        // Assert
        assert_eq!(
            json,
            concat!(
                r#"{"timestamp":{"hour":9,"minute":15,"second":30,"dayOfMonth":14,"month":5,"year":24,"dayOfWeek":3},"#,
                r#""data":{"temperature":21,"humidity":55,"light":80}}"#
            )
        );
    }

    #[test]
    fn test_out_of_range_reply_serializes_without_tag() {
        let reply = LogReply::OutOfRange(ErrorReply::index_out_of_range(4));

        let json = serde_json::to_string(&reply).unwrap();

        assert_eq!(json, r#"{"error":"index out of range","length":4}"#);
    }
}
