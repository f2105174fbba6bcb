//! Parsing of unsolicited notifications while the modem is serving.
//!
//! In multi-connection mode the modem reports link changes and inbound data
//! as plain text, often several in one frame:
//!
//! ```text
//! 0,CONNECT\r\n
//! \r\n+IPD,0,12:{"index": 0}
//! 0,CLOSED\r\n
//! ```
//!
//! A data indication is `+IPD,<id>,<len>:` followed by exactly `<len>` raw
//! bytes.  Both numbers are plain decimal.  The declared length is checked
//! against the bytes actually present after the colon; a frame that claims
//! more than it carries is dropped, never read past its end.

use std::fmt;

use super::find_subslice;
use super::frame::RxFrame;

const DATA_MARKER: &[u8] = b"+IPD,";
const CONNECT_MARKER: &[u8] = b"CONNECT\r\n";
const CLOSED_MARKER: &[u8] = b"CLOSED\r\n";

/// Why an inbound frame was discarded without a reply.
///
/// A drop is not an error: the session stays listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The receive buffer overflowed; the contents are meaningless.
    Overflow,
    /// No data, connect, or close marker was found.
    Unrecognized,
    /// A data marker was found but its id or length was not decimal.
    MalformedHeader,
    /// The declared payload length exceeds the bytes received.
    Truncated,
    /// No server session is active.
    Inactive,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Overflow => "receive buffer overflow",
            Self::Unrecognized => "unrecognized notification",
            Self::MalformedHeader => "malformed data header",
            Self::Truncated => "payload shorter than declared length",
            Self::Inactive => "no active server session",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEventKind {
    Connected,
    Closed,
}

/// Inbound payload for one multiplexed connection.
///
/// Borrows from the frame it was parsed out of; it lives only as long as one
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionFrame<'a> {
    pub connection_id: u8,
    pub payload: &'a [u8],
}

impl ConnectionFrame<'_> {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// A successfully parsed notification frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification<'a> {
    /// The line went quiet with nothing received.
    KeepAlive,
    /// A client connected or disconnected.  The id is `None` when the modem
    /// runs in single-connection mode and omits it.
    Link {
        kind: LinkEventKind,
        connection_id: Option<u8>,
    },
    /// A request payload to hand to the application.
    Data(ConnectionFrame<'a>),
}

/// Parses one notification frame.
///
/// Checks run in a fixed order: overflow, empty, marker presence, data header,
/// then the payload bounds.
///
/// # Errors
///
/// Returns the [`DropReason`] when the frame must be discarded.
pub fn parse_notification(frame: &RxFrame) -> Result<Notification<'_>, DropReason> {
    if frame.is_overflowed() {
        return Err(DropReason::Overflow);
    }
    let bytes = frame.as_bytes();
    if bytes.is_empty() {
        return Ok(Notification::KeepAlive);
    }

    if let Some(start) = find_subslice(bytes, DATA_MARKER) {
        return parse_data(&bytes[start + DATA_MARKER.len()..]).map(Notification::Data);
    }

    for (marker, kind) in [
        (CONNECT_MARKER, LinkEventKind::Connected),
        (CLOSED_MARKER, LinkEventKind::Closed),
    ] {
        if let Some(at) = find_subslice(bytes, marker) {
            return Ok(Notification::Link {
                kind,
                connection_id: link_id(&bytes[..at]),
            });
        }
    }

    Err(DropReason::Unrecognized)
}

/// Parses `<id>,<len>:<payload...>` (the part after `+IPD,`).
fn parse_data(header: &[u8]) -> Result<ConnectionFrame<'_>, DropReason> {
    let comma = header
        .iter()
        .position(|&b| b == b',')
        .ok_or(DropReason::MalformedHeader)?;
    let connection_id: u8 = parse_decimal(&header[..comma]).ok_or(DropReason::MalformedHeader)?;

    let rest = &header[comma + 1..];
    let colon = rest
        .iter()
        .position(|&b| b == b':')
        .ok_or(DropReason::MalformedHeader)?;
    let declared: usize = parse_decimal(&rest[..colon]).ok_or(DropReason::MalformedHeader)?;

    let body = &rest[colon + 1..];
    if declared > body.len() {
        return Err(DropReason::Truncated);
    }

    Ok(ConnectionFrame {
        connection_id,
        payload: &body[..declared],
    })
}

/// Reads the `<id>,` immediately preceding a link marker, if any.
fn link_id(before_marker: &[u8]) -> Option<u8> {
    let prefix = before_marker.strip_suffix(b",")?;
    let digits_start = prefix
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    parse_decimal(&prefix[digits_start..])
}

/// Strict unsigned decimal: at least one digit and nothing else.
fn parse_decimal<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(bytes: &[u8]) -> RxFrame {
        RxFrame::complete(bytes.to_vec())
    }

    #[test]
    fn test_data_indication_yields_id_and_payload() {
        let f = frame(b"\r\n+IPD,2,12:{\"index\": 0}");

        let parsed = parse_notification(&f).unwrap();

        assert_eq!(
            parsed,
            Notification::Data(ConnectionFrame {
                connection_id: 2,
                payload: b"{\"index\": 0}",
            })
        );
    }

    #[test]
    fn test_data_after_connect_in_same_frame_is_data() {
        let f = frame(b"0,CONNECT\r\n\r\n+IPD,0,3:abc");

        let parsed = parse_notification(&f).unwrap();

        match parsed {
            Notification::Data(cf) => {
                assert_eq!(cf.connection_id, 0);
                assert_eq!(cf.payload, b"abc");
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_is_limited_to_declared_length() {
        let f = frame(b"+IPD,1,2:abcdef");

        let Notification::Data(cf) = parse_notification(&f).unwrap() else {
            panic!("expected Data");
        };

        assert_eq!(cf.payload, b"ab");
        assert_eq!(cf.payload_len(), 2);
    }

    #[test]
    fn test_declared_length_beyond_buffer_is_truncated() {
        // Arrange – claims 50 bytes, carries 5
        let f = frame(b"+IPD,0,50:hello");

        // Act
        let result = parse_notification(&f);

        // Assert
        assert_eq!(result, Err(DropReason::Truncated));
    }

    #[test]
    fn test_zero_length_payload_is_accepted() {
        let f = frame(b"+IPD,4,0:");

        let parsed = parse_notification(&f).unwrap();

        assert_eq!(
            parsed,
            Notification::Data(ConnectionFrame {
                connection_id: 4,
                payload: b"",
            })
        );
    }

    #[test]
    fn test_non_decimal_length_is_malformed() {
        assert_eq!(
            parse_notification(&frame(b"+IPD,0,1x:a")),
            Err(DropReason::MalformedHeader)
        );
    }

    #[test]
    fn test_missing_colon_is_malformed() {
        assert_eq!(
            parse_notification(&frame(b"+IPD,0,5")),
            Err(DropReason::MalformedHeader)
        );
    }

    #[test]
    fn test_connection_id_above_u8_is_malformed() {
        assert_eq!(
            parse_notification(&frame(b"+IPD,300,1:a")),
            Err(DropReason::MalformedHeader)
        );
    }

    #[test]
    fn test_overflowed_frame_is_dropped_even_with_valid_data() {
        let f = RxFrame::overflowed(b"+IPD,0,1:a".to_vec());

        assert_eq!(parse_notification(&f), Err(DropReason::Overflow));
    }

    #[test]
    fn test_empty_frame_is_keep_alive() {
        assert_eq!(
            parse_notification(&RxFrame::empty()),
            Ok(Notification::KeepAlive)
        );
    }

    #[test]
    fn test_connect_with_id_is_link_event() {
        assert_eq!(
            parse_notification(&frame(b"3,CONNECT\r\n")),
            Ok(Notification::Link {
                kind: LinkEventKind::Connected,
                connection_id: Some(3),
            })
        );
    }

    #[test]
    fn test_closed_without_id_is_link_event() {
        assert_eq!(
            parse_notification(&frame(b"CLOSED\r\n")),
            Ok(Notification::Link {
                kind: LinkEventKind::Closed,
                connection_id: None,
            })
        );
    }

    #[test]
    fn test_unrelated_text_is_unrecognized() {
        assert_eq!(
            parse_notification(&frame(b"WIFI CONNECTED\r\n")),
            Err(DropReason::Unrecognized)
        );
    }
}
