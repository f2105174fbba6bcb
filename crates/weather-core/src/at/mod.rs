//! The modem's AT-command protocol, minus the I/O.
//!
//! Everything in this module operates on byte slices that some other layer
//! already read off the serial line:
//!
//! - [`command`] – builders for every outbound command line.
//! - [`frame`] – the bounded receive buffer and the frame snapshot it yields.
//! - [`response`] – `OK` / `ERROR` classification of a command response.
//! - [`notification`] – parsing of unsolicited `+IPD`, `CONNECT`, and
//!   `CLOSED` notifications while the modem is serving connections.
//!
//! The [`RequestHandler`] trait is the seam between the modem bridge and the
//! application: a handler turns one request payload into one reply payload.

pub mod command;
pub mod frame;
pub mod notification;
pub mod response;

pub use command::{AtCommand, LINE_TERMINATOR, SEND_OK};
pub use frame::{Fill, RxBuffer, RxFrame};
pub use notification::{
    parse_notification, ConnectionFrame, DropReason, LinkEventKind, Notification,
};
pub use response::{classify, ModemResponse};

/// Serves one request payload received on a multiplexed connection.
///
/// An empty reply means "nothing to send"; the bridge then transmits nothing
/// for this request.
pub trait RequestHandler: Send {
    fn respond(&mut self, request: &[u8]) -> Vec<u8>;
}

impl<F> RequestHandler for F
where
    F: FnMut(&[u8]) -> Vec<u8> + Send,
{
    fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        self(request)
    }
}

/// Returns the offset of the first occurrence of `needle` in `haystack`.
///
/// An empty needle matches nothing.
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
