//! Classification of a command response frame.
//!
//! The modem answers every command with a status line, `OK` or `ERROR`,
//! surrounded by line breaks and possibly preceded by an echo of the command.
//! Classification is an unanchored substring search, so a payload that
//! happens to contain `\r\nOK\r\n` as data is classified Success.  That is a
//! known limitation of the modem protocol.

use super::find_subslice;
use super::frame::RxFrame;

const OK_TOKEN: &[u8] = b"\r\nOK\r\n";
const ERROR_TOKEN: &[u8] = b"\r\nERROR\r\n";

/// Outcome of inspecting one response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemResponse {
    Success,
    Failure,
    /// No status line found, or the frame overflowed.  The caller cannot
    /// proceed and must not retry blindly.
    Indeterminate,
}

/// Classifies a response frame.
///
/// Overflow takes precedence over content: an overflowed frame is
/// [`ModemResponse::Indeterminate`] even if it contains `OK`.
pub fn classify(frame: &RxFrame) -> ModemResponse {
    if frame.is_overflowed() {
        return ModemResponse::Indeterminate;
    }
    let bytes = frame.as_bytes();
    if find_subslice(bytes, OK_TOKEN).is_some() {
        ModemResponse::Success
    } else if find_subslice(bytes, ERROR_TOKEN).is_some() {
        ModemResponse::Failure
    } else {
        ModemResponse::Indeterminate
    }
}
