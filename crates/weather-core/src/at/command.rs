//! Outbound AT command lines.
//!
//! ```text
//! AT+CWMODE=2                              access-point mode
//! AT+CWSAP="<ssid>","<password>",<ch>,<ecn> access-point parameters
//! AT+CIPMUX=1                              multiple connections
//! AT+CIPSERVER=1,<port>                    start listening
//! AT+CIPSERVER=0                           stop listening
//! AT+CIPSEND=<id>,<len>                    announce a reply on a connection
//! ```
//!
//! Every command is terminated by `\r\n`.  The SSID and password are embedded
//! verbatim: the modem has no escape syntax, so a `"` or `,` inside either
//! string will be misparsed by the modem.

use std::fmt;

/// Line terminator appended to every command and to raw reply payloads.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// Final acknowledgement the modem prints after a reply has been sent.
pub const SEND_OK: &[u8] = b"SEND OK";

/// One outbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Select soft access-point mode.
    AccessPointMode,
    /// Configure the access point.
    ConfigureAccessPoint {
        ssid: String,
        password: String,
        channel: u8,
        encryption: u8,
    },
    /// Allow multiple simultaneous connections.
    EnableMultiplex,
    /// Start the TCP server on `port`.
    Listen { port: u16 },
    /// Stop the TCP server.
    StopListening,
    /// Announce `length` reply bytes for `connection_id`.
    Send { connection_id: u8, length: usize },
}

impl AtCommand {
    /// Renders the full command line including the terminator.
    pub fn encode(&self) -> Vec<u8> {
        let mut line = match self {
            Self::AccessPointMode => "AT+CWMODE=2".to_string(),
            Self::ConfigureAccessPoint {
                ssid,
                password,
                channel,
                encryption,
            } => format!("AT+CWSAP=\"{ssid}\",\"{password}\",{channel},{encryption}"),
            Self::EnableMultiplex => "AT+CIPMUX=1".to_string(),
            Self::Listen { port } => format!("AT+CIPSERVER=1,{port}"),
            Self::StopListening => "AT+CIPSERVER=0".to_string(),
            Self::Send {
                connection_id,
                length,
            } => format!("AT+CIPSEND={connection_id},{length}"),
        }
        .into_bytes();
        line.extend_from_slice(LINE_TERMINATOR);
        line
    }

    /// Short name used in log lines and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccessPointMode => "CWMODE",
            Self::ConfigureAccessPoint { .. } => "CWSAP",
            Self::EnableMultiplex => "CIPMUX",
            Self::Listen { .. } | Self::StopListening => "CIPSERVER",
            Self::Send { .. } => "CIPSEND",
        }
    }
}

/// Human-readable form with the access-point password masked.
impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigureAccessPoint {
                ssid,
                channel,
                encryption,
                ..
            } => write!(f, "AT+CWSAP=\"{ssid}\",\"***\",{channel},{encryption}"),
            other => {
                let line = other.encode();
                let text = String::from_utf8_lossy(&line[..line.len() - LINE_TERMINATOR.len()]);
                f.write_str(&text)
            }
        }
    }
}
