use std::io;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LogixError>;

/// Errors produced while talking to a Logix controller.
///
/// Internal code propagates these with `?`; the public operations on
/// [`crate::LogixClient`] convert them into the `status` string of a
/// [`crate::Response`] via [`LogixError::status_text`], so callers that only
/// care about success can compare against `"Success"`.
#[derive(Debug, Error)]
pub enum LogixError {
    /// Underlying socket error outside the connect/send/recv stages.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TCP connect or send failed, or timed out.
    #[error("Connection failure")]
    ConnectionFailure,

    /// The peer closed the stream or a receive timed out mid-reply.
    #[error("Connection lost")]
    ConnectionLost,

    /// A reply did not have the shape the protocol requires.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The controller answered with a nonzero CIP general status.
    #[error("CIP error 0x{status:02X}")]
    Cip { status: u8 },

    /// A tag reference could not be parsed into an IOI.
    #[error("tag path error: {0}")]
    TagPath(String),

    /// A value could not be encoded or decoded for its CIP type.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// No reply arrived within the socket timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl LogixError {
    /// Renders this error as the status string carried by a
    /// [`crate::Response`].
    ///
    /// CIP service failures go through the fixed status table; transport
    /// failures map to the "Connection failure" / "Connection lost" strings
    /// the same table assigns to codes 0x01 and 0x07.
    pub fn status_text(&self) -> String {
        match self {
            LogixError::ConnectionFailure => cip_status_text(0x01),
            LogixError::ConnectionLost => cip_status_text(0x07),
            LogixError::Cip { status } => cip_status_text(*status),
            other => other.to_string(),
        }
    }
}

/// Maps a CIP general status code to its standard text.
///
/// Codes outside the table render as `"Unknown error <n>"`.
pub fn cip_status_text(status: u8) -> String {
    let text = match status {
        0x00 => "Success",
        0x01 => "Connection failure",
        0x02 => "Resource unavailable",
        0x03 => "Invalid parameter value",
        0x04 => "Path segment error",
        0x05 => "Path destination unknown",
        0x06 => "Partial transfer",
        0x07 => "Connection lost",
        0x08 => "Service not supported",
        0x09 => "Invalid Attribute",
        0x0A => "Attribute list error",
        0x0B => "Already in requested mode/state",
        0x0C => "Object state conflict",
        0x0D => "Object already exists",
        0x0E => "Attribute not settable",
        0x0F => "Privilege violation",
        0x10 => "Device state conflict",
        0x11 => "Reply data too large",
        0x12 => "Fragmentation of a primitive value",
        0x13 => "Not enough data",
        0x14 => "Attribute not supported",
        0x15 => "Too much data",
        0x16 => "Object does not exist",
        0x17 => "Service fragmentation sequence not in progress",
        0x18 => "No stored attribute data",
        0x19 => "Store operation failure",
        0x1A => "Routing failure, request packet too large",
        0x1B => "Routing failure, response packet too large",
        0x1C => "Missing attribute list entry data",
        0x1D => "Invalid attribute value list",
        0x1E => "Embedded service error",
        0x1F => "Vendor specific",
        0x20 => "Invalid Parameter",
        0x21 => "Write once value or medium already written",
        0x22 => "Invalid reply received",
        0x23 => "Buffer overflow",
        0x24 => "Invalid message format",
        0x25 => "Key failure in path",
        0x26 => "Path size invalid",
        0x27 => "Unexpected attribute in list",
        0x28 => "Invalid member ID",
        0x29 => "Member not settable",
        0x2A => "Group 2 only server general failure",
        0x2B => "Unknown Modbus error",
        0x2C => "Attribute not gettable",
        _ => return format!("Unknown error {}", status),
    };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table_known_codes() {
        assert_eq!(cip_status_text(0x00), "Success");
        assert_eq!(cip_status_text(0x04), "Path segment error");
        assert_eq!(cip_status_text(0x06), "Partial transfer");
        assert_eq!(cip_status_text(0x1E), "Embedded service error");
        assert_eq!(cip_status_text(0x2C), "Attribute not gettable");
    }

    #[test]
    fn test_status_table_unknown_code() {
        assert_eq!(cip_status_text(0x42), "Unknown error 66");
        assert_eq!(cip_status_text(0xFF), "Unknown error 255");
    }

    #[test]
    fn test_transport_errors_use_table_strings() {
        assert_eq!(
            LogixError::ConnectionFailure.status_text(),
            "Connection failure"
        );
        assert_eq!(LogixError::ConnectionLost.status_text(), "Connection lost");
        assert_eq!(
            LogixError::Cip { status: 0x05 }.status_text(),
            "Path destination unknown"
        );
    }
}
