//! EtherNet/IP encapsulation and CIP framing.
//!
//! Builds and parses the 24-byte encapsulation header, the Common Packet
//! Format item lists carried by SendRRData / SendUnitData, the connected
//! routing path used by ForwardOpen, and the UnconnectedSend wrapper used to
//! push a request through backplane and network hops. Everything here is
//! pure byte assembly; no I/O.

use crate::error::{LogixError, Result};

/// Encapsulation commands.
pub mod commands {
    pub const LIST_IDENTITY: u16 = 0x0063;
    pub const REGISTER_SESSION: u16 = 0x0065;
    pub const UNREGISTER_SESSION: u16 = 0x0066;
    pub const SEND_RR_DATA: u16 = 0x006F;
    pub const SEND_UNIT_DATA: u16 = 0x0070;
}

/// CIP service codes used by this crate.
///
/// `FORWARD_CLOSE` and `READ_MODIFY_WRITE` share the byte 0x4E: the code is
/// overloaded across object classes, so the two constants stay separate and
/// are never interchanged at call sites.
pub mod services {
    pub const GET_ATTRIBUTES_ALL: u8 = 0x01;
    pub const GET_ATTRIBUTE_SINGLE: u8 = 0x0E;
    pub const SET_ATTRIBUTE_SINGLE: u8 = 0x10;
    pub const MULTI_SERVICE: u8 = 0x0A;
    pub const READ_TAG: u8 = 0x4C;
    pub const WRITE_TAG: u8 = 0x4D;
    pub const READ_MODIFY_WRITE: u8 = 0x4E;
    pub const FORWARD_CLOSE: u8 = 0x4E;
    pub const UNCONNECTED_SEND: u8 = 0x52;
    pub const FORWARD_OPEN: u8 = 0x54;
    pub const LARGE_FORWARD_OPEN: u8 = 0x5B;
    pub const GET_INSTANCE_ATTRIBUTE_LIST: u8 = 0x55;
}

/// Size of the encapsulation header.
pub const HEADER_LEN: usize = 24;

/// Byte offset of the CIP reply within a SendRRData response frame.
pub const UNCONNECTED_CIP_OFFSET: usize = 40;

/// Byte offset of the CIP reply within a SendUnitData response frame.
pub const CONNECTED_CIP_OFFSET: usize = 46;

/// Sender context placed in every encapsulation header this crate sends
/// over TCP.
pub const SENDER_CONTEXT: [u8; 8] = [0x28, 0x6C, 0x6F, 0x67, 0x69, 0x78, 0x29, 0x00];

/// Message Router terminator appended to every connected path.
const MESSAGE_ROUTER_PATH: [u8; 4] = [0x20, 0x02, 0x24, 0x01];

/// One hop of a routing path.
///
/// A `Slot` hop addresses a backplane position; a `Link` hop carries an IP
/// address or named link as a length-prefixed, word-padded ASCII string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteHop {
    Slot { port: u8, slot: u8 },
    Link { port: u8, link: String },
}

impl RouteHop {
    /// Backplane hop to the given slot.
    pub fn slot(port: u8, slot: u8) -> Self {
        RouteHop::Slot { port, slot }
    }

    /// Network hop over the given link address.
    pub fn link(port: u8, link: impl Into<String>) -> Self {
        RouteHop::Link {
            port,
            link: link.into(),
        }
    }
}

/// Encodes a hop list into CIP path bytes.
pub fn encode_route(hops: &[RouteHop]) -> Vec<u8> {
    let mut path = Vec::new();
    for hop in hops {
        match hop {
            RouteHop::Slot { port, slot } => {
                path.push(*port);
                path.push(*slot);
            }
            RouteHop::Link { port, link } => {
                // Extended-link form: port id with bit 4 set, then the
                // length-prefixed address, word padded.
                path.push(port | 0x10);
                let bytes = link.as_bytes();
                path.push(bytes.len() as u8);
                path.extend_from_slice(bytes);
                if bytes.len() % 2 != 0 {
                    path.push(0x00);
                }
            }
        }
    }
    path
}

/// Builds the connected path for ForwardOpen / ForwardClose: the route hops
/// followed by the Message Router terminator.
pub fn connected_path(route: &[RouteHop]) -> Vec<u8> {
    let mut path = encode_route(route);
    path.extend_from_slice(&MESSAGE_ROUTER_PATH);
    path
}

/// Builds a 24-byte encapsulation header.
pub fn encap_header(command: u16, length: u16, session_handle: u32) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(&command.to_le_bytes()); // Command
    header.extend_from_slice(&length.to_le_bytes()); // Length of what follows
    header.extend_from_slice(&session_handle.to_le_bytes()); // Session handle
    header.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Status
    header.extend_from_slice(&SENDER_CONTEXT); // Sender context
    header.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Options
    header
}

/// Builds a complete RegisterSession frame (protocol version 1).
pub fn register_session_frame() -> Vec<u8> {
    let mut frame = encap_header(commands::REGISTER_SESSION, 4, 0);
    frame.extend_from_slice(&1u16.to_le_bytes()); // Protocol version
    frame.extend_from_slice(&0u16.to_le_bytes()); // Option flags
    frame
}

/// Builds a complete UnregisterSession frame.
pub fn unregister_session_frame(session_handle: u32) -> Vec<u8> {
    encap_header(commands::UNREGISTER_SESSION, 0, session_handle)
}

/// Builds a ListIdentity frame with the given sender context.
pub fn list_identity_frame(context: &[u8; 8]) -> Vec<u8> {
    let mut frame = encap_header(commands::LIST_IDENTITY, 0, 0);
    frame[12..20].copy_from_slice(context);
    frame
}

/// Wraps a CIP request in a complete SendRRData frame (unconnected
/// messaging).
pub fn rr_data_frame(session_handle: u32, cip: &[u8]) -> Vec<u8> {
    let payload_len = 16 + cip.len();
    let mut frame = encap_header(commands::SEND_RR_DATA, payload_len as u16, session_handle);
    frame.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Interface handle
    frame.extend_from_slice(&[0x00, 0x00]); // Timeout
    frame.extend_from_slice(&[0x02, 0x00]); // Item count
    frame.extend_from_slice(&[0x00, 0x00]); // Item 1: null address
    frame.extend_from_slice(&[0x00, 0x00]); // Item 1 length
    frame.extend_from_slice(&[0xB2, 0x00]); // Item 2: unconnected data
    frame.extend_from_slice(&(cip.len() as u16).to_le_bytes()); // Item 2 length
    frame.extend_from_slice(cip);
    frame
}

/// Wraps a CIP request in a complete SendUnitData frame (connected
/// messaging) addressed to `connection_id` with the given sequence number.
pub fn unit_data_frame(
    session_handle: u32,
    connection_id: u32,
    sequence: u16,
    cip: &[u8],
) -> Vec<u8> {
    let payload_len = 16 + 4 + 2 + cip.len(); // CPF prefix + connection id + sequence + CIP
    let mut frame = encap_header(commands::SEND_UNIT_DATA, payload_len as u16, session_handle);
    frame.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]); // Interface handle
    frame.extend_from_slice(&[0x00, 0x00]); // Timeout
    frame.extend_from_slice(&[0x02, 0x00]); // Item count
    frame.extend_from_slice(&[0xA1, 0x00]); // Item 1: connected address
    frame.extend_from_slice(&[0x04, 0x00]); // Item 1 length
    frame.extend_from_slice(&connection_id.to_le_bytes());
    frame.extend_from_slice(&[0xB1, 0x00]); // Item 2: connected data
    frame.extend_from_slice(&((2 + cip.len()) as u16).to_le_bytes()); // Item 2 length
    frame.extend_from_slice(&sequence.to_le_bytes());
    frame.extend_from_slice(cip);
    frame
}

/// Wraps an embedded CIP service in an UnconnectedSend (0x52) request
/// through the Connection Manager, appending the routing path.
pub fn unconnected_send(embedded: &[u8], route: &[RouteHop]) -> Vec<u8> {
    let mut cip = Vec::with_capacity(12 + embedded.len());
    cip.push(services::UNCONNECTED_SEND);
    cip.push(0x02); // Path size in words
    cip.extend_from_slice(&[0x20, 0x06]); // Connection Manager class
    cip.extend_from_slice(&[0x24, 0x01]); // Instance 1
    cip.push(0x0A); // Priority
    cip.push(0xFF); // Timeout ticks
    cip.extend_from_slice(&(embedded.len() as u16).to_le_bytes());
    cip.extend_from_slice(embedded);
    if embedded.len() % 2 != 0 {
        cip.push(0x00);
    }
    let path = encode_route(route);
    cip.push((path.len() / 2) as u8); // Route path size in words
    cip.push(0x00); // Reserved
    cip.extend_from_slice(&path);
    cip
}

/// Total frame length announced by an encapsulation header.
pub fn announced_length(header: &[u8]) -> Result<usize> {
    if header.len() < 4 {
        return Err(LogixError::Protocol("encapsulation header too short".to_string()));
    }
    Ok(u16::from_le_bytes([header[2], header[3]]) as usize)
}

/// Encapsulation-level status word of a reply frame.
pub fn encap_status(frame: &[u8]) -> Result<u32> {
    if frame.len() < 12 {
        return Err(LogixError::Protocol("reply shorter than encapsulation header".to_string()));
    }
    Ok(u32::from_le_bytes([frame[8], frame[9], frame[10], frame[11]]))
}

/// Returns the CIP reply bytes of a full response frame.
///
/// Connected replies carry their CIP data after the connected-address item
/// and sequence number; unconnected replies directly after the data item
/// header.
pub fn cip_payload(frame: &[u8], connected: bool) -> Result<&[u8]> {
    let offset = if connected {
        CONNECTED_CIP_OFFSET
    } else {
        UNCONNECTED_CIP_OFFSET
    };
    if frame.len() < offset + 4 {
        return Err(LogixError::Protocol(format!(
            "reply too short for CIP data: {} bytes",
            frame.len()
        )));
    }
    Ok(&frame[offset..])
}

/// General status byte of a CIP reply within a full response frame.
pub fn cip_status(frame: &[u8], connected: bool) -> Result<u8> {
    Ok(cip_payload(frame, connected)?[2])
}
