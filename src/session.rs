//! Socket lifecycle and the EtherNet/IP session state machine.
//!
//! A [`Session`] owns one TCP stream and walks the states
//! `Closed → Registered → Connected` via RegisterSession and ForwardOpen,
//! and back down via ForwardClose and UnregisterSession. All I/O is
//! blocking; the socket timeout configured on the PLC handle bounds every
//! connect, send and receive.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use rand::Rng;
use tracing::{debug, trace, warn};

use crate::error::{LogixError, Result};
use crate::frame::{self, services};
use crate::PlcConfig;

/// Vendor id reported in ForwardOpen requests.
const ORIGINATOR_VENDOR_ID: u16 = 0x1337;

/// Originator serial number reported in ForwardOpen requests.
const ORIGINATOR_SERIAL: u32 = 42;

/// Fixed originator-to-target connection id.
const OT_CONNECTION_ID: u32 = 0x2000_0002;

/// Requested packet intervals, microseconds.
const OT_RPI: u32 = 0x0020_1234;
const TO_RPI: u32 = 0x0020_4001;

/// Connection sizes tried during auto-negotiation.
const LARGE_CONNECTION_SIZE: u16 = 4002;
const STANDARD_CONNECTION_SIZE: u16 = 504;

/// One EtherNet/IP session over one TCP stream.
#[derive(Debug, Default)]
pub struct Session {
    stream: Option<TcpStream>,
    session_handle: u32,
    ot_connection_id: u32,
    to_connection_id: u32,
    connection_serial: u16,
    sequence: u16,
    registered: bool,
    connected: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once RegisterSession has succeeded on an open socket.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// True while a ForwardOpen-negotiated connection is up.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn session_handle(&self) -> u32 {
        self.session_handle
    }

    /// The (O->T, T->O) connection id pair of the open connection, for
    /// diagnostics. Both are zero outside ForwardOpen/ForwardClose.
    pub fn connection_ids(&self) -> (u32, u32) {
        (self.ot_connection_id, self.to_connection_id)
    }

    /// Next SendUnitData sequence number. Starts at 1 and skips 0 on wrap.
    fn next_sequence(&mut self) -> u16 {
        let current = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        if self.sequence == 0 {
            self.sequence = 1;
        }
        current
    }

    /// Opens the TCP stream and registers the session.
    pub fn open(&mut self, config: &PlcConfig) -> Result<()> {
        if self.registered {
            return Ok(());
        }
        let timeout = Duration::from_secs_f64(config.socket_timeout);
        let addr = resolve(&config.ip, config.port)?;
        debug!(ip = %config.ip, port = config.port, "opening session");

        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|_| LogixError::ConnectionFailure)?;
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|_| LogixError::ConnectionFailure)?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|_| LogixError::ConnectionFailure)?;
        stream.set_nodelay(true).ok();
        self.stream = Some(stream);

        let reply = self.transact(&frame::register_session_frame())?;
        if reply.len() < 28 {
            self.drop_socket();
            return Err(LogixError::Protocol("RegisterSession reply too short".to_string()));
        }
        self.session_handle = u32::from_le_bytes([reply[4], reply[5], reply[6], reply[7]]);
        let status = frame::encap_status(&reply)?;
        if status != 0 {
            self.drop_socket();
            return Err(LogixError::Protocol(format!(
                "RegisterSession failed with status 0x{:08X}",
                status
            )));
        }
        self.registered = true;
        debug!(session_handle = self.session_handle, "session registered");
        Ok(())
    }

    /// Negotiates a CIP connection with ForwardOpen.
    ///
    /// Without a caller-supplied size, a LargeForwardOpen at 4002 bytes is
    /// tried first and a standard ForwardOpen at 504 on failure. A failed
    /// attempt leaves the session registered so the retry does not
    /// re-register.
    pub fn forward_open(&mut self, config: &PlcConfig) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        match config.connection_size {
            Some(size) => {
                let large = size > STANDARD_CONNECTION_SIZE;
                self.try_forward_open(config, size, large)
            }
            None => match self.try_forward_open(config, LARGE_CONNECTION_SIZE, true) {
                Ok(()) => Ok(()),
                Err(err) => {
                    debug!(error = %err, "large ForwardOpen refused, retrying standard");
                    self.try_forward_open(config, STANDARD_CONNECTION_SIZE, false)
                }
            },
        }
    }

    fn try_forward_open(&mut self, config: &PlcConfig, size: u16, large: bool) -> Result<()> {
        let mut rng = rand::thread_rng();
        let to_connection_id: u32 = rng.gen();
        let connection_serial: u16 = rng.gen();

        let cip = build_forward_open(config, size, large, to_connection_id, connection_serial);
        let reply = self.send_unconnected(&cip)?;

        let status = frame::cip_status(&reply, false)?;
        if status != 0 {
            return Err(LogixError::Cip { status });
        }
        if reply.len() < 48 {
            return Err(LogixError::Protocol("ForwardOpen reply too short".to_string()));
        }
        self.ot_connection_id =
            u32::from_le_bytes([reply[44], reply[45], reply[46], reply[47]]);
        self.to_connection_id = to_connection_id;
        self.connection_serial = connection_serial;
        self.sequence = 1;
        self.connected = true;
        debug!(
            connection_id = self.ot_connection_id,
            size, large, "connection opened"
        );
        Ok(())
    }

    /// Sends a CIP request over the connected channel and returns the full
    /// reply frame.
    pub fn send_connected(&mut self, cip: &[u8]) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(LogixError::Protocol("no open connection".to_string()));
        }
        let sequence = self.next_sequence();
        let frame = frame::unit_data_frame(self.session_handle, self.ot_connection_id, sequence, cip);
        self.transact(&frame)
    }

    /// Sends a CIP request unconnected (SendRRData) and returns the full
    /// reply frame.
    pub fn send_unconnected(&mut self, cip: &[u8]) -> Result<Vec<u8>> {
        if !self.registered {
            return Err(LogixError::Protocol("session not registered".to_string()));
        }
        let frame = frame::rr_data_frame(self.session_handle, cip);
        self.transact(&frame)
    }

    /// Sends a raw encapsulation frame and returns the full reply frame.
    pub fn transact(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.send_frame(frame)?;
        self.receive()
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        trace!(len = frame.len(), bytes = ?&frame[..frame.len().min(48)], "tx");
        let stream = self
            .stream
            .as_mut()
            .ok_or(LogixError::ConnectionFailure)?;
        if let Err(err) = stream.write_all(frame) {
            warn!(error = %err, "send failed");
            self.fail();
            return Err(LogixError::ConnectionFailure);
        }
        Ok(())
    }

    /// Reads one length-framed reply: at least the 4-byte command/length
    /// prefix, then up to `24 + length` bytes total, reassembling partial
    /// reads. A zero-byte read means the peer went away.
    fn receive(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(512);
        while buffer.len() < 4 {
            self.read_into(&mut buffer)?;
        }
        let total = frame::HEADER_LEN + frame::announced_length(&buffer)?;
        while buffer.len() < total {
            self.read_into(&mut buffer)?;
        }
        buffer.truncate(total);
        trace!(len = buffer.len(), bytes = ?&buffer[..buffer.len().min(48)], "rx");
        Ok(buffer)
    }

    fn read_into(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        let mut chunk = [0u8; 4096];
        let result = match self.stream.as_mut() {
            Some(stream) => stream.read(&mut chunk),
            None => return Err(LogixError::ConnectionLost),
        };
        match result {
            Ok(0) => {
                self.fail();
                Err(LogixError::ConnectionLost)
            }
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "receive failed");
                self.fail();
                Err(LogixError::ConnectionLost)
            }
        }
    }

    /// Tears the session down: ForwardClose if connected, UnregisterSession
    /// if registered, then the socket. Every step is best-effort; the call
    /// is idempotent and never raises.
    pub fn close(&mut self, config: &PlcConfig) {
        if self.connected {
            let cip = build_forward_close(config, self.connection_serial);
            if let Err(err) = self.send_unconnected(&cip).and_then(|reply| {
                let status = frame::cip_status(&reply, false)?;
                if status != 0 {
                    return Err(LogixError::Cip { status });
                }
                Ok(())
            }) {
                warn!(error = %err, "ForwardClose failed during teardown");
            }
            self.connected = false;
        }
        if self.registered {
            let frame = frame::unregister_session_frame(self.session_handle);
            if let Err(err) = self.send_frame(&frame) {
                warn!(error = %err, "UnregisterSession failed during teardown");
            }
            self.registered = false;
        }
        self.drop_socket();
        debug!("session closed");
    }

    /// Transitions to Closed after a socket failure, invalidating every
    /// session identifier.
    fn fail(&mut self) {
        self.registered = false;
        self.connected = false;
        self.session_handle = 0;
        self.ot_connection_id = 0;
        self.to_connection_id = 0;
        self.drop_socket();
    }

    fn drop_socket(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.shutdown(Shutdown::Both).ok();
        }
        self.session_handle = 0;
        self.ot_connection_id = 0;
        self.to_connection_id = 0;
        self.connected = false;
        self.registered = false;
    }
}

fn resolve(ip: &str, port: u16) -> Result<SocketAddr> {
    (ip, port)
        .to_socket_addrs()
        .map_err(|_| LogixError::ConnectionFailure)?
        .next()
        .ok_or(LogixError::ConnectionFailure)
}

/// Builds the ForwardOpen (0x54) or LargeForwardOpen (0x5B) request body.
fn build_forward_open(
    config: &PlcConfig,
    size: u16,
    large: bool,
    to_connection_id: u32,
    connection_serial: u16,
) -> Vec<u8> {
    let path = frame::connected_path(&config.effective_route());
    let mut cip = Vec::with_capacity(40 + path.len());

    cip.push(if large {
        services::LARGE_FORWARD_OPEN
    } else {
        services::FORWARD_OPEN
    });
    cip.push(0x02); // Path size in words
    cip.extend_from_slice(&[0x20, 0x06]); // Connection Manager class
    cip.extend_from_slice(&[0x24, 0x01]); // Instance 1
    cip.push(0x0A); // Priority
    cip.push(0x0E); // Timeout ticks
    cip.extend_from_slice(&OT_CONNECTION_ID.to_le_bytes());
    cip.extend_from_slice(&to_connection_id.to_le_bytes());
    cip.extend_from_slice(&connection_serial.to_le_bytes());
    cip.extend_from_slice(&ORIGINATOR_VENDOR_ID.to_le_bytes());
    cip.extend_from_slice(&ORIGINATOR_SERIAL.to_le_bytes());
    cip.extend_from_slice(&3u32.to_le_bytes()); // Connection timeout multiplier
    cip.extend_from_slice(&OT_RPI.to_le_bytes());
    if large {
        cip.extend_from_slice(&((0x4200u32 << 16) | size as u32).to_le_bytes());
    } else {
        cip.extend_from_slice(&(0x4200u16 | size).to_le_bytes());
    }
    cip.extend_from_slice(&TO_RPI.to_le_bytes());
    if large {
        cip.extend_from_slice(&((0x4200u32 << 16) | size as u32).to_le_bytes());
    } else {
        cip.extend_from_slice(&(0x4200u16 | size).to_le_bytes());
    }
    cip.push(0xA3); // Transport class and trigger
    cip.push((path.len() / 2) as u8);
    cip.extend_from_slice(&path);
    cip
}

/// Builds the ForwardClose (0x4E) request body. The addressing matches
/// ForwardOpen, with a reserved byte after the path size.
fn build_forward_close(config: &PlcConfig, connection_serial: u16) -> Vec<u8> {
    let path = frame::connected_path(&config.effective_route());
    let mut cip = Vec::with_capacity(20 + path.len());

    cip.push(services::FORWARD_CLOSE);
    cip.push(0x02); // Path size in words
    cip.extend_from_slice(&[0x20, 0x06]); // Connection Manager class
    cip.extend_from_slice(&[0x24, 0x01]); // Instance 1
    cip.push(0x0A); // Priority
    cip.push(0x0E); // Timeout ticks
    cip.extend_from_slice(&connection_serial.to_le_bytes());
    cip.extend_from_slice(&ORIGINATOR_VENDOR_ID.to_le_bytes());
    cip.extend_from_slice(&ORIGINATOR_SERIAL.to_le_bytes());
    cip.push((path.len() / 2) as u8);
    cip.push(0x00); // Reserved
    cip.extend_from_slice(&path);
    cip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::RouteHop;

    #[test]
    fn test_sequence_counter_skips_zero_on_wrap() {
        let mut session = Session {
            sequence: 1,
            ..Session::default()
        };
        assert_eq!(session.next_sequence(), 1);
        assert_eq!(session.next_sequence(), 2);

        session.sequence = u16::MAX;
        assert_eq!(session.next_sequence(), u16::MAX);
        // Wrapped past zero.
        assert_eq!(session.sequence, 1);
        assert_eq!(session.next_sequence(), 1);
    }

    #[test]
    fn test_sequence_counter_never_emits_zero() {
        let mut session = Session {
            sequence: 1,
            ..Session::default()
        };
        let mut previous = 0u16;
        for _ in 0..70_000 {
            let seq = session.next_sequence();
            assert_ne!(seq, 0);
            if previous != 0 && previous != u16::MAX {
                assert_eq!(seq, previous + 1);
            }
            previous = seq;
        }
    }

    #[test]
    fn test_forward_open_body_layout() {
        let config = PlcConfig::new("10.0.0.1");
        let cip = build_forward_open(&config, 504, false, 0xCAFEF00D, 0x1234);
        assert_eq!(cip[0], 0x54);
        assert_eq!(&cip[1..6], &[0x02, 0x20, 0x06, 0x24, 0x01]);
        assert_eq!(cip[6], 0x0A); // Priority
        assert_eq!(cip[7], 0x0E); // Timeout ticks
        assert_eq!(
            u32::from_le_bytes([cip[8], cip[9], cip[10], cip[11]]),
            0x2000_0002
        );
        assert_eq!(
            u32::from_le_bytes([cip[12], cip[13], cip[14], cip[15]]),
            0xCAFEF00D
        );
        assert_eq!(u16::from_le_bytes([cip[16], cip[17]]), 0x1234);
        assert_eq!(u16::from_le_bytes([cip[18], cip[19]]), 0x1337); // Vendor
        assert_eq!(u32::from_le_bytes([cip[20], cip[21], cip[22], cip[23]]), 42);
        assert_eq!(u32::from_le_bytes([cip[24], cip[25], cip[26], cip[27]]), 3);
        assert_eq!(
            u32::from_le_bytes([cip[28], cip[29], cip[30], cip[31]]),
            0x0020_1234
        );
        // 16-bit parameters: 0x4200 | 504.
        assert_eq!(u16::from_le_bytes([cip[32], cip[33]]), 0x4200 | 504);
        assert_eq!(
            u32::from_le_bytes([cip[34], cip[35], cip[36], cip[37]]),
            0x0020_4001
        );
        assert_eq!(u16::from_le_bytes([cip[38], cip[39]]), 0x4200 | 504);
        assert_eq!(cip[40], 0xA3);
        // Default route: backplane hop to slot 0, then the Message Router.
        assert_eq!(cip[41], 3); // Path words
        assert_eq!(&cip[42..], &[0x01, 0x00, 0x20, 0x02, 0x24, 0x01]);
    }

    #[test]
    fn test_large_forward_open_uses_32bit_parameters() {
        let config = PlcConfig::new("10.0.0.1");
        let cip = build_forward_open(&config, 4002, true, 0, 0);
        assert_eq!(cip[0], 0x5B);
        assert_eq!(
            u32::from_le_bytes([cip[32], cip[33], cip[34], cip[35]]),
            (0x4200u32 << 16) | 4002
        );
        assert_eq!(
            u32::from_le_bytes([cip[36], cip[37], cip[38], cip[39]]),
            0x0020_4001
        );
        assert_eq!(
            u32::from_le_bytes([cip[40], cip[41], cip[42], cip[43]]),
            (0x4200u32 << 16) | 4002
        );
        assert_eq!(cip[44], 0xA3);
    }

    #[test]
    fn test_micro800_omits_route_prefix() {
        let config = PlcConfig::new("10.0.0.1").micro800(true);
        let cip = build_forward_open(&config, 504, false, 0, 0);
        assert_eq!(cip[41], 2); // Terminator only
        assert_eq!(&cip[42..], &[0x20, 0x02, 0x24, 0x01]);
    }

    #[test]
    fn test_custom_route_reaches_forward_open_path() {
        let config =
            PlcConfig::new("10.0.0.1").route(vec![RouteHop::slot(1, 4), RouteHop::slot(2, 1)]);
        let cip = build_forward_open(&config, 504, false, 0, 0);
        assert_eq!(cip[41], 4);
        assert_eq!(&cip[42..], &[0x01, 0x04, 0x02, 0x01, 0x20, 0x02, 0x24, 0x01]);
    }

    #[test]
    fn test_forward_close_body_layout() {
        let config = PlcConfig::new("10.0.0.1");
        let cip = build_forward_close(&config, 0xBEEF);
        assert_eq!(cip[0], 0x4E);
        assert_eq!(&cip[1..6], &[0x02, 0x20, 0x06, 0x24, 0x01]);
        assert_eq!(u16::from_le_bytes([cip[8], cip[9]]), 0xBEEF);
        assert_eq!(u16::from_le_bytes([cip[10], cip[11]]), 0x1337);
        assert_eq!(u32::from_le_bytes([cip[12], cip[13], cip[14], cip[15]]), 42);
        assert_eq!(cip[16], 3); // Path words
        assert_eq!(cip[17], 0x00); // Reserved
        assert_eq!(&cip[18..], &[0x01, 0x00, 0x20, 0x02, 0x24, 0x01]);
    }

    #[test]
    fn test_close_is_idempotent_when_never_opened() {
        let config = PlcConfig::new("10.0.0.1");
        let mut session = Session::new();
        session.close(&config);
        session.close(&config);
        assert!(!session.is_registered());
        assert!(!session.is_connected());
    }
}
