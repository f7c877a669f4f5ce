// lib.rs - EtherNet/IP client library for Allen-Bradley Logix controllers
// =========================================================================
//
// # logix-eip
//
// A tag-oriented EtherNet/IP communication library for Allen-Bradley
// ControlLogix, CompactLogix and Micro800 controllers. The crate speaks the
// CIP explicit-messaging profile over TCP port 44818: it registers a
// session, negotiates a connection with ForwardOpen, compiles symbolic tag
// references into IOI paths, and moves typed values both ways. UDP
// broadcast discovery and module identity lookups ride the same framing.

//! Synchronous EtherNet/IP client for Allen-Bradley Logix controllers.
//!
//! One [`LogixClient`] owns one socket and one session; all I/O is blocking
//! and bounded by the configured socket timeout. Sharing a client across
//! threads requires external synchronization. Every public operation
//! returns a [`Response`] whose `status` string is `"Success"` or the CIP
//! status text of whatever went wrong; operations do not panic on protocol
//! or transport failures.
//!
//! ```rust,no_run
//! use logix_eip::{LogixClient, PlcValue};
//!
//! let mut plc = LogixClient::new("192.168.1.10");
//! let response = plc.read_tag("Motor.Speed");
//! if response.is_success() {
//!     println!("Motor.Speed = {:?}", response.value);
//! }
//! plc.write_tag("SetPoint", PlcValue::Dint(1500));
//! plc.close();
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::Duration;

use chrono::Utc;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

pub mod error;
pub mod frame;
pub mod identity;
pub mod session;
pub mod tag_list;
pub mod tag_path;
pub mod types;

pub use error::{cip_status_text, LogixError, Result};
pub use frame::RouteHop;
pub use identity::Device;
pub use tag_list::Tag;
pub use tag_path::ParsedTag;
pub use types::{codes, PlcValue, TypeInfo, TypeKind};

use frame::services;
use session::Session;
use tag_path::bit_within_dword;

/// IOI path of the Wall Clock Time object, instance 1, attribute 5.
const WALL_CLOCK_PATH: [u8; 6] = [0x20, 0x8B, 0x24, 0x01, 0x30, 0x05];

/// Sender context used by ListIdentity discovery broadcasts.
const DISCOVERY_CONTEXT: [u8; 8] = *b"HiMom\0\0\0";

/// Read timeout for each discovery reply iteration.
const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(500);

// =========================================================================
// CONFIGURATION
// =========================================================================

/// Connection settings for one controller.
///
/// # Examples
///
/// ```rust
/// use logix_eip::{PlcConfig, RouteHop};
///
/// let config = PlcConfig::new("192.168.1.10")
///     .processor_slot(2)
///     .socket_timeout(2.5)
///     .route(vec![RouteHop::slot(1, 4)]);
/// assert_eq!(config.port, 44818);
/// ```
#[derive(Debug, Clone)]
pub struct PlcConfig {
    /// Controller address (IP or resolvable host name).
    pub ip: String,
    /// EtherNet/IP TCP and UDP port.
    pub port: u16,
    /// Backplane slot of the processor, used for the default route.
    pub processor_slot: u8,
    /// Timeout in seconds applied to connect, send and receive.
    pub socket_timeout: f64,
    /// Micro800 controllers take no backplane hop in their CIP paths.
    pub micro800: bool,
    /// Explicit routing path; overrides the default backplane hop.
    pub route: Option<Vec<RouteHop>>,
    /// CIP connection size. Unset means auto-negotiate (4002, then 504).
    pub connection_size: Option<u16>,
    /// Label of the encoding used for STRING payloads.
    pub string_encoding: String,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            ip: String::new(),
            port: 44818,
            processor_slot: 0,
            socket_timeout: 5.0,
            micro800: false,
            route: None,
            connection_size: None,
            string_encoding: "utf-8".to_string(),
        }
    }
}

impl PlcConfig {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn processor_slot(mut self, slot: u8) -> Self {
        self.processor_slot = slot;
        self
    }

    pub fn socket_timeout(mut self, seconds: f64) -> Self {
        self.socket_timeout = seconds;
        self
    }

    pub fn micro800(mut self, micro800: bool) -> Self {
        self.micro800 = micro800;
        self
    }

    pub fn route(mut self, route: Vec<RouteHop>) -> Self {
        self.route = Some(route);
        self
    }

    pub fn connection_size(mut self, size: u16) -> Self {
        self.connection_size = Some(size);
        self
    }

    pub fn string_encoding(mut self, label: impl Into<String>) -> Self {
        self.string_encoding = label.into();
        self
    }

    /// The routing path CIP messages take: the explicit route when set, no
    /// route for Micro800, else one backplane hop to the processor slot.
    pub(crate) fn effective_route(&self) -> Vec<RouteHop> {
        if let Some(route) = &self.route {
            route.clone()
        } else if self.micro800 {
            Vec::new()
        } else {
            vec![RouteHop::slot(0x01, self.processor_slot)]
        }
    }

    fn encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.string_encoding.as_bytes()).unwrap_or(UTF_8)
    }
}

// =========================================================================
// RESPONSES AND REQUEST SPECIFICATIONS
// =========================================================================

/// Outcome of one public operation.
///
/// `status` is `"Success"` when the operation worked; otherwise it carries
/// the CIP status text, `"Connection failure"` / `"Connection lost"` for
/// transport problems, or a descriptive framing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub tag_name: Option<String>,
    pub value: Option<PlcValue>,
    pub status: String,
}

impl Response {
    fn success(tag_name: Option<String>, value: PlcValue) -> Self {
        Self {
            tag_name,
            value: Some(value),
            status: cip_status_text(0x00),
        }
    }

    fn failure(tag_name: Option<String>, status: String) -> Self {
        Self {
            tag_name,
            value: None,
            status,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "Success"
    }
}

/// One tag in a batch read: name, element count, optional CIP type code.
#[derive(Debug, Clone)]
pub struct TagRead {
    pub name: String,
    pub count: u16,
    pub data_type: Option<u8>,
}

impl TagRead {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 1,
            data_type: None,
        }
    }

    pub fn count(mut self, count: u16) -> Self {
        self.count = count;
        self
    }

    pub fn data_type(mut self, code: u8) -> Self {
        self.data_type = Some(code);
        self
    }
}

impl From<&str> for TagRead {
    fn from(name: &str) -> Self {
        TagRead::new(name)
    }
}

impl From<String> for TagRead {
    fn from(name: String) -> Self {
        TagRead::new(name)
    }
}

impl From<(&str, u16)> for TagRead {
    fn from((name, count): (&str, u16)) -> Self {
        TagRead::new(name).count(count)
    }
}

impl From<(&str, u16, u8)> for TagRead {
    fn from((name, count, code): (&str, u16, u8)) -> Self {
        TagRead::new(name).count(count).data_type(code)
    }
}

/// One tag in a batch write: name, value, optional CIP type code.
#[derive(Debug, Clone)]
pub struct TagWrite {
    pub name: String,
    pub value: PlcValue,
    pub data_type: Option<u8>,
}

impl TagWrite {
    pub fn new(name: impl Into<String>, value: PlcValue) -> Self {
        Self {
            name: name.into(),
            value,
            data_type: None,
        }
    }

    pub fn data_type(mut self, code: u8) -> Self {
        self.data_type = Some(code);
        self
    }
}

impl From<(&str, PlcValue)> for TagWrite {
    fn from((name, value): (&str, PlcValue)) -> Self {
        TagWrite::new(name, value)
    }
}

impl From<(&str, PlcValue, u8)> for TagWrite {
    fn from((name, value, code): (&str, PlcValue, u8)) -> Self {
        TagWrite::new(name, value).data_type(code)
    }
}

// =========================================================================
// CLIENT
// =========================================================================

/// Synchronous EtherNet/IP client for one Logix controller.
///
/// The client is constructed idle; the first operation opens the socket,
/// registers the session and negotiates the connection. [`LogixClient::close`]
/// (also run on drop) tears everything down in reverse and is safe to call
/// repeatedly.
#[derive(Debug)]
pub struct LogixClient {
    config: PlcConfig,
    session: Session,
    /// Declared CIP types learned from reads and tag-list walks, keyed by
    /// the program-qualified base tag name.
    known_types: HashMap<String, u8>,
}

impl LogixClient {
    /// Creates an idle client for the controller at `ip` with default
    /// settings.
    pub fn new(ip: impl Into<String>) -> Self {
        Self::with_config(PlcConfig::new(ip))
    }

    /// Creates an idle client from an explicit configuration.
    pub fn with_config(config: PlcConfig) -> Self {
        Self {
            config,
            session: Session::new(),
            known_types: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PlcConfig {
        &self.config
    }

    fn encoding(&self) -> &'static Encoding {
        self.config.encoding()
    }

    fn ensure_registered(&mut self) -> Result<()> {
        self.session.open(&self.config)
    }

    fn ensure_connected(&mut self) -> Result<()> {
        self.session.open(&self.config)?;
        self.session.forward_open(&self.config)
    }

    /// Sends a CIP request over the connected channel and returns the full
    /// reply frame after checking its general status.
    fn request_connected(&mut self, cip: &[u8]) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        let reply = self.session.send_connected(cip)?;
        let status = frame::cip_status(&reply, true)?;
        if status != 0 {
            return Err(LogixError::Cip { status });
        }
        Ok(reply)
    }

    // =====================================================================
    // READS
    // =====================================================================

    /// Reads one element of a tag.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use logix_eip::{LogixClient, PlcValue};
    ///
    /// let mut plc = LogixClient::new("192.168.1.10");
    /// match plc.read_tag("HeartBeat").value {
    ///     Some(PlcValue::Dint(v)) => println!("HeartBeat = {}", v),
    ///     _ => println!("read failed"),
    /// }
    /// ```
    pub fn read_tag(&mut self, tag: &str) -> Response {
        self.read_with(tag, 1, None)
    }

    /// Reads `count` consecutive elements starting at the addressed
    /// element; the result is a [`PlcValue::List`].
    pub fn read_array(&mut self, tag: &str, count: u16) -> Response {
        self.read_with(tag, count, None)
    }

    /// Reads a tag with an explicit element count and optional CIP type
    /// code. Supplying the type skips the learned-type lookup, which
    /// matters for DWORD-backed BOOL arrays read before any tag-list walk.
    pub fn read_with(&mut self, tag: &str, count: u16, data_type: Option<u8>) -> Response {
        match self.read_inner(tag, count, data_type) {
            Ok(value) => Response::success(Some(tag.to_string()), value),
            Err(err) => Response::failure(Some(tag.to_string()), err.status_text()),
        }
    }

    fn read_inner(&mut self, tag: &str, count: u16, data_type: Option<u8>) -> Result<PlcValue> {
        let parsed = ParsedTag::parse(tag)?;
        let base_type = data_type.or_else(|| self.known_types.get(&parsed.base_key()).copied());
        let ioi = parsed.encode_ioi(base_type);
        let cip = build_read_request(&ioi, count);

        let reply = self.request_connected(&cip)?;
        let payload = frame::cip_payload(&reply, true)?;
        let (code, value) =
            types::decode_read_payload(&payload[4..], count as usize, self.encoding())?;
        if types::type_info(code).is_some() && code != codes::STRUCT {
            self.known_types.insert(parsed.base_key(), code);
        }

        if let Some(bit) = parsed.bit_index {
            return extract_bit(&value, bit);
        }
        if base_type == Some(codes::DWORD) {
            if let Some(&index) = parsed.array_indices.first() {
                return extract_bit(&value, bit_within_dword(index));
            }
        }
        Ok(value)
    }

    /// Reads several tags in one Multiple Service Packet round.
    ///
    /// Results come back in input order, one [`Response`] per requested
    /// tag. A failing tag does not abort the batch: it carries its own
    /// status while the others decode normally.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use logix_eip::LogixClient;
    ///
    /// let mut plc = LogixClient::new("192.168.1.10");
    /// for response in plc.read_tags(["HeartBeat", "TextMessage", "Numbers[0]"]) {
    ///     println!("{:?} -> {}", response.tag_name, response.status);
    /// }
    /// ```
    pub fn read_tags<I, T>(&mut self, tags: I) -> Vec<Response>
    where
        I: IntoIterator<Item = T>,
        T: Into<TagRead>,
    {
        let requests: Vec<TagRead> = tags.into_iter().map(Into::into).collect();
        self.read_tags_batch(&requests)
    }

    fn read_tags_batch(&mut self, requests: &[TagRead]) -> Vec<Response> {
        let mut results: Vec<Option<Response>> = vec![None; requests.len()];
        let mut pending: Vec<(usize, ParsedTag, Option<u8>, Vec<u8>)> = Vec::new();

        for (index, request) in requests.iter().enumerate() {
            match ParsedTag::parse(&request.name) {
                Ok(parsed) => {
                    let base_type = request
                        .data_type
                        .or_else(|| self.known_types.get(&parsed.base_key()).copied());
                    let ioi = parsed.encode_ioi(base_type);
                    let cip = build_read_request(&ioi, request.count);
                    pending.push((index, parsed, base_type, cip));
                }
                Err(err) => {
                    results[index] =
                        Some(Response::failure(Some(request.name.clone()), err.status_text()));
                }
            }
        }

        if !pending.is_empty() {
            let frames: Vec<&[u8]> = pending.iter().map(|(_, _, _, cip)| cip.as_slice()).collect();
            let batch = build_multi_service(&frames);
            match self.multi_service_round(&batch, pending.len()) {
                Ok(replies) => {
                    for (slot, (index, parsed, base_type, _)) in pending.iter().enumerate() {
                        let request = &requests[*index];
                        results[*index] = Some(self.decode_batch_read(
                            request,
                            parsed,
                            *base_type,
                            replies.get(slot),
                        ));
                    }
                }
                Err(err) => {
                    let status = err.status_text();
                    for (index, _, _, _) in &pending {
                        results[*index] = Some(Response::failure(
                            Some(requests[*index].name.clone()),
                            status.clone(),
                        ));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.expect("every batch slot is filled"))
            .collect()
    }

    fn decode_batch_read(
        &mut self,
        request: &TagRead,
        parsed: &ParsedTag,
        base_type: Option<u8>,
        reply: Option<&BatchReply>,
    ) -> Response {
        let name = Some(request.name.clone());
        let reply = match reply {
            Some(reply) => reply,
            None => return Response::failure(name, "No response".to_string()),
        };
        if reply.status != 0 {
            return Response::failure(name, cip_status_text(reply.status));
        }
        let decoded = types::decode_read_payload(
            &reply.payload,
            request.count as usize,
            self.encoding(),
        );
        match decoded {
            Ok((code, value)) => {
                if types::type_info(code).is_some() && code != codes::STRUCT {
                    self.known_types.insert(parsed.base_key(), code);
                }
                let value = if let Some(bit) = parsed.bit_index {
                    extract_bit(&value, bit)
                } else if base_type == Some(codes::DWORD) && !parsed.array_indices.is_empty() {
                    extract_bit(&value, bit_within_dword(parsed.array_indices[0]))
                } else {
                    Ok(value)
                };
                match value {
                    Ok(value) => Response::success(name, value),
                    Err(err) => Response::failure(name, err.status_text()),
                }
            }
            Err(err) => Response::failure(name, err.status_text()),
        }
    }

    // =====================================================================
    // WRITES
    // =====================================================================

    /// Writes a value to a tag. The CIP type is the caller's, the learned
    /// type from an earlier read or tag-list walk, or guessed from the
    /// value.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use logix_eip::{LogixClient, PlcValue};
    ///
    /// let mut plc = LogixClient::new("192.168.1.10");
    /// plc.write_tag("SetPoint", PlcValue::Dint(1500));
    /// plc.write_tag("Message", PlcValue::String("running".to_string()));
    /// plc.write_tag("Limits", PlcValue::List(vec![
    ///     PlcValue::Real(1.5),
    ///     PlcValue::Real(99.5),
    /// ]));
    /// ```
    pub fn write_tag(&mut self, tag: &str, value: PlcValue) -> Response {
        self.write_with(tag, value, None)
    }

    /// Writes a value with an explicit CIP type code.
    pub fn write_with(&mut self, tag: &str, value: PlcValue, data_type: Option<u8>) -> Response {
        match self.write_inner(tag, &value, data_type) {
            Ok(()) => Response::success(Some(tag.to_string()), value),
            Err(err) => Response::failure(Some(tag.to_string()), err.status_text()),
        }
    }

    fn write_inner(&mut self, tag: &str, value: &PlcValue, data_type: Option<u8>) -> Result<()> {
        let parsed = ParsedTag::parse(tag)?;
        let mut declared =
            data_type.or_else(|| self.known_types.get(&parsed.base_key()).copied());

        // A bit-of-word write needs the width of the backing word; learn it
        // with a read when nothing declared it yet.
        if declared.is_none() && parsed.bit_index.is_some() {
            self.read_inner(tag, 1, None)?;
            declared = self.known_types.get(&parsed.base_key()).copied();
        }
        let type_code = declared.unwrap_or_else(|| value.type_code());

        let bit = match parsed.bit_index {
            Some(bit) => Some(bit),
            None if type_code == codes::DWORD
                && !parsed.array_indices.is_empty()
                && matches!(value, PlcValue::Bool(_)) =>
            {
                Some(bit_within_dword(parsed.array_indices[0]))
            }
            None => None,
        };

        let ioi = parsed.encode_ioi(Some(type_code));
        let cip = match bit {
            Some(bit) => {
                let size = types::type_info(type_code).map(|i| i.size).unwrap_or(4);
                let set = value
                    .as_i128()
                    .ok_or_else(|| {
                        LogixError::Encoding(format!("cannot write {:?} to a bit", value))
                    })?
                    != 0;
                let (or_mask, and_mask) = if set {
                    (1u64 << bit, u64::MAX)
                } else {
                    (0u64, !(1u64 << bit))
                };
                build_rmw_request(&ioi, size, or_mask, and_mask)
            }
            None => {
                let (bytes, count) = types::encode_elements(value, type_code)?;
                build_write_request(&ioi, type_code, count, &bytes)
            }
        };

        self.request_connected(&cip)?;
        Ok(())
    }

    /// Writes several tags in one Multiple Service Packet round. Results
    /// come back in input order; on success each response echoes the
    /// written value.
    pub fn write_tags<I, T>(&mut self, tags: I) -> Vec<Response>
    where
        I: IntoIterator<Item = T>,
        T: Into<TagWrite>,
    {
        let writes: Vec<TagWrite> = tags.into_iter().map(Into::into).collect();
        self.write_tags_batch(&writes)
    }

    fn write_tags_batch(&mut self, writes: &[TagWrite]) -> Vec<Response> {
        let mut results: Vec<Option<Response>> = vec![None; writes.len()];
        let mut pending: Vec<(usize, Vec<u8>)> = Vec::new();

        for (index, write) in writes.iter().enumerate() {
            match self.build_batch_write(write) {
                Ok(cip) => pending.push((index, cip)),
                Err(err) => {
                    results[index] =
                        Some(Response::failure(Some(write.name.clone()), err.status_text()));
                }
            }
        }

        if !pending.is_empty() {
            let frames: Vec<&[u8]> = pending.iter().map(|(_, cip)| cip.as_slice()).collect();
            let batch = build_multi_service(&frames);
            match self.multi_service_round(&batch, pending.len()) {
                Ok(replies) => {
                    for (slot, (index, _)) in pending.iter().enumerate() {
                        let write = &writes[*index];
                        results[*index] = Some(match replies.get(slot) {
                            None => Response::failure(
                                Some(write.name.clone()),
                                "No response".to_string(),
                            ),
                            Some(reply) if reply.status != 0 => Response::failure(
                                Some(write.name.clone()),
                                cip_status_text(reply.status),
                            ),
                            Some(_) => Response::success(
                                Some(write.name.clone()),
                                write.value.clone(),
                            ),
                        });
                    }
                }
                Err(err) => {
                    let status = err.status_text();
                    for (index, _) in &pending {
                        results[*index] = Some(Response::failure(
                            Some(writes[*index].name.clone()),
                            status.clone(),
                        ));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.expect("every batch slot is filled"))
            .collect()
    }

    fn build_batch_write(&mut self, write: &TagWrite) -> Result<Vec<u8>> {
        let parsed = ParsedTag::parse(&write.name)?;
        let type_code = write
            .data_type
            .or_else(|| self.known_types.get(&parsed.base_key()).copied())
            .unwrap_or_else(|| write.value.type_code());
        let ioi = parsed.encode_ioi(Some(type_code));
        let (bytes, count) = types::encode_elements(&write.value, type_code)?;
        Ok(build_write_request(&ioi, type_code, count, &bytes))
    }

    /// Sends one packed Multiple Service request and splits the reply into
    /// per-service sub-replies.
    fn multi_service_round(&mut self, batch: &[u8], expected: usize) -> Result<Vec<BatchReply>> {
        self.ensure_connected()?;
        let reply = self.session.send_connected(batch)?;
        let status = frame::cip_status(&reply, true)?;
        if status != 0 {
            // A failed top-level service taints every packed request.
            return Err(LogixError::Cip { status });
        }
        let payload = frame::cip_payload(&reply, true)?;
        let replies = split_multi_service_replies(payload)?;
        debug!(
            requested = expected,
            received = replies.len(),
            "multi-service round complete"
        );
        Ok(replies)
    }

    // =====================================================================
    // TAG AND PROGRAM ENUMERATION
    // =====================================================================

    /// Enumerates controller-scoped tags; with `all_tags` also walks every
    /// discovered program scope and qualifies those names with their
    /// `Program:<Name>.` prefix.
    pub fn get_tag_list(&mut self, all_tags: bool) -> Response {
        match self.tag_list_inner(all_tags) {
            Ok(tags) => Response::success(None, PlcValue::Tags(tags)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    /// Enumerates the tags of one program. The name may be given with or
    /// without its `Program:` prefix.
    pub fn get_program_tag_list(&mut self, program_name: &str) -> Response {
        let program = if program_name
            .get(..8)
            .map_or(false, |p| p.eq_ignore_ascii_case("Program:"))
        {
            program_name.to_string()
        } else {
            format!("Program:{}", program_name)
        };
        match self.walk_symbols(Some(&program)) {
            Ok(tags) => {
                self.remember_tag_types(&tags);
                Response::success(None, PlcValue::Tags(tags))
            }
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    /// Lists the program names present on the controller.
    pub fn get_programs_list(&mut self) -> Response {
        match self.walk_symbols(None) {
            Ok(tags) => {
                let programs: Vec<String> = tags
                    .into_iter()
                    .filter(|t| t.name.starts_with("Program:"))
                    .map(|t| t.name)
                    .collect();
                Response::success(None, PlcValue::Programs(programs))
            }
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    fn tag_list_inner(&mut self, all_tags: bool) -> Result<Vec<Tag>> {
        let mut tags = self.walk_symbols(None)?;
        if all_tags {
            let programs: Vec<String> = tags
                .iter()
                .filter(|t| t.name.starts_with("Program:"))
                .map(|t| t.name.clone())
                .collect();
            for program in programs {
                tags.extend(self.walk_symbols(Some(&program))?);
            }
        }
        self.remember_tag_types(&tags);
        Ok(tags)
    }

    fn remember_tag_types(&mut self, tags: &[Tag]) {
        for tag in tags {
            if let Some(code) = tag.atomic_type() {
                self.known_types.insert(tag.name.clone(), code);
            }
        }
    }

    /// Pages through the Symbol class (0x6B) with the instance cursor
    /// advancing past the highest id of each page while the controller
    /// reports partial transfer (0x06).
    fn walk_symbols(&mut self, program: Option<&str>) -> Result<Vec<Tag>> {
        self.ensure_connected()?;
        let mut tags = Vec::new();
        let mut cursor = 0u32;
        loop {
            let cip = build_symbol_walk_request(program, cursor);
            let reply = self.session.send_connected(&cip)?;
            let status = frame::cip_status(&reply, true)?;
            if status != 0x00 && status != 0x06 {
                return Err(LogixError::Cip { status });
            }
            let payload = frame::cip_payload(&reply, true)?;
            let (page, last_instance) = tag_list::parse_walk_page(&payload[4..], program)?;
            tags.extend(page);
            if status != 0x06 {
                break;
            }
            cursor = last_instance + 1;
        }
        debug!(
            scope = program.unwrap_or("controller"),
            count = tags.len(),
            "tag walk complete"
        );
        Ok(tags)
    }

    // =====================================================================
    // CONTROLLER CLOCK
    // =====================================================================

    /// Reads the controller wall clock as a UTC timestamp.
    pub fn get_plc_time(&mut self) -> Response {
        match self.plc_time_inner() {
            Ok(micros) => match types::decode_timestamp(micros) {
                Ok(value) => Response::success(None, value),
                Err(err) => Response::failure(None, err.status_text()),
            },
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    /// Reads the controller wall clock as raw microseconds since the Unix
    /// epoch.
    pub fn get_plc_time_raw(&mut self) -> Response {
        match self.plc_time_inner() {
            Ok(micros) => Response::success(None, PlcValue::Lint(micros)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    fn plc_time_inner(&mut self) -> Result<i64> {
        let mut cip = vec![services::GET_ATTRIBUTE_SINGLE, 0x03];
        cip.extend_from_slice(&WALL_CLOCK_PATH);
        let reply = self.request_connected(&cip)?;
        let payload = frame::cip_payload(&reply, true)?;
        if payload.len() < 12 {
            return Err(LogixError::Protocol("clock reply too short".to_string()));
        }
        Ok(i64::from_le_bytes([
            payload[4], payload[5], payload[6], payload[7], payload[8], payload[9], payload[10],
            payload[11],
        ]))
    }

    /// Sets the controller wall clock to the host's current UTC time.
    pub fn set_plc_time(&mut self) -> Response {
        let micros = Utc::now().timestamp_micros();
        let mut cip = vec![services::SET_ATTRIBUTE_SINGLE, 0x03];
        cip.extend_from_slice(&WALL_CLOCK_PATH);
        cip.extend_from_slice(&micros.to_le_bytes());
        match self.request_connected(&cip) {
            Ok(_) => Response::success(None, PlcValue::Lint(micros)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    // =====================================================================
    // DISCOVERY AND IDENTITY
    // =====================================================================

    /// Broadcasts ListIdentity over UDP and collects every device that
    /// answers within the receive window.
    pub fn discover(&self) -> Response {
        match discover_devices(self.config.port) {
            Ok(devices) => Response::success(None, PlcValue::Devices(devices)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    /// Reads the identity of the device terminating the TCP connection by
    /// sending ListIdentity over the established stream.
    pub fn get_device_properties(&mut self) -> Response {
        match self.device_properties_inner() {
            Ok(device) => Response::success(None, PlcValue::Device(device)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    fn device_properties_inner(&mut self) -> Result<Device> {
        self.ensure_registered()?;
        let request = frame::list_identity_frame(&frame::SENDER_CONTEXT);
        let reply = self.session.transact(&request)?;
        identity::parse_list_identity(&reply, Some(self.config.ip.clone()))
    }

    /// Reads the identity of the module in the given backplane slot with an
    /// unconnected GetAttributesAll routed through the chassis.
    pub fn get_module_properties(&mut self, slot: u8) -> Response {
        match self.module_properties_inner(slot) {
            Ok(device) => Response::success(None, PlcValue::Device(device)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    fn module_properties_inner(&mut self, slot: u8) -> Result<Device> {
        self.ensure_registered()?;
        let embedded = [
            services::GET_ATTRIBUTES_ALL,
            0x02, // Path size in words
            0x20, 0x01, // Identity class
            0x24, 0x01, // Instance 1
        ];
        let cip = frame::unconnected_send(&embedded, &[RouteHop::slot(0x01, slot)]);
        let reply = self.session.send_unconnected(&cip)?;
        let status = frame::cip_status(&reply, false)?;
        if status != 0 {
            return Err(LogixError::Cip { status });
        }
        identity::parse_attributes_all(&reply, Some(self.config.ip.clone()))
    }

    // =====================================================================
    // RAW MESSAGING AND TEARDOWN
    // =====================================================================

    /// Sends an arbitrary CIP service to a class/instance (and optionally
    /// an attribute), returning the raw reply data.
    pub fn message(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        attribute: Option<u8>,
        data: Option<&[u8]>,
    ) -> Response {
        match self.message_inner(service, class, instance, attribute, data) {
            Ok(bytes) => Response::success(None, PlcValue::Bytes(bytes)),
            Err(err) => Response::failure(None, err.status_text()),
        }
    }

    fn message_inner(
        &mut self,
        service: u8,
        class: u16,
        instance: u16,
        attribute: Option<u8>,
        data: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut path = Vec::new();
        if class <= 0xFF {
            path.extend_from_slice(&[0x20, class as u8]);
        } else {
            path.extend_from_slice(&[0x21, 0x00]);
            path.extend_from_slice(&class.to_le_bytes());
        }
        if instance <= 0xFF {
            path.extend_from_slice(&[0x24, instance as u8]);
        } else {
            path.extend_from_slice(&[0x25, 0x00]);
            path.extend_from_slice(&instance.to_le_bytes());
        }
        if let Some(attribute) = attribute {
            path.extend_from_slice(&[0x30, attribute]);
        }

        let mut cip = vec![service, (path.len() / 2) as u8];
        cip.extend_from_slice(&path);
        if let Some(data) = data {
            cip.extend_from_slice(data);
        }

        let reply = self.request_connected(&cip)?;
        let payload = frame::cip_payload(&reply, true)?;
        Ok(payload[4..].to_vec())
    }

    /// Tears down the connection, session and socket. Idempotent; also
    /// runs on drop.
    pub fn close(&mut self) {
        self.session.close(&self.config);
    }
}

impl Drop for LogixClient {
    fn drop(&mut self) {
        self.close();
    }
}

// =========================================================================
// REQUEST BUILDERS AND REPLY SPLITTERS
// =========================================================================

fn build_read_request(ioi: &[u8], count: u16) -> Vec<u8> {
    let mut cip = Vec::with_capacity(4 + ioi.len());
    cip.push(services::READ_TAG);
    cip.push((ioi.len() / 2) as u8);
    cip.extend_from_slice(ioi);
    cip.extend_from_slice(&count.to_le_bytes());
    cip
}

fn build_write_request(ioi: &[u8], type_code: u8, count: u16, data: &[u8]) -> Vec<u8> {
    let mut cip = Vec::with_capacity(8 + ioi.len() + data.len());
    cip.push(services::WRITE_TAG);
    cip.push((ioi.len() / 2) as u8);
    cip.extend_from_slice(ioi);
    if type_code == codes::STRING || type_code == codes::STRUCT {
        // Structured strings declare the STRUCT type and its handle.
        cip.push(codes::STRUCT);
        cip.push(0x02);
        cip.extend_from_slice(&types::STRING_HANDLE.to_le_bytes());
    } else {
        cip.push(type_code);
        cip.push(0x00);
    }
    cip.extend_from_slice(&count.to_le_bytes());
    cip.extend_from_slice(data);
    cip
}

fn build_rmw_request(ioi: &[u8], size: usize, or_mask: u64, and_mask: u64) -> Vec<u8> {
    let mut cip = Vec::with_capacity(4 + ioi.len() + 2 * size);
    cip.push(services::READ_MODIFY_WRITE);
    cip.push((ioi.len() / 2) as u8);
    cip.extend_from_slice(ioi);
    cip.extend_from_slice(&(size as u16).to_le_bytes());
    cip.extend_from_slice(&or_mask.to_le_bytes()[..size]);
    cip.extend_from_slice(&and_mask.to_le_bytes()[..size]);
    cip
}

/// Packs per-tag service frames into one Multiple Service Packet request.
/// Offsets are relative to the service-count field: the first service lands
/// right after the count and the offset table.
fn build_multi_service(frames: &[&[u8]]) -> Vec<u8> {
    let count = frames.len();
    let mut cip = Vec::with_capacity(8 + 2 * count);
    cip.push(services::MULTI_SERVICE);
    cip.push(0x02); // Path size in words
    cip.extend_from_slice(&[0x20, 0x02]); // Message Router class
    cip.extend_from_slice(&[0x24, 0x01]); // Instance 1
    cip.extend_from_slice(&(count as u16).to_le_bytes());

    let mut offset = 2 + 2 * count;
    for frame in frames {
        cip.extend_from_slice(&(offset as u16).to_le_bytes());
        offset += frame.len();
    }
    for frame in frames {
        cip.extend_from_slice(frame);
    }
    cip
}

/// One sub-reply of a Multiple Service Packet response.
#[derive(Debug, Clone, PartialEq)]
struct BatchReply {
    status: u8,
    /// Reply data after the service header (type code onward for reads,
    /// empty for writes).
    payload: Vec<u8>,
}

/// Splits the CIP payload of a Multiple Service reply into sub-replies.
///
/// `payload` starts at the top-level service header. The reply count sits
/// at byte 4 and every offset in the table that follows is relative to the
/// position of that count field.
fn split_multi_service_replies(payload: &[u8]) -> Result<Vec<BatchReply>> {
    if payload.len() < 6 {
        return Err(LogixError::Protocol(
            "multi-service reply too short".to_string(),
        ));
    }
    let count = u16::from_le_bytes([payload[4], payload[5]]) as usize;
    if payload.len() < 6 + 2 * count {
        return Err(LogixError::Protocol(
            "multi-service offset table truncated".to_string(),
        ));
    }

    let mut offsets = Vec::with_capacity(count);
    for i in 0..count {
        let at = 6 + 2 * i;
        offsets.push(u16::from_le_bytes([payload[at], payload[at + 1]]) as usize);
    }

    let mut replies = Vec::with_capacity(count);
    for (i, &offset) in offsets.iter().enumerate() {
        let start = 4 + offset;
        let end = if i + 1 < count {
            4 + offsets[i + 1]
        } else {
            payload.len()
        };
        if start + 4 > payload.len() || end > payload.len() || start + 4 > end {
            return Err(LogixError::Protocol(format!(
                "multi-service sub-reply {} has invalid bounds",
                i
            )));
        }
        let sub = &payload[start..end];
        let status = sub[2];
        let additional_words = sub[3] as usize;
        let data_start = 4 + 2 * additional_words;
        let payload_bytes = if data_start < sub.len() {
            sub[data_start..].to_vec()
        } else {
            Vec::new()
        };
        replies.push(BatchReply {
            status,
            payload: payload_bytes,
        });
    }
    Ok(replies)
}

fn build_symbol_walk_request(program: Option<&str>, instance: u32) -> Vec<u8> {
    let mut path = Vec::new();
    if let Some(program) = program {
        let bytes = program.as_bytes();
        path.push(0x91);
        path.push(bytes.len() as u8);
        path.extend_from_slice(bytes);
        if bytes.len() % 2 != 0 {
            path.push(0x00);
        }
    }
    path.extend_from_slice(&[0x20, 0x6B]); // Symbol class
    if instance < 256 {
        path.extend_from_slice(&[0x24, instance as u8]);
    } else {
        path.extend_from_slice(&[0x25, 0x00]);
        path.extend_from_slice(&(instance as u16).to_le_bytes());
    }

    let mut cip = vec![
        services::GET_INSTANCE_ATTRIBUTE_LIST,
        (path.len() / 2) as u8,
    ];
    cip.extend_from_slice(&path);
    // Three attributes: symbol name, symbol type, array dimension sizes.
    cip.extend_from_slice(&[0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x08, 0x00]);
    cip
}

fn extract_bit(value: &PlcValue, bit: u8) -> Result<PlcValue> {
    let word = match value {
        PlcValue::List(items) => items
            .first()
            .and_then(PlcValue::as_i128)
            .ok_or_else(|| LogixError::Encoding("bit access on empty array".to_string()))?,
        scalar => scalar
            .as_i128()
            .ok_or_else(|| LogixError::Encoding(format!("bit access on {:?}", scalar)))?,
    };
    Ok(PlcValue::Bool((word >> bit) & 1 == 1))
}

/// Broadcasts ListIdentity and parses every reply whose sender context
/// matches until the receive window closes.
fn discover_devices(port: u16) -> Result<Vec<Device>> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|_| LogixError::ConnectionFailure)?;
    socket
        .set_broadcast(true)
        .map_err(|_| LogixError::ConnectionFailure)?;
    socket
        .set_read_timeout(Some(DISCOVERY_TIMEOUT))
        .map_err(|_| LogixError::ConnectionFailure)?;

    let request = frame::list_identity_frame(&DISCOVERY_CONTEXT);
    socket
        .send_to(&request, ("255.255.255.255", port))
        .map_err(|_| LogixError::ConnectionFailure)?;

    let mut devices = Vec::new();
    let mut buffer = [0u8; 4096];
    loop {
        match socket.recv_from(&mut buffer) {
            Ok((len, source)) => {
                let reply = &buffer[..len];
                if len > 63 && &reply[12..17] == b"HiMom" {
                    match identity::parse_list_identity(reply, Some(source.ip().to_string())) {
                        Ok(device) => devices.push(device),
                        Err(err) => debug!(error = %err, %source, "discarding malformed identity"),
                    }
                }
            }
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                break;
            }
            Err(err) => return Err(LogixError::Io(err)),
        }
    }
    debug!(count = devices.len(), "discovery sweep complete");
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request_layout() {
        let ioi = ParsedTag::parse("Test").unwrap().encode_ioi(None);
        let cip = build_read_request(&ioi, 1);
        assert_eq!(
            cip,
            vec![0x4C, 0x03, 0x91, 0x04, 0x54, 0x65, 0x73, 0x74, 0x01, 0x00]
        );
    }

    #[test]
    fn test_write_request_layout() {
        let ioi = ParsedTag::parse("Test").unwrap().encode_ioi(None);
        let cip = build_write_request(&ioi, codes::DINT, 1, &42i32.to_le_bytes());
        assert_eq!(
            cip,
            vec![
                0x4D, 0x03, 0x91, 0x04, 0x54, 0x65, 0x73, 0x74, // Service + path
                0xC4, 0x00, // Type
                0x01, 0x00, // Count
                0x2A, 0x00, 0x00, 0x00, // Value
            ]
        );
    }

    #[test]
    fn test_string_write_declares_struct_handle() {
        let ioi = ParsedTag::parse("Msg").unwrap().encode_ioi(None);
        let data = types::encode_string("hi");
        let cip = build_write_request(&ioi, codes::STRING, 1, &data);
        let header_len = 2 + ioi.len();
        assert_eq!(cip[header_len], 0xA0);
        assert_eq!(cip[header_len + 1], 0x02);
        assert_eq!(
            u16::from_le_bytes([cip[header_len + 2], cip[header_len + 3]]),
            0x0FCE
        );
        assert_eq!(
            u16::from_le_bytes([cip[header_len + 4], cip[header_len + 5]]),
            1
        );
        assert_eq!(cip.len(), header_len + 6 + types::STRING_WIRE_LEN);
    }

    #[test]
    fn test_rmw_request_masks() {
        let ioi = ParsedTag::parse("MyDINT").unwrap().encode_ioi(None);
        // Set bit 5 of a 4-byte word.
        let cip = build_rmw_request(&ioi, 4, 1 << 5, u64::MAX);
        assert_eq!(cip[0], 0x4E);
        let base = 2 + ioi.len();
        assert_eq!(u16::from_le_bytes([cip[base], cip[base + 1]]), 4);
        assert_eq!(&cip[base + 2..base + 6], &[0x20, 0x00, 0x00, 0x00]);
        assert_eq!(&cip[base + 6..base + 10], &[0xFF, 0xFF, 0xFF, 0xFF]);

        // Clear bit 0.
        let cip = build_rmw_request(&ioi, 4, 0, !(1u64 << 0));
        assert_eq!(&cip[base + 2..base + 6], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&cip[base + 6..base + 10], &[0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_multi_service_offset_table() {
        let a = vec![0x4C, 0x03, 0x91, 0x04, 0x54, 0x65, 0x73, 0x74, 0x01, 0x00]; // 10 bytes
        let b = vec![0x4C, 0x03, 0x91, 0x03, 0x54, 0x61, 0x67, 0x00, 0x01, 0x00]; // 10 bytes
        let cip = build_multi_service(&[&a, &b]);

        assert_eq!(&cip[..6], &[0x0A, 0x02, 0x20, 0x02, 0x24, 0x01]);
        assert_eq!(u16::from_le_bytes([cip[6], cip[7]]), 2); // Service count
        // Offsets are relative to the count field: 2 + 2n, then + len(a).
        assert_eq!(u16::from_le_bytes([cip[8], cip[9]]), 6);
        assert_eq!(u16::from_le_bytes([cip[10], cip[11]]), 16);
        assert_eq!(&cip[12..22], a.as_slice());
        assert_eq!(&cip[22..32], b.as_slice());
    }

    #[test]
    fn test_multi_service_reply_offsets_are_relative_to_count_field() {
        // Literal fixture: two DINT read replies packed the way a
        // controller answers, offsets measured from the reply-count field.
        let sub1 = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0x07, 0x00, 0x00, 0x00];
        let sub2 = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0x2A, 0x00, 0x00, 0x00];
        let mut payload = vec![0x8A, 0x00, 0x00, 0x00]; // Top-level header
        payload.extend_from_slice(&2u16.to_le_bytes()); // Reply count at byte 4
        payload.extend_from_slice(&6u16.to_le_bytes()); // 2 + 2*2
        payload.extend_from_slice(&16u16.to_le_bytes()); // 6 + 10
        payload.extend_from_slice(&sub1);
        payload.extend_from_slice(&sub2);

        let replies = split_multi_service_replies(&payload).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].status, 0);
        assert_eq!(replies[0].payload, vec![0xC4, 0x00, 0x07, 0x00, 0x00, 0x00]);
        assert_eq!(replies[1].payload, vec![0xC4, 0x00, 0x2A, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_multi_service_reply_per_tag_failure() {
        let ok = [0xCC, 0x00, 0x00, 0x00, 0xC4, 0x00, 0x07, 0x00, 0x00, 0x00];
        let bad = [0xCC, 0x00, 0x04, 0x00]; // Path segment error, no data
        let mut payload = vec![0x8A, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.extend_from_slice(&6u16.to_le_bytes());
        payload.extend_from_slice(&16u16.to_le_bytes());
        payload.extend_from_slice(&ok);
        payload.extend_from_slice(&bad);

        let replies = split_multi_service_replies(&payload).unwrap();
        assert_eq!(replies[0].status, 0);
        assert_eq!(replies[1].status, 0x04);
        assert!(replies[1].payload.is_empty());
    }

    #[test]
    fn test_multi_service_reply_rejects_bad_offsets() {
        let mut payload = vec![0x8A, 0x00, 0x00, 0x00];
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&200u16.to_le_bytes()); // Points past the end
        payload.extend_from_slice(&[0xCC, 0x00, 0x00, 0x00]);
        assert!(split_multi_service_replies(&payload).is_err());
        assert!(split_multi_service_replies(&[0x8A, 0x00]).is_err());
    }

    #[test]
    fn test_symbol_walk_request_instance_encodings() {
        let cip = build_symbol_walk_request(None, 0);
        assert_eq!(
            cip,
            vec![
                0x55, 0x02, 0x20, 0x6B, 0x24, 0x00, // Class + short instance
                0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x08, 0x00,
            ]
        );

        let cip = build_symbol_walk_request(None, 300);
        assert_eq!(
            cip,
            vec![
                0x55, 0x03, 0x20, 0x6B, 0x25, 0x00, 0x2C, 0x01, // 300 = 0x012C
                0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x08, 0x00,
            ]
        );
    }

    #[test]
    fn test_symbol_walk_request_program_scope() {
        let cip = build_symbol_walk_request(Some("Program:Main"), 0);
        let mut expected = vec![0x55, 0x09, 0x91, 0x0C];
        expected.extend_from_slice(b"Program:Main");
        expected.extend_from_slice(&[0x20, 0x6B, 0x24, 0x00]);
        expected.extend_from_slice(&[0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x08, 0x00]);
        assert_eq!(cip, expected);
    }

    #[test]
    fn test_extract_bit() {
        assert_eq!(
            extract_bit(&PlcValue::Dint(0b100000), 5).unwrap(),
            PlcValue::Bool(true)
        );
        assert_eq!(
            extract_bit(&PlcValue::Dint(0b100000), 4).unwrap(),
            PlcValue::Bool(false)
        );
        assert_eq!(
            extract_bit(&PlcValue::Udint(0x8000_0000), 31).unwrap(),
            PlcValue::Bool(true)
        );
        assert_eq!(
            extract_bit(&PlcValue::List(vec![PlcValue::Dint(2)]), 1).unwrap(),
            PlcValue::Bool(true)
        );
        assert!(extract_bit(&PlcValue::Real(1.0), 0).is_err());
    }

    #[test]
    fn test_effective_route() {
        let config = PlcConfig::new("10.0.0.1").processor_slot(3);
        assert_eq!(config.effective_route(), vec![RouteHop::slot(1, 3)]);

        let config = PlcConfig::new("10.0.0.1").micro800(true);
        assert!(config.effective_route().is_empty());

        let config = PlcConfig::new("10.0.0.1")
            .route(vec![RouteHop::link(2, "192.168.1.5"), RouteHop::slot(1, 0)]);
        assert_eq!(config.effective_route().len(), 2);
    }

    #[test]
    fn test_config_defaults() {
        let config = PlcConfig::default();
        assert_eq!(config.port, 44818);
        assert_eq!(config.processor_slot, 0);
        assert_eq!(config.socket_timeout, 5.0);
        assert!(!config.micro800);
        assert!(config.route.is_none());
        assert!(config.connection_size.is_none());
        assert_eq!(config.string_encoding, "utf-8");
    }

    #[test]
    fn test_response_status_strings() {
        let ok = Response::success(Some("Tag".to_string()), PlcValue::Dint(1));
        assert!(ok.is_success());
        assert_eq!(ok.status, "Success");

        let bad = Response::failure(None, cip_status_text(0x04));
        assert!(!bad.is_success());
        assert_eq!(bad.status, "Path segment error");
    }

    #[test]
    fn test_close_without_open_is_harmless() {
        let mut client = LogixClient::new("10.0.0.1");
        client.close();
        client.close();
        // Drop runs close a third time.
    }

    #[test]
    fn test_read_of_unreachable_plc_reports_connection_failure() {
        // Reserved TEST-NET address: nothing listens there.
        let mut client =
            LogixClient::with_config(PlcConfig::new("192.0.2.1").socket_timeout(0.2));
        let response = client.read_tag("AnyTag");
        assert!(!response.is_success());
        assert_eq!(response.status, "Connection failure");
        assert_eq!(response.tag_name.as_deref(), Some("AnyTag"));
    }
}
