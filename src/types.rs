//! CIP type registry and value codec.
//!
//! Every value exchanged with a Logix controller is tagged with a one-byte
//! CIP type code. The registry maps each code to its wire size and semantic
//! kind; the codec turns [`PlcValue`]s into little-endian wire bytes and
//! back. Both directions are pure and independent of any socket state.

use chrono::{DateTime, TimeZone, Utc};
use encoding_rs::Encoding;

use crate::error::{LogixError, Result};
use crate::identity::Device;
use crate::tag_list::Tag;

/// Structure handle identifying the standard Logix STRING type.
pub const STRING_HANDLE: u16 = 0x0FCE;

/// Maximum payload of a standard Logix STRING.
pub const STRING_DATA_MAX: usize = 82;

/// Wire footprint of one STRING element: 4-byte length + 84-byte data area.
pub const STRING_WIRE_LEN: usize = 88;

/// Named CIP type codes.
pub mod codes {
    pub const BOOL: u8 = 0xC1;
    pub const SINT: u8 = 0xC2;
    pub const INT: u8 = 0xC3;
    pub const DINT: u8 = 0xC4;
    pub const LINT: u8 = 0xC5;
    pub const USINT: u8 = 0xC6;
    pub const UINT: u8 = 0xC7;
    pub const UDINT: u8 = 0xC8;
    pub const LWORD: u8 = 0xC9;
    pub const REAL: u8 = 0xCA;
    pub const LREAL: u8 = 0xCB;
    pub const LDT: u8 = 0xCC;
    pub const O_STRING: u8 = 0xD0;
    pub const BYTE: u8 = 0xD1;
    pub const WORD: u8 = 0xD2;
    pub const DWORD: u8 = 0xD3;
    pub const TIME32: u8 = 0xD6;
    pub const TIME: u8 = 0xD7;
    pub const STRING: u8 = 0xDA;
    pub const LTIME: u8 = 0xDF;
    pub const STRUCT: u8 = 0xA0;
    pub const DT: u8 = 0xC0;
}

/// How the bytes of a type are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Bool,
    SignedInt,
    UnsignedInt,
    Float,
    Bytes,
    DateTime,
    StringStruct,
    UdtStruct,
}

/// One entry of the CIP type registry.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub code: u8,
    pub name: &'static str,
    pub size: usize,
    pub kind: TypeKind,
}

static TYPE_TABLE: &[TypeInfo] = &[
    TypeInfo { code: codes::BOOL, name: "BOOL", size: 1, kind: TypeKind::Bool },
    TypeInfo { code: codes::SINT, name: "SINT", size: 1, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::INT, name: "INT", size: 2, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::DINT, name: "DINT", size: 4, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::LINT, name: "LINT", size: 8, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::USINT, name: "USINT", size: 1, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::UINT, name: "UINT", size: 2, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::UDINT, name: "UDINT", size: 4, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::LWORD, name: "LWORD", size: 8, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::REAL, name: "REAL", size: 4, kind: TypeKind::Float },
    TypeInfo { code: codes::LREAL, name: "LREAL", size: 8, kind: TypeKind::Float },
    TypeInfo { code: codes::LDT, name: "LDT", size: 8, kind: TypeKind::DateTime },
    TypeInfo { code: codes::O_STRING, name: "O_STRING", size: 0, kind: TypeKind::Bytes },
    TypeInfo { code: codes::BYTE, name: "BYTE", size: 1, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::WORD, name: "WORD", size: 2, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::DWORD, name: "DWORD", size: 4, kind: TypeKind::UnsignedInt },
    TypeInfo { code: codes::TIME32, name: "TIME32", size: 4, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::TIME, name: "TIME", size: 8, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::STRING, name: "STRING", size: STRING_WIRE_LEN, kind: TypeKind::StringStruct },
    TypeInfo { code: codes::LTIME, name: "LTIME", size: 8, kind: TypeKind::SignedInt },
    TypeInfo { code: codes::STRUCT, name: "STRUCT", size: 0, kind: TypeKind::UdtStruct },
    TypeInfo { code: codes::DT, name: "DT", size: 8, kind: TypeKind::DateTime },
];

/// Looks up a CIP type code in the registry.
pub fn type_info(code: u8) -> Option<&'static TypeInfo> {
    TYPE_TABLE.iter().find(|t| t.code == code)
}

/// A value read from, or destined for, a controller tag.
///
/// The variants mirror the Logix atomic types plus the composite results the
/// enumeration and discovery operations return.
#[derive(Debug, Clone, PartialEq)]
pub enum PlcValue {
    /// Boolean value (single bit)
    Bool(bool),
    /// 8-bit signed integer
    Sint(i8),
    /// 16-bit signed integer
    Int(i16),
    /// 32-bit signed integer
    Dint(i32),
    /// 64-bit signed integer
    Lint(i64),
    /// 8-bit unsigned integer
    Usint(u8),
    /// 16-bit unsigned integer
    Uint(u16),
    /// 32-bit unsigned integer
    Udint(u32),
    /// 64-bit unsigned integer
    Ulint(u64),
    /// 32-bit IEEE 754 floating point number
    Real(f32),
    /// 64-bit IEEE 754 floating point number
    Lreal(f64),
    /// String value
    String(String),
    /// Raw bytes, used for unrecognized type codes and UDT bodies
    Bytes(Vec<u8>),
    /// Wall-clock timestamp (DT / LDT)
    DateTime(DateTime<Utc>),
    /// Multiple elements of the same type
    List(Vec<PlcValue>),
    /// Tag-list entries
    Tags(Vec<Tag>),
    /// Program names
    Programs(Vec<String>),
    /// One device identity record
    Device(Device),
    /// Device identity records from a discovery sweep
    Devices(Vec<Device>),
}

impl PlcValue {
    /// Returns the CIP type code this value maps to when the caller does not
    /// supply one. Variants with no atomic peer fall back to DINT.
    pub fn type_code(&self) -> u8 {
        match self {
            PlcValue::Bool(_) => codes::BOOL,
            PlcValue::Sint(_) => codes::SINT,
            PlcValue::Int(_) => codes::INT,
            PlcValue::Dint(_) => codes::DINT,
            PlcValue::Lint(_) => codes::LINT,
            PlcValue::Usint(_) => codes::USINT,
            PlcValue::Uint(_) => codes::UINT,
            PlcValue::Udint(_) => codes::UDINT,
            PlcValue::Ulint(_) => codes::LWORD,
            PlcValue::Real(_) => codes::REAL,
            PlcValue::Lreal(_) => codes::LREAL,
            PlcValue::String(_) => codes::STRING,
            PlcValue::DateTime(_) => codes::DT,
            PlcValue::List(items) => items.first().map(PlcValue::type_code).unwrap_or(codes::DINT),
            _ => codes::DINT,
        }
    }

    /// Number of wire elements this value writes: list length, else 1.
    pub fn element_count(&self) -> u16 {
        match self {
            PlcValue::List(items) => items.len() as u16,
            _ => 1,
        }
    }

    /// The value widened to a signed 128-bit integer, when it is integral.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            PlcValue::Bool(v) => Some(*v as i128),
            PlcValue::Sint(v) => Some(*v as i128),
            PlcValue::Int(v) => Some(*v as i128),
            PlcValue::Dint(v) => Some(*v as i128),
            PlcValue::Lint(v) => Some(*v as i128),
            PlcValue::Usint(v) => Some(*v as i128),
            PlcValue::Uint(v) => Some(*v as i128),
            PlcValue::Udint(v) => Some(*v as i128),
            PlcValue::Ulint(v) => Some(*v as i128),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            PlcValue::Real(v) => Some(*v as f64),
            PlcValue::Lreal(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Encodes one element of this value for the given CIP type code.
    ///
    /// Lists are rejected here; callers iterate their elements so that the
    /// element count lands in the service header, not the payload.
    pub fn encode(&self, code: u8) -> Result<Vec<u8>> {
        let info = type_info(code)
            .ok_or_else(|| LogixError::Encoding(format!("unknown type code 0x{:02X}", code)))?;
        match info.kind {
            TypeKind::Bool => {
                let v = self
                    .as_i128()
                    .ok_or_else(|| mismatch(self, info))?;
                Ok(vec![if v != 0 { 0xFF } else { 0x00 }])
            }
            TypeKind::SignedInt | TypeKind::UnsignedInt => {
                let v = self.as_i128().ok_or_else(|| mismatch(self, info))?;
                Ok(v.to_le_bytes()[..info.size].to_vec())
            }
            TypeKind::Float => {
                let v = self.as_f64().ok_or_else(|| mismatch(self, info))?;
                if info.size == 4 {
                    Ok((v as f32).to_le_bytes().to_vec())
                } else {
                    Ok(v.to_le_bytes().to_vec())
                }
            }
            TypeKind::DateTime => {
                let micros = match self {
                    PlcValue::DateTime(ts) => ts.timestamp_micros(),
                    other => other
                        .as_i128()
                        .map(|v| v as i64)
                        .ok_or_else(|| mismatch(self, info))?,
                };
                Ok(micros.to_le_bytes().to_vec())
            }
            TypeKind::StringStruct => match self {
                PlcValue::String(s) => Ok(encode_string(s)),
                _ => Err(mismatch(self, info)),
            },
            TypeKind::Bytes | TypeKind::UdtStruct => match self {
                PlcValue::Bytes(b) => Ok(b.clone()),
                _ => Err(mismatch(self, info)),
            },
        }
    }
}

fn mismatch(value: &PlcValue, info: &TypeInfo) -> LogixError {
    LogixError::Encoding(format!("cannot encode {:?} as {}", value, info.name))
}

/// Packs a string into the fixed 88-byte Logix STRING layout: a 32-bit
/// length followed by an 84-byte data area. Payloads longer than 82 bytes
/// are truncated.
pub fn encode_string(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let len = bytes.len().min(STRING_DATA_MAX);
    let mut out = Vec::with_capacity(STRING_WIRE_LEN);
    out.extend_from_slice(&(len as u32).to_le_bytes());
    out.extend_from_slice(&bytes[..len]);
    out.resize(STRING_WIRE_LEN, 0x00);
    out
}

/// Decodes one Logix STRING from its wire form.
///
/// Reads the 32-bit length, clamps it to the 82-byte data area, and decodes
/// with the configured encoding.
pub fn decode_string(data: &[u8], encoding: &'static Encoding) -> Result<String> {
    if data.len() < 4 {
        return Err(LogixError::Protocol("string data too short".to_string()));
    }
    let declared = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let len = declared.min(STRING_DATA_MAX).min(data.len() - 4);
    let (text, _, _) = encoding.decode(&data[4..4 + len]);
    Ok(text.into_owned())
}

fn decode_scalar(info: &TypeInfo, data: &[u8]) -> Result<PlcValue> {
    if data.len() < info.size {
        return Err(LogixError::Protocol(format!(
            "not enough data for {}: need {}, have {}",
            info.name,
            info.size,
            data.len()
        )));
    }
    let value = match (info.kind, info.size) {
        (TypeKind::Bool, _) => PlcValue::Bool(data[0] != 0),
        (TypeKind::SignedInt, 1) => PlcValue::Sint(data[0] as i8),
        (TypeKind::SignedInt, 2) => PlcValue::Int(i16::from_le_bytes([data[0], data[1]])),
        (TypeKind::SignedInt, 4) => {
            PlcValue::Dint(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        }
        (TypeKind::SignedInt, _) => PlcValue::Lint(i64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        (TypeKind::UnsignedInt, 1) => PlcValue::Usint(data[0]),
        (TypeKind::UnsignedInt, 2) => PlcValue::Uint(u16::from_le_bytes([data[0], data[1]])),
        (TypeKind::UnsignedInt, 4) => {
            PlcValue::Udint(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        }
        (TypeKind::UnsignedInt, _) => PlcValue::Ulint(u64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        (TypeKind::Float, 4) => {
            PlcValue::Real(f32::from_le_bytes([data[0], data[1], data[2], data[3]]))
        }
        (TypeKind::Float, _) => PlcValue::Lreal(f64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ])),
        (TypeKind::DateTime, _) => {
            let micros = i64::from_le_bytes([
                data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
            ]);
            decode_timestamp(micros)?
        }
        _ => PlcValue::Bytes(data[..info.size].to_vec()),
    };
    Ok(value)
}

/// Converts a microseconds-since-epoch wire timestamp to a UTC value.
pub fn decode_timestamp(micros: i64) -> Result<PlcValue> {
    match Utc.timestamp_micros(micros) {
        chrono::LocalResult::Single(ts) => Ok(PlcValue::DateTime(ts)),
        _ => Err(LogixError::Protocol(format!(
            "timestamp out of range: {} us",
            micros
        ))),
    }
}

/// Decodes the payload of a Read Tag reply.
///
/// `payload` starts at the type byte: one type code byte, one reserved byte,
/// then the element data. For STRUCT payloads the 16-bit structure handle
/// follows, and handle 0x0FCE selects the STRING layout; other handles and
/// unrecognized codes come back as [`PlcValue::Bytes`]. With `count > 1` the
/// result is a [`PlcValue::List`] of successive fixed-stride elements.
///
/// Returns the type code alongside the value so callers can cache it.
pub fn decode_read_payload(
    payload: &[u8],
    count: usize,
    encoding: &'static Encoding,
) -> Result<(u8, PlcValue)> {
    if payload.len() < 2 {
        return Err(LogixError::Protocol("read reply too short".to_string()));
    }
    let code = payload[0];
    let data = &payload[2..];

    if code == codes::STRUCT {
        if data.len() < 2 {
            return Err(LogixError::Protocol("struct reply missing handle".to_string()));
        }
        let handle = u16::from_le_bytes([data[0], data[1]]);
        let body = &data[2..];
        if handle == STRING_HANDLE {
            let value = decode_string_elements(body, count, encoding)?;
            return Ok((code, value));
        }
        // Unknown structure: hand the body back untouched.
        return Ok((code, PlcValue::Bytes(body.to_vec())));
    }

    let info = match type_info(code) {
        Some(info) if info.kind == TypeKind::StringStruct => {
            return Ok((code, decode_string_elements(data, count, encoding)?));
        }
        Some(info) if info.size > 0 => info,
        // O_STRING and anything we do not model decode as raw bytes.
        _ => return Ok((code, PlcValue::Bytes(data.to_vec()))),
    };

    if count <= 1 {
        return Ok((code, decode_scalar(info, data)?));
    }
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * info.size;
        if start + info.size > data.len() {
            return Err(LogixError::Protocol(format!(
                "read reply truncated at element {} of {}",
                i, count
            )));
        }
        items.push(decode_scalar(info, &data[start..])?);
    }
    Ok((code, PlcValue::List(items)))
}

fn decode_string_elements(
    body: &[u8],
    count: usize,
    encoding: &'static Encoding,
) -> Result<PlcValue> {
    if count <= 1 {
        return Ok(PlcValue::String(decode_string(body, encoding)?));
    }
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * STRING_WIRE_LEN;
        if start >= body.len() {
            return Err(LogixError::Protocol(format!(
                "string array truncated at element {} of {}",
                i, count
            )));
        }
        items.push(PlcValue::String(decode_string(&body[start..], encoding)?));
    }
    Ok(PlcValue::List(items))
}

/// Encodes a scalar or list value for a write, returning the concatenated
/// element bytes and the element count.
pub fn encode_elements(value: &PlcValue, code: u8) -> Result<(Vec<u8>, u16)> {
    match value {
        PlcValue::List(items) => {
            if items.is_empty() {
                return Err(LogixError::Encoding("cannot write an empty array".to_string()));
            }
            let mut bytes = Vec::new();
            for item in items {
                bytes.extend_from_slice(&item.encode(code)?);
            }
            Ok((bytes, items.len() as u16))
        }
        scalar => Ok((scalar.encode(code)?, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn roundtrip(value: PlcValue, code: u8) -> PlcValue {
        let bytes = value.encode(code).unwrap();
        let mut payload = vec![code, 0x00];
        payload.extend_from_slice(&bytes);
        let (decoded_code, decoded) = decode_read_payload(&payload, 1, UTF_8).unwrap();
        assert_eq!(decoded_code, code);
        decoded
    }

    #[test]
    fn test_registry_required_codes() {
        for code in [
            0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xD0, 0xD1,
            0xD2, 0xD3, 0xD6, 0xD7, 0xDA, 0xDF, 0xA0, 0xC0,
        ] {
            assert!(type_info(code).is_some(), "missing type 0x{:02X}", code);
        }
        assert_eq!(type_info(codes::DINT).unwrap().size, 4);
        assert_eq!(type_info(codes::LREAL).unwrap().size, 8);
        assert_eq!(type_info(codes::DWORD).unwrap().kind, TypeKind::UnsignedInt);
        assert!(type_info(0xEE).is_none());
    }

    #[test]
    fn test_integer_roundtrips_are_bit_exact() {
        assert_eq!(roundtrip(PlcValue::Sint(-128), codes::SINT), PlcValue::Sint(-128));
        assert_eq!(roundtrip(PlcValue::Int(-12345), codes::INT), PlcValue::Int(-12345));
        assert_eq!(
            roundtrip(PlcValue::Dint(-2147483648), codes::DINT),
            PlcValue::Dint(-2147483648)
        );
        assert_eq!(
            roundtrip(PlcValue::Lint(i64::MIN), codes::LINT),
            PlcValue::Lint(i64::MIN)
        );
        assert_eq!(roundtrip(PlcValue::Usint(255), codes::USINT), PlcValue::Usint(255));
        assert_eq!(roundtrip(PlcValue::Uint(65535), codes::UINT), PlcValue::Uint(65535));
        assert_eq!(
            roundtrip(PlcValue::Udint(4294967295), codes::UDINT),
            PlcValue::Udint(4294967295)
        );
        assert_eq!(
            roundtrip(PlcValue::Ulint(u64::MAX), codes::LWORD),
            PlcValue::Ulint(u64::MAX)
        );
    }

    #[test]
    fn test_float_roundtrips_are_byte_exact() {
        assert_eq!(
            roundtrip(PlcValue::Real(123.456), codes::REAL),
            PlcValue::Real(123.456)
        );
        assert_eq!(
            roundtrip(PlcValue::Lreal(-0.000001), codes::LREAL),
            PlcValue::Lreal(-0.000001)
        );
        // NaN payload bytes survive even though NaN != NaN.
        let bytes = PlcValue::Real(f32::NAN).encode(codes::REAL).unwrap();
        assert_eq!(bytes, f32::NAN.to_le_bytes().to_vec());
    }

    #[test]
    fn test_bit_field_and_duration_type_roundtrips() {
        assert_eq!(roundtrip(PlcValue::Usint(0xAB), codes::BYTE), PlcValue::Usint(0xAB));
        assert_eq!(roundtrip(PlcValue::Uint(0xBEEF), codes::WORD), PlcValue::Uint(0xBEEF));
        assert_eq!(
            roundtrip(PlcValue::Udint(0xDEADBEEF), codes::DWORD),
            PlcValue::Udint(0xDEADBEEF)
        );
        assert_eq!(
            roundtrip(PlcValue::Dint(-5_000), codes::TIME32),
            PlcValue::Dint(-5_000)
        );
        assert_eq!(
            roundtrip(PlcValue::Lint(86_400_000_000), codes::TIME),
            PlcValue::Lint(86_400_000_000)
        );
        assert_eq!(
            roundtrip(PlcValue::Lint(-1), codes::LTIME),
            PlcValue::Lint(-1)
        );
        // LDT carries a wall-clock timestamp.
        let micros = 1_600_000_000_000_000i64;
        match roundtrip(PlcValue::Lint(micros), codes::LDT) {
            PlcValue::DateTime(ts) => assert_eq!(ts.timestamp_micros(), micros),
            other => panic!("expected DateTime, got {:?}", other),
        }
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(PlcValue::Bool(true).encode(codes::BOOL).unwrap(), vec![0xFF]);
        assert_eq!(PlcValue::Bool(false).encode(codes::BOOL).unwrap(), vec![0x00]);
        assert_eq!(roundtrip(PlcValue::Bool(true), codes::BOOL), PlcValue::Bool(true));
    }

    #[test]
    fn test_string_wire_layout() {
        let bytes = encode_string("hi");
        assert_eq!(bytes.len(), STRING_WIRE_LEN);
        assert_eq!(&bytes[..4], &[0x02, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[4..6], b"hi");
        assert!(bytes[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_string_roundtrip_utf8() {
        let text = "Pumpe Nr. 3 läuft";
        let bytes = encode_string(text);
        assert_eq!(decode_string(&bytes, UTF_8).unwrap(), text);
    }

    #[test]
    fn test_string_truncates_at_82_bytes() {
        let long = "x".repeat(100);
        let bytes = encode_string(&long);
        assert_eq!(bytes.len(), STRING_WIRE_LEN);
        assert_eq!(decode_string(&bytes, UTF_8).unwrap(), "x".repeat(82));
    }

    #[test]
    fn test_struct_handle_selects_string() {
        let mut payload = vec![codes::STRUCT, 0x00, 0xCE, 0x0F];
        payload.extend_from_slice(&encode_string("hello"));
        let (code, value) = decode_read_payload(&payload, 1, UTF_8).unwrap();
        assert_eq!(code, codes::STRUCT);
        assert_eq!(value, PlcValue::String("hello".to_string()));
    }

    #[test]
    fn test_unknown_struct_handle_returns_bytes() {
        let payload = vec![codes::STRUCT, 0x00, 0x34, 0x12, 0xAA, 0xBB];
        let (_, value) = decode_read_payload(&payload, 1, UTF_8).unwrap();
        assert_eq!(value, PlcValue::Bytes(vec![0xAA, 0xBB]));
    }

    #[test]
    fn test_unknown_type_code_returns_bytes() {
        let payload = vec![0xEE, 0x00, 0x01, 0x02, 0x03];
        let (code, value) = decode_read_payload(&payload, 1, UTF_8).unwrap();
        assert_eq!(code, 0xEE);
        assert_eq!(value, PlcValue::Bytes(vec![0x01, 0x02, 0x03]));
    }

    #[test]
    fn test_multi_element_decode() {
        let mut payload = vec![codes::DINT, 0x00];
        for v in [7i32, -1, 42] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        let (_, value) = decode_read_payload(&payload, 3, UTF_8).unwrap();
        assert_eq!(
            value,
            PlcValue::List(vec![PlcValue::Dint(7), PlcValue::Dint(-1), PlcValue::Dint(42)])
        );
    }

    #[test]
    fn test_multi_element_truncation_is_an_error() {
        let mut payload = vec![codes::DINT, 0x00];
        payload.extend_from_slice(&7i32.to_le_bytes());
        assert!(decode_read_payload(&payload, 2, UTF_8).is_err());
    }

    #[test]
    fn test_timestamp_codec() {
        // 2023-01-02 03:04:05.678901 UTC
        let micros = 1_672_628_645_678_901i64;
        let decoded = decode_timestamp(micros).unwrap();
        match &decoded {
            PlcValue::DateTime(ts) => assert_eq!(ts.timestamp_micros(), micros),
            other => panic!("expected DateTime, got {:?}", other),
        }
        let bytes = decoded.encode(codes::DT).unwrap();
        assert_eq!(bytes, micros.to_le_bytes().to_vec());
    }

    #[test]
    fn test_type_guessing() {
        assert_eq!(PlcValue::Bool(true).type_code(), codes::BOOL);
        assert_eq!(PlcValue::Sint(0).type_code(), codes::SINT);
        assert_eq!(PlcValue::Int(0).type_code(), codes::INT);
        assert_eq!(PlcValue::Dint(0).type_code(), codes::DINT);
        assert_eq!(PlcValue::Lint(0).type_code(), codes::LINT);
        assert_eq!(PlcValue::Usint(0).type_code(), codes::USINT);
        assert_eq!(PlcValue::Uint(0).type_code(), codes::UINT);
        assert_eq!(PlcValue::Udint(0).type_code(), codes::UDINT);
        assert_eq!(PlcValue::Ulint(0).type_code(), codes::LWORD);
        assert_eq!(PlcValue::Real(0.0).type_code(), codes::REAL);
        assert_eq!(PlcValue::Lreal(0.0).type_code(), codes::LREAL);
        assert_eq!(PlcValue::String(String::new()).type_code(), codes::STRING);
        // Element-wise for arrays, DINT for anything unresolved.
        let list = PlcValue::List(vec![PlcValue::Real(1.0), PlcValue::Real(2.0)]);
        assert_eq!(list.type_code(), codes::REAL);
        assert_eq!(PlcValue::Bytes(vec![]).type_code(), codes::DINT);
    }

    #[test]
    fn test_encode_elements_concatenates_arrays() {
        let value = PlcValue::List(vec![PlcValue::Int(1), PlcValue::Int(2), PlcValue::Int(3)]);
        let (bytes, count) = encode_elements(&value, codes::INT).unwrap();
        assert_eq!(count, 3);
        assert_eq!(bytes, vec![0x01, 0x00, 0x02, 0x00, 0x03, 0x00]);
    }

    #[test]
    fn test_encode_type_mismatch() {
        assert!(PlcValue::String("x".to_string()).encode(codes::DINT).is_err());
        assert!(PlcValue::Dint(1).encode(codes::STRING).is_err());
    }
}
